//! Alert lifecycle: countdown registry and the engine that drives
//! PENDING alerts to exactly one terminal state.

pub mod engine;
pub mod registry;

pub use engine::{AlertEngine, AlertError, CreatedAlert, TriggerOutcome};
pub use registry::{CountdownHandle, CountdownRegistry};
