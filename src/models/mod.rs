pub mod alert;
pub mod contact;
pub mod enums;

pub use alert::{Alert, GeoPoint, NewAlert, ValidationError};
pub use contact::{TrustedContact, UserRecord};
pub use enums::{AlertStatus, AlertType};
