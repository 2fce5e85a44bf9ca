use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Vigil";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime settings, read from the environment with compiled-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Alerts at or above this confidence start a countdown automatically.
    pub alert_confidence_threshold: f64,
    /// Grace period before a pending alert fires notifications.
    pub alert_countdown_seconds: u64,
    /// Sandbox mode: external clients simulate success, no network calls.
    pub test_mode: bool,

    // SMS gateway
    pub sms_endpoint: String,
    pub sms_api_key: String,
    pub sms_from: String,

    // Transcription service
    pub whisper_endpoint: String,
    pub whisper_api_key: String,

    // Second-opinion LLM (chat-completions style)
    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_confidence_threshold: 0.8,
            alert_countdown_seconds: 5,
            test_mode: true,
            sms_endpoint: String::new(),
            sms_api_key: String::new(),
            sms_from: String::new(),
            whisper_endpoint: String::new(),
            whisper_api_key: String::new(),
            llm_endpoint: String::new(),
            llm_api_key: String::new(),
            llm_model: "gpt-4.1".into(),
        }
    }
}

impl Settings {
    /// Load settings from `VIGIL_*` environment variables.
    /// Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            alert_confidence_threshold: env_parse(
                "VIGIL_ALERT_CONFIDENCE_THRESHOLD",
                d.alert_confidence_threshold,
            ),
            alert_countdown_seconds: env_parse(
                "VIGIL_ALERT_COUNTDOWN_SECONDS",
                d.alert_countdown_seconds,
            ),
            test_mode: std::env::var("VIGIL_TEST_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(d.test_mode),
            sms_endpoint: env_or("VIGIL_SMS_ENDPOINT", &d.sms_endpoint),
            sms_api_key: env_or("VIGIL_SMS_API_KEY", &d.sms_api_key),
            sms_from: env_or("VIGIL_SMS_FROM", &d.sms_from),
            whisper_endpoint: env_or("VIGIL_WHISPER_ENDPOINT", &d.whisper_endpoint),
            whisper_api_key: env_or("VIGIL_WHISPER_API_KEY", &d.whisper_api_key),
            llm_endpoint: env_or("VIGIL_LLM_ENDPOINT", &d.llm_endpoint),
            llm_api_key: env_or("VIGIL_LLM_API_KEY", &d.llm_api_key),
            llm_model: env_or("VIGIL_LLM_MODEL", &d.llm_model),
        }
    }

    /// Lifecycle policy consumed by the alert engine.
    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            confidence_threshold: self.alert_confidence_threshold,
            countdown: Duration::from_secs(self.alert_countdown_seconds),
        }
    }
}

/// The two knobs the countdown state machine cares about.
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    pub confidence_threshold: f64,
    pub countdown: Duration,
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "info,vigil=debug".to_string()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Accepts the usual truthy spellings; anything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
