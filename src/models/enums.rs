use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AlertStatus {
    Pending => "pending",
    Cancelled => "cancelled",
    Triggered => "triggered",
    // Reserved terminal value: no engine transition produces it.
    Safe => "safe",
});

str_enum!(AlertType {
    Scream => "SCREAM",
    Fall => "FALL",
    Distress => "DISTRESS",
    Panic => "PANIC",
    MotionAnomaly => "MOTION_ANOMALY",
    SoundAnomaly => "SOUND_ANOMALY",
    VoiceActivation => "VOICE_ACTIVATION",
    Sos => "SOS",
});

impl AlertStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Pending => false,
            Self::Cancelled | Self::Triggered | Self::Safe => true,
        }
    }
}

impl AlertType {
    /// Human-readable label used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scream => "Scream detected",
            Self::Fall => "Fall detected",
            Self::Distress => "Distress detected",
            Self::Panic => "Panic detected",
            Self::MotionAnomaly => "Unusual motion detected",
            Self::SoundAnomaly => "Unusual sound detected",
            Self::VoiceActivation => "Voice-activated emergency",
            Self::Sos => "SOS",
        }
    }
}
