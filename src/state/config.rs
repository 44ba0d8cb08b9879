use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DRAFT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_STATUS_DISPLAY: Duration = Duration::from_secs(3);

/// Tunables of an edit session. Durations are stored as whole seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditConfig {
    #[serde(default = "default_draft_ttl", with = "seconds")]
    pub draft_ttl: Duration,
    /// How long `Saved` / `Error` stay visible before the session rests again.
    #[serde(default = "default_status_display", with = "seconds")]
    pub status_display: Duration,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            draft_ttl: DEFAULT_DRAFT_TTL,
            status_display: DEFAULT_STATUS_DISPLAY,
        }
    }
}

fn default_draft_ttl() -> Duration {
    DEFAULT_DRAFT_TTL
}

fn default_status_display() -> Duration {
    DEFAULT_STATUS_DISPLAY
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
