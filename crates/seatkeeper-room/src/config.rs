//! Room configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default number of seats.
pub const DEFAULT_CAPACITY: usize = 8;

/// Default per-move timeout handed to the rule engine, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 15;

/// Default bound of the request queue.
pub const DEFAULT_REQUEST_QUEUE_BOUND: usize = 1024;

/// Metadata of one room, fixed once its game starts.
///
/// `settings` is the game's own configuration. The room never reads it;
/// it is stored at creation and echoed verbatim in every `EnterRoom`
/// notice and in the rule engine's [`SessionSetup`](crate::SessionSetup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Display name shown in room listings.
    pub name: String,

    /// Number of player seats. The room starts as soon as they are all
    /// taken.
    pub capacity: usize,

    /// Per-move timeout enforced by the rule engine, not by the room.
    pub timeout_secs: u32,

    /// Opaque game configuration.
    pub settings: Value,

    /// Maximum number of pending requests before pushes are rejected.
    pub request_queue_bound: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity: DEFAULT_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            settings: Value::Object(Map::new()),
            request_queue_bound: DEFAULT_REQUEST_QUEUE_BOUND,
        }
    }
}

impl RoomConfig {
    /// Configuration of the lobby: unbounded seats, never started.
    pub fn lobby() -> Self {
        Self {
            name: "Lobby".to_string(),
            capacity: usize::MAX,
            ..Self::default()
        }
    }

    /// Shorthand for a named room with `capacity` seats.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.capacity, 8);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.settings, serde_json::json!({}));
        assert_eq!(config.request_queue_bound, 1024);
    }

    #[test]
    fn test_room_config_lobby_is_unbounded() {
        let config = RoomConfig::lobby();
        assert_eq!(config.capacity, usize::MAX);
        assert_eq!(config.name, "Lobby");
    }

    #[test]
    fn test_room_config_missing_fields_use_defaults() {
        let config: RoomConfig =
            serde_json::from_str(r#"{ "name": "duel", "capacity": 2 }"#).unwrap();
        assert_eq!(config.name, "duel");
        assert_eq!(config.capacity, 2);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
