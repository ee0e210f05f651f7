use {
    ledger_stream::StreamMode,
    serde_derive::{Deserialize, Serialize},
};

pub const DEFAULT_MAX_PRECEDING_RECORDS: usize = 3;
pub const DEFAULT_MAX_FOLLOWING_RECORDS: usize = 50;

/// Limits and output shape shared by every stack in an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackConfig {
    /// Builders a top-level transaction may produce ahead of itself.
    pub max_preceding_records: usize,
    /// Builders a top-level transaction may produce after itself, not
    /// counting its own.
    pub max_following_records: usize,
    pub stream_mode: StreamMode,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_preceding_records: DEFAULT_MAX_PRECEDING_RECORDS,
            max_following_records: DEFAULT_MAX_FOLLOWING_RECORDS,
            stream_mode: StreamMode::default(),
        }
    }
}

impl StackConfig {
    /// Every builder one top-level transaction can produce, its own included.
    /// Also the number of nonces each preset transaction id skips.
    pub fn total_capacity(&self) -> usize {
        self.max_preceding_records + self.max_following_records + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let config: StackConfig = serde_json::from_str(r#"{"maxFollowingRecords": 10}"#).unwrap();
        assert_eq!(
            config,
            StackConfig {
                max_preceding_records: DEFAULT_MAX_PRECEDING_RECORDS,
                max_following_records: 10,
                stream_mode: StreamMode::Records,
            }
        );
        assert_eq!(config.total_capacity(), 14);
    }

    #[test]
    fn test_deserialize_stream_mode() {
        let config: StackConfig =
            serde_json::from_str(r#"{"maxPrecedingRecords": 1, "streamMode": "BOTH"}"#).unwrap();
        assert_eq!(config.max_preceding_records, 1);
        assert_eq!(config.stream_mode, StreamMode::Both);
    }
}
