use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_NETWORK_PACKET_SIZE: usize = 4096;

/// Limits a batch must stay within. Fixed for the lifetime of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub max_parameter_count: usize,
    /// Slots held back from `max_parameter_count` for protocol overhead and
    /// the trailer parameter.
    pub reserved_parameter_slots: usize,
    pub max_script_length: usize,
    pub bulk_insert_estimate: ScriptLengthEstimate,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 42,
            max_parameter_count: 2100,
            reserved_parameter_slots: 2,
            max_script_length: 65536 * DEFAULT_NETWORK_PACKET_SIZE / 2,
            bulk_insert_estimate: ScriptLengthEstimate::default(),
        }
    }
}

impl BatchConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_parameter_count <= self.reserved_parameter_slots {
            return Err(ConfigError::Invalid(format!(
                "max_parameter_count ({}) must exceed reserved_parameter_slots ({})",
                self.max_parameter_count, self.reserved_parameter_slots
            )));
        }
        if self.max_script_length == 0 {
            return Err(ConfigError::Invalid(
                "max_script_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Highest number of parameters a batch may carry.
    pub fn parameter_ceiling(&self) -> usize {
        self.max_parameter_count
            .saturating_sub(self.reserved_parameter_slots)
    }
}

/// Byte constants used to size a pending bulk insert without rendering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLengthEstimate {
    pub identifier_length: usize,
    pub placeholder_length: usize,
    pub fixed_overhead: usize,
}

impl Default for ScriptLengthEstimate {
    fn default() -> Self {
        Self {
            identifier_length: 128,
            placeholder_length: 6,
            fixed_overhead: 300,
        }
    }
}

impl ScriptLengthEstimate {
    pub fn pending_insert_length(&self, column_count: usize, row_count: usize) -> usize {
        if row_count == 0 {
            return 0;
        }
        // column names, then schema and table names, then one placeholder per value
        column_count * self.identifier_length
            + 2 * self.identifier_length
            + row_count * column_count * self.placeholder_length
            + self.fixed_overhead
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchConfig, ScriptLengthEstimate};

    #[test]
    fn defaults_reserve_two_parameter_slots() {
        let config = BatchConfig::default();
        assert_eq!(config.parameter_ceiling(), 2098);
        assert_eq!(config.max_script_length, 134_217_728);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = BatchConfig::from_json_str(r#"{"max_batch_size": 7}"#)
            .expect("config should parse");
        assert_eq!(config.max_batch_size, 7);
        assert_eq!(config.max_parameter_count, 2100);
        assert_eq!(config.bulk_insert_estimate, ScriptLengthEstimate::default());
    }

    #[test]
    fn rejects_ceiling_below_reserved_slots() {
        let error = BatchConfig::from_json_str(
            r#"{"max_parameter_count": 2, "reserved_parameter_slots": 2}"#,
        )
        .expect_err("config should be rejected");
        assert!(error.to_string().contains("must exceed reserved_parameter_slots"));
    }

    #[test]
    fn empty_pending_group_adds_nothing() {
        assert_eq!(ScriptLengthEstimate::default().pending_insert_length(4, 0), 0);
        assert_eq!(
            ScriptLengthEstimate::default().pending_insert_length(2, 3),
            2 * 128 + 256 + 3 * 2 * 6 + 300
        );
    }
}
