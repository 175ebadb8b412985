use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Balance handed to a player the first time the ledger sees them.
pub const DEFAULT_STARTING_BALANCE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub starting_balance: i64,
    pub db_file: String,
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            db_file: "revolver.db".to_string(),
            history_limit: 50,
        }
    }
}

impl LedgerConfig {
    pub fn with_starting_balance(starting_balance: i64) -> Self {
        Self {
            starting_balance,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.starting_balance < 0 {
            return Err(LedgerError::config("Starting balance cannot be negative"));
        }

        if self.db_file.is_empty() {
            return Err(LedgerError::config("Database file name cannot be empty"));
        }

        if self.history_limit == 0 {
            return Err(LedgerError::config("History limit must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_balance, 100);
    }

    #[test]
    fn test_rejects_negative_starting_balance() {
        let config = LedgerConfig::with_starting_balance(-5);
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }
}
