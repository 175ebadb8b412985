use crate::error::{DuelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    pub max_rounds: u32,
    pub lives_per_round: u32,
    pub min_chambers: usize,
    pub max_chambers: usize,
    /// Winnings are `bet * win_multiplier`.
    pub win_multiplier: i64,
    /// Surrender and timeout forfeits cost `bet / surrender_divisor`.
    pub surrender_divisor: i64,
    /// Seconds the player has to answer a prompt before forfeiting.
    pub choice_timeout_secs: u64,
    /// Fixed seed for reproducible matches; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            lives_per_round: 3,
            min_chambers: 6,
            max_chambers: 9,
            win_multiplier: 3,
            surrender_divisor: 2,
            choice_timeout_secs: 30,
            seed: None,
        }
    }
}

impl DuelConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn choice_timeout(&self) -> Duration {
        Duration::from_secs(self.choice_timeout_secs)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(DuelError::config("A match needs at least one round"));
        }

        if self.lives_per_round == 0 {
            return Err(DuelError::config("Lives per round must be greater than 0"));
        }

        // at least one loaded and one empty chamber
        if self.min_chambers < 2 {
            return Err(DuelError::config("A revolver needs at least 2 chambers"));
        }

        if self.min_chambers > self.max_chambers {
            return Err(DuelError::config(format!(
                "Chamber range {}..={} is empty",
                self.min_chambers, self.max_chambers
            )));
        }

        if self.win_multiplier < 0 {
            return Err(DuelError::config("Win multiplier cannot be negative"));
        }

        if self.surrender_divisor <= 0 {
            return Err(DuelError::config("Surrender divisor must be greater than 0"));
        }

        if self.choice_timeout_secs == 0 {
            return Err(DuelError::config("Choice timeout must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_house_rules() {
        let config = DuelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.lives_per_round, 3);
        assert_eq!(config.choice_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = DuelConfig::default();
        config.min_chambers = 10;
        assert!(matches!(config.validate(), Err(DuelError::Config(_))));

        let mut config = DuelConfig::default();
        config.min_chambers = 1;
        config.max_chambers = 1;
        assert!(config.validate().is_err());

        let mut config = DuelConfig::default();
        config.surrender_divisor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_validates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("duel.json");

        std::fs::write(&path, r#"{"win_multiplier": 5}"#).unwrap();
        assert_eq!(DuelConfig::load(&path).unwrap().win_multiplier, 5);

        std::fs::write(&path, r#"{"lives_per_round": 0}"#).unwrap();
        assert!(matches!(DuelConfig::load(&path), Err(DuelError::Config(_))));

        assert!(matches!(
            DuelConfig::load(&temp_dir.path().join("missing.json")),
            Err(DuelError::Io(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DuelConfig = serde_json::from_str(r#"{"max_rounds": 5, "seed": 11}"#).unwrap();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.max_chambers, 9);
    }

    #[test]
    fn test_timeout_read_as_seconds() {
        let config: DuelConfig = serde_json::from_str(r#"{"choice_timeout_secs": 45}"#).unwrap();
        assert_eq!(config.choice_timeout(), Duration::from_secs(45));

        let json = serde_json::to_value(DuelConfig::default()).unwrap();
        assert_eq!(json["choice_timeout_secs"], 30);

        let config: DuelConfig = serde_json::from_str(r#"{"choice_timeout_secs": 0}"#).unwrap();
        assert!(matches!(config.validate(), Err(DuelError::Config(_))));
    }
}
