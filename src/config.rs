//! Arena configuration.

use crate::escrow::Share;
use crate::types::{Amount, CompetitionId};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strictly_connect::ConnectRules;
use strum::{Display as StrumDisplay, EnumString};
use tracing::{debug, info, instrument};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "STRICTLY_ARENA_CONFIG";

/// What a drawn match pays out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawPolicy {
    /// Each player gets half the escrow back.
    #[default]
    RefundBoth,
    /// Nobody is paid; the escrow is retained.
    ZeroShare,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ArenaConfig {
    /// Board rows.
    #[serde(default = "default_rows")]
    rows: usize,

    /// Board columns.
    #[serde(default = "default_cols")]
    cols: usize,

    /// Discs in a row needed to win.
    #[serde(default = "default_connect")]
    connect: usize,

    /// Blocks of inactivity that must be exceeded before a forfeit claim.
    #[serde(default = "default_timeout_blocks")]
    timeout_blocks: u64,

    /// Per-player stake of the default competition.
    #[serde(default = "default_participation_fee")]
    participation_fee: Amount,

    /// Id of the competition registered at startup.
    #[serde(default = "default_competition")]
    default_competition: CompetitionId,

    /// Payout on a draw.
    #[serde(default)]
    draw_policy: DrawPolicy,

    /// Winner's share on a board win.
    #[serde(default)]
    win_share: Share,

    /// Claimant's share on a timeout forfeit.
    #[serde(default)]
    forfeit_share: Share,
}

fn default_rows() -> usize {
    ConnectRules::STANDARD.rows
}

fn default_cols() -> usize {
    ConnectRules::STANDARD.cols
}

fn default_connect() -> usize {
    ConnectRules::STANDARD.connect
}

fn default_timeout_blocks() -> u64 {
    10
}

fn default_participation_fee() -> Amount {
    100
}

fn default_competition() -> CompetitionId {
    CompetitionId::from("global")
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            connect: default_connect(),
            timeout_blocks: default_timeout_blocks(),
            participation_fee: default_participation_fee(),
            default_competition: default_competition(),
            draw_policy: DrawPolicy::default(),
            win_share: Share::default(),
            forfeit_share: Share::default(),
        }
    }
}

impl ArenaConfig {
    /// Loads and validates configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(
            competition = %config.default_competition,
            timeout_blocks = config.timeout_blocks,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path` if given, otherwise from `STRICTLY_ARENA_CONFIG`,
    /// otherwise returns the defaults.
    #[instrument]
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(path) if !path.is_empty() => Self::from_file(path),
                _ => {
                    debug!("No config file given, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Board dimensions and connect threshold.
    pub fn rules(&self) -> ConnectRules {
        ConnectRules {
            rows: self.rows,
            cols: self.cols,
            connect: self.connect,
        }
    }

    /// Checks board dimensions, payout shares and that two stakes of the
    /// participation fee fit in an [`Amount`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules()
            .validate()
            .map_err(|reason| ConfigError::new(format!("Invalid board: {}", reason)))?;
        for (name, share) in [("win_share", self.win_share), ("forfeit_share", self.forfeit_share)] {
            share
                .validate()
                .map_err(|e| ConfigError::new(format!("Invalid {}: {}", name, e)))?;
        }
        if self.default_competition.as_str().is_empty() {
            return Err(ConfigError::new("default_competition must not be empty"));
        }
        if self.participation_fee.checked_mul(2).is_none() {
            return Err(ConfigError::new(format!(
                "participation_fee {} is too large to stake twice",
                self.participation_fee
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
