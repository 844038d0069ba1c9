use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};


/// The X protocol limit on the length of a single property fetch, in 32-bit units.
pub const MAX_PROPERTY_LENGTH: u32 = 0x1fffffff;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse the selection config")]
    Parse(#[source] serde_json::Error),
    #[error("`targets-length` must be positive")]
    ZeroTargetsLength,
    #[error("`chunk-length` must be in the range 1..={}", MAX_PROPERTY_LENGTH)]
    InvalidChunkLength,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SelectionConfig {
    /// Maximum number of targets read from a `TARGETS` reply. Longer lists are
    /// truncated.
    pub targets_length: u32,
    /// Maximum length, in 32-bit units, of a single selection property fetch.
    pub chunk_length: u32,
    /// Only publish X selections while a surface has keyboard focus.
    pub require_focus: bool,
    /// Bridge the `PRIMARY` selection.
    pub primary_selection: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            targets_length: 4096,
            chunk_length: MAX_PROPERTY_LENGTH,
            require_focus: true,
            primary_selection: true,
        }
    }
}

impl SelectionConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets_length == 0 {
            return Err(ConfigError::ZeroTargetsLength);
        }
        if self.chunk_length == 0 || self.chunk_length > MAX_PROPERTY_LENGTH {
            return Err(ConfigError::InvalidChunkLength);
        }
        Ok(())
    }
}
