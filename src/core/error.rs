use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Config file error: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("Invalid mapping: {0} => {1}; target must be a rule set or \"exclude\"")]
    InvalidMapping(String, String),

    #[error("No mapping to delete: {0}")]
    NoSuchMapping(String),

    #[error("Schedule is not valid")]
    InvalidSchedule,

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WardenError>;
