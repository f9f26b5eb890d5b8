//! Error types for recoil_spring

use thiserror::Error;

use crate::system::SpringId;

/// Errors raised by springs, performers and the runtime
#[derive(Error, Debug)]
pub enum SpringError {
    /// The performer does not know how to carry out this plan
    #[error("Plan type not supported by the spring performer: {0}")]
    UnsupportedPlan(String),

    /// A spring activated while it already held an activity token
    #[error("Spring {0:?} activated twice before it entered resting state")]
    SpringActivatedTwice(SpringId),

    /// A spring came to rest without holding an activity token
    #[error("Spring {0:?} came to rest without an activity token")]
    TokenNotHeld(SpringId),

    /// An activity token was needed before a generator was supplied
    #[error("Activity token requested before a token generator was set")]
    MissingTokenGenerator,

    /// `initialize` was called on an already initialized performer
    #[error("Performer is already initialized")]
    AlreadyInitialized,

    /// Coefficients or system parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a TOML configuration
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for recoil_spring operations
pub type Result<T> = std::result::Result<T, SpringError>;
