//! Error types for scenario handling and component editing.
//!
//! The physics engines never fail: numerical trouble ends a particle's chain instead.
//! Everything here comes from the configuration surface.

use thiserror::Error;

use crate::component::ComponentKind;

#[derive(Error, Debug)]
pub enum PmtError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Component {index} ({kind:?}) is a fixed part of the tube and cannot be removed")]
    ProtectedComponent { index: usize, kind: ComponentKind },

    #[error("Tube already has a {0:?}")]
    DuplicateSingleton(ComponentKind),

    #[error("No component at index {0}")]
    NoSuchComponent(usize),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PmtError>;
