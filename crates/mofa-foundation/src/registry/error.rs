use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("version '{version}' of {kind} '{id}' already exists and entries are immutable once published")]
    VersionExists { kind: &'static str, id: String, version: String },

    #[error("version '{version}' of {kind} '{id}' is published and immutable")]
    ImmutableVersion { kind: &'static str, id: String, version: String },

    #[error("invalid semver string '{0}'")]
    InvalidVersion(String),

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl RegistryError {
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "not_found",
            RegistryError::VersionExists { .. } => "version_exists",
            RegistryError::ImmutableVersion { .. } => "immutable_version",
            RegistryError::InvalidVersion(_) => "invalid_version",
            RegistryError::BackendUnavailable(_) => "backend_unavailable",
        }
    }
}
