use thiserror::Error;

/// Errors raised while constructing or evaluating a material.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("no {kind} named '{name}' has been registered")]
    UnknownObject { kind: &'static str, name: String },

    #[error("object '{name}' is a {found}, expected a {expected}")]
    WrongObjectKind {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("material property '{0}' has not been declared")]
    UnknownProperty(String),

    #[error("material property '{0}' is already declared")]
    DuplicateProperty(String),

    #[error("material property '{name}' has shape {found}, expected {expected}")]
    PropertyShape {
        name: String,
        expected: String,
        found: String,
    },

    #[error("material property '{name}' has not been computed at quadrature point {qp}")]
    PropertyNotComputed { name: String, qp: usize },

    #[error("material property '{name}' has no old value for element {elem}")]
    OldValueMissing { name: String, elem: usize },

    #[error("element {elem} has {found} quadrature points, properties are sized for {capacity}")]
    TooManyPoints {
        elem: usize,
        found: usize,
        capacity: usize,
    },

    #[error("element {elem} has no quadrature point {qp}")]
    NoSuchPoint { elem: usize, qp: usize },

    #[error("{0}")]
    Domain(String),

    #[error("error in '{source_name}': {message}")]
    Collaborator { source_name: String, message: String },
}

impl MaterialError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        MaterialError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn collaborator(source_name: &str, message: impl Into<String>) -> Self {
        MaterialError::Collaborator {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// Configuration errors prevent the simulation from starting; everything else is
    /// raised while evaluating quadrature points.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            MaterialError::PropertyNotComputed { .. }
                | MaterialError::OldValueMissing { .. }
                | MaterialError::TooManyPoints { .. }
                | MaterialError::NoSuchPoint { .. }
                | MaterialError::Domain(_)
                | MaterialError::Collaborator { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MaterialError>;

/// Maps a serde error raised while reading an input block. Missing fields are reported as
/// missing parameters, everything else as an invalid block.
///
/// serde_json has no error kind for a missing field, so this matches the "missing field `x`"
/// text that serde's `de::Error::missing_field` produces. If that wording changes the error
/// still surfaces as an invalid block with the full message.
pub(crate) fn from_serde(block: &str, err: serde_json::Error) -> MaterialError {
    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("missing field `") {
        if let Some(end) = rest.find('`') {
            return MaterialError::MissingParameter(rest[..end].to_string());
        }
    }
    MaterialError::invalid(block, message)
}
