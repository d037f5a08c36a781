//! [`ExtrasError`] and the wire-level [`ValidationError`].
//!
//! Every failure a request can hit, from a bad hyperlink to a missing
//! setting, ends up as one `ExtrasError` variant with a fixed HTTP status.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Key under which form-wide and serializer-wide errors are reported on the wire.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A rejected input: either one message or a list of messages per field.
///
/// ```
/// use rest_extras_core::error::ValidationError;
///
/// let required = ValidationError::new("This field is required.", "required");
/// assert_eq!(required.to_json()["non_field_errors"][0], "This field is required.");
///
/// let mut field_errors = std::collections::HashMap::new();
/// field_errors.insert(
///     "email".to_string(),
///     vec![ValidationError::new("Enter a valid email address.", "invalid")],
/// );
/// let err = ValidationError::with_field_errors(field_errors);
/// assert_eq!(err.to_json()["email"][0], "Enter a valid email address.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    /// Machine-readable reason, `required` or `invalid` and the like.
    pub code: String,
    pub params: HashMap<String, String>,
    /// Keyed by field name; empty for a bare message.
    pub field_errors: HashMap<String, Vec<Self>>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
            field_errors: HashMap::new(),
        }
    }

    /// Wraps already-built per-field errors.
    pub fn with_field_errors(field_errors: HashMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            params: HashMap::new(),
            field_errors,
        }
    }

    /// Builds a field-error mapping from plain message lists, as produced by forms.
    pub fn from_messages(errors: &HashMap<String, Vec<String>>) -> Self {
        let field_errors = errors
            .iter()
            .map(|(field, messages)| {
                let errors = messages
                    .iter()
                    .map(|m| Self::new(m.clone(), "invalid"))
                    .collect();
                (field.clone(), errors)
            })
            .collect();
        Self::with_field_errors(field_errors)
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    /// Renders the error in the REST wire format.
    ///
    /// Field errors become `{"field": ["message", ...]}`. A bare message is
    /// reported under [`NON_FIELD_ERRORS`].
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        for (field, errors) in &self.field_errors {
            let messages = errors
                .iter()
                .map(|e| serde_json::Value::String(e.message.clone()))
                .collect();
            body.insert(field.clone(), serde_json::Value::Array(messages));
        }
        if body.is_empty() && !self.message.is_empty() {
            body.insert(
                NON_FIELD_ERRORS.to_string(),
                serde_json::json!([self.message.clone()]),
            );
        }
        serde_json::Value::Object(body)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut fields: Vec<_> = self.field_errors.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let mut first = true;
            for (field, errors) in fields {
                for error in errors {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Everything that can go wrong, from request parsing down to storage.
#[derive(Error, Debug)]
pub enum ExtrasError {
    // ── API errors ───────────────────────────────────────────────────

    /// Body could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No credentials were supplied for an action that requires them.
    #[error("{0}")]
    NotAuthenticated(String),

    /// Credentials were supplied but were wrong.
    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Storage errors ───────────────────────────────────────────────

    /// `get` by primary key missed.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// Unique or not-null constraint on save.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// The storage is not usable yet (missing tables, not migrated).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Validation ───────────────────────────────────────────────────

    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// Bad `discover` arguments or settings file.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The host is improperly configured (unknown class names and similar).
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A recognised option that is deliberately not supported.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // ── Partial updates ──────────────────────────────────────────────

    /// A save failed while handling a PATCH request.
    #[error("{source}. This may be because of a partial update (PATCH) where required fields were omitted.")]
    PartialUpdate {
        /// The underlying save failure.
        source: Box<ExtrasError>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExtrasError {
    /// HTTP status this error is rendered with. A [`PartialUpdate`](Self::PartialUpdate)
    /// keeps the status of what it wraps; storage and configuration faults are 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => 400,
            Self::NotAuthenticated(_) | Self::AuthenticationFailed(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::PartialUpdate { source } => source.status_code(),
            Self::InternalServerError(_)
            | Self::IntegrityError(_)
            | Self::OperationalError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::NotImplemented(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Wraps this error as a failure that happened during a partial update.
    #[must_use]
    pub fn during_partial_update(self) -> Self {
        Self::PartialUpdate {
            source: Box::new(self),
        }
    }
}

impl From<ValidationError> for ExtrasError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

impl From<serde_json::Error> for ExtrasError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

pub type ExtrasResult<T> = Result<T, ExtrasError>;
