use folio_core_types::{RequestId, TraceId};
use serde_json::Value;
use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable code usable by callers (and tests) without
/// matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Domain rules
    Validation,
    LicenseViolation,
    LineageMismatch,

    // Blueprint protocol
    BlueprintShape,
    Blueprint,

    // Types and structure
    TypeMismatch,
    Structure,
    Declaration,
    Immutable,

    // Storage
    NotFound,
    InvalidUrn,
    Integrity,

    // Integration/IO
    Io,
    Serialization,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::LicenseViolation => "ERR_LICENSE_VIOLATION",
            ExErrorKind::LineageMismatch => "ERR_LINEAGE_MISMATCH",
            ExErrorKind::BlueprintShape => "ERR_BLUEPRINT_SHAPE",
            ExErrorKind::Blueprint => "ERR_BLUEPRINT",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::Structure => "ERR_STRUCTURE",
            ExErrorKind::Declaration => "ERR_DECLARATION",
            ExErrorKind::Immutable => "ERR_IMMUTABLE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidUrn => "ERR_INVALID_URN",
            ExErrorKind::Integrity => "ERR_INTEGRITY",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the
/// context needed to debug a failed save (operation, URN, type tag).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    urn: Option<String>,
    tag: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    fragment: Option<Value>,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            urn: None,
            tag: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            fragment: None,
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_urn(mut self, urn: impl Into<String>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    /// Add the Clark-notation tag of the resource type involved
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach the offending blueprint fragment
    pub fn with_fragment(mut self, fragment: Value) -> Self {
        self.fragment = Some(fragment);
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fragment(&self) -> Option<&Value> {
        self.fragment.as_ref()
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(urn) = &self.urn {
            write!(f, " (urn: {})", urn)?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " (tag: {})", tag)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, " -- {}", fragment)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for the element model, blueprint protocol and storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FolioError {
    // ===== Domain validation =====
    /// A value violates an attribute validator, size bound or similar rule
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// License set of a resource is not acceptable
    #[error("License check failed: {message}")]
    LicenseViolation { message: String },

    /// An element occupies a role it was not instantiated for
    #[error("Element in role '{role}' does not descend from the declared prototype")]
    LineageMismatch { role: String },

    // ===== Blueprint protocol =====
    /// Blueprint JSON has the wrong shape at some nesting level
    #[error("Blueprint shape error: {message} -- {fragment}")]
    BlueprintShape { message: String, fragment: Value },

    /// Blueprint is well-formed JSON but cannot be honoured
    #[error("Blueprint error: {message} -- {fragment}")]
    Blueprint { message: String, fragment: Value },

    // ===== Types and structure =====
    /// A loaded resource is not of the expected type
    #[error("Expected resource of type {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Serialized form does not match the declared schema
    #[error("Malformed document: {message}")]
    Structure { message: String },

    /// A schema declaration is invalid (fatal at bootstrap)
    #[error("Invalid declaration of {type_name}: {message}")]
    Declaration { type_name: String, message: String },

    /// Persisted resources cannot be mutated in place
    #[error("Resource {urn} is persisted and immutable; fork it first")]
    Immutable { urn: String },

    // ===== Storage =====
    #[error("Resource not found: {urn}")]
    NotFound { urn: String },

    #[error("Invalid URN: {urn}")]
    InvalidUrn { urn: String },

    /// Differing bytes landed on an existing address
    #[error("Integrity fault for {urn}: {message}")]
    Integrity { urn: String, message: String },

    #[error("I/O error in {op}: {message}")]
    Io { op: String, message: String },

    /// XML, JSON or UTF-8 encoding/decoding failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FolioError {
    pub fn validation(message: impl Into<String>) -> Self {
        FolioError::Validation {
            message: message.into(),
        }
    }

    pub fn structure(message: impl Into<String>) -> Self {
        FolioError::Structure {
            message: message.into(),
        }
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        FolioError::Serialization {
            message: err.to_string(),
        }
    }

    pub fn shape(message: impl Into<String>, fragment: &Value) -> Self {
        FolioError::BlueprintShape {
            message: message.into(),
            fragment: fragment.clone(),
        }
    }

    pub fn blueprint(message: impl Into<String>, fragment: &Value) -> Self {
        FolioError::Blueprint {
            message: message.into(),
            fragment: fragment.clone(),
        }
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            FolioError::Validation { .. } => ExErrorKind::Validation,
            FolioError::LicenseViolation { .. } => ExErrorKind::LicenseViolation,
            FolioError::LineageMismatch { .. } => ExErrorKind::LineageMismatch,
            FolioError::BlueprintShape { .. } => ExErrorKind::BlueprintShape,
            FolioError::Blueprint { .. } => ExErrorKind::Blueprint,
            FolioError::TypeMismatch { .. } => ExErrorKind::TypeMismatch,
            FolioError::Structure { .. } => ExErrorKind::Structure,
            FolioError::Declaration { .. } => ExErrorKind::Declaration,
            FolioError::Immutable { .. } => ExErrorKind::Immutable,
            FolioError::NotFound { .. } => ExErrorKind::NotFound,
            FolioError::InvalidUrn { .. } => ExErrorKind::InvalidUrn,
            FolioError::Integrity { .. } => ExErrorKind::Integrity,
            FolioError::Io { .. } => ExErrorKind::Io,
            FolioError::Serialization { .. } => ExErrorKind::Serialization,
            FolioError::Config { .. } => ExErrorKind::Config,
            FolioError::Internal { .. } => ExErrorKind::Internal,
        }
    }
}

/// Conversion from FolioError to ExError
impl From<FolioError> for ExError {
    fn from(err: FolioError) -> Self {
        let kind = err.kind();
        match err {
            FolioError::Validation { message }
            | FolioError::LicenseViolation { message }
            | FolioError::Structure { message }
            | FolioError::Serialization { message }
            | FolioError::Config { message }
            | FolioError::Internal { message } => ExError::new(kind).with_message(message),
            FolioError::LineageMismatch { role } => ExError::new(kind)
                .with_op("validate")
                .with_message(format!("Wrong prototype in role '{}'", role)),
            FolioError::BlueprintShape { message, fragment }
            | FolioError::Blueprint { message, fragment } => ExError::new(kind)
                .with_op("patch")
                .with_message(message)
                .with_fragment(fragment),
            FolioError::TypeMismatch { expected, actual } => ExError::new(kind)
                .with_tag(actual)
                .with_message(format!("Expected {}", expected)),
            FolioError::Declaration { type_name, message } => ExError::new(kind)
                .with_op("declare")
                .with_message(format!("{}: {}", type_name, message)),
            FolioError::Immutable { urn } => ExError::new(kind)
                .with_urn(urn)
                .with_message("Persisted resource cannot be mutated"),
            FolioError::NotFound { urn } => ExError::new(kind)
                .with_urn(urn)
                .with_message("Resource not found"),
            FolioError::InvalidUrn { urn } => ExError::new(kind)
                .with_urn(urn)
                .with_message("Not a valid URN"),
            FolioError::Integrity { urn, message } => {
                ExError::new(kind).with_urn(urn).with_message(message)
            }
            FolioError::Io { op, message } => ExError::new(kind).with_op(op).with_message(message),
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::serialization(err)
    }
}

impl From<quick_xml::Error> for FolioError {
    fn from(err: quick_xml::Error) -> Self {
        FolioError::serialization(err)
    }
}

impl From<std::str::Utf8Error> for FolioError {
    fn from(err: std::str::Utf8Error) -> Self {
        FolioError::serialization(err)
    }
}
