//! Error types for cache client operations.

use thiserror::Error;
use tonic::Status;

/// Result type for cache client operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Kind of an [`SdkError`], for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    Authentication,
    BadRequest,
    Timeout,
    InternalServer,
    ClientSdk,
}

impl ErrorKind {
    /// Stable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgumentError",
            Self::AlreadyExists => "AlreadyExistsError",
            Self::NotFound => "NotFoundError",
            Self::Authentication => "AuthenticationError",
            Self::BadRequest => "BadRequestError",
            Self::Timeout => "TimeoutError",
            Self::InternalServer => "InternalServerError",
            Self::ClientSdk => "ClientSdkError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure surfaced by the cache client.
///
/// Errors raised by the service keep the originating [`Status`] as their
/// source. Transport-specific error types never appear here directly.
#[derive(Debug, Error)]
pub enum SdkError {
    /// An input was rejected before any request was sent.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The resource already exists.
    #[error("Already exists: {message}")]
    AlreadyExists {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The credential was missing, invalid or lacked permission.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The service rejected the request.
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The request did not complete within the deadline.
    #[error("Request timed out: {message}")]
    Timeout {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The service failed or answered with something unrecognized.
    #[error("Internal server error: {message}")]
    InternalServer {
        message: String,
        #[source]
        status: Option<Status>,
    },

    /// The client itself is in an inconsistent state.
    #[error("Client error: {message}")]
    ClientSdk {
        message: String,
        #[source]
        status: Option<Status>,
    },
}

impl SdkError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn internal_server(message: impl Into<String>) -> Self {
        Self::InternalServer {
            message: message.into(),
            status: None,
        }
    }

    pub fn client_sdk(message: impl Into<String>) -> Self {
        Self::ClientSdk {
            message: message.into(),
            status: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            status: None,
        }
    }

    /// Build the error of the given kind from a service status.
    pub(crate) fn from_status(kind: ErrorKind, status: Status) -> Self {
        let message = status.message().to_string();
        let status = Some(status);
        match kind {
            ErrorKind::InvalidArgument => Self::InvalidArgument { message },
            ErrorKind::AlreadyExists => Self::AlreadyExists { message, status },
            ErrorKind::NotFound => Self::NotFound { message, status },
            ErrorKind::Authentication => Self::Authentication { message, status },
            ErrorKind::BadRequest => Self::BadRequest { message, status },
            ErrorKind::Timeout => Self::Timeout { message, status },
            ErrorKind::InternalServer => Self::InternalServer { message, status },
            ErrorKind::ClientSdk => Self::ClientSdk { message, status },
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InternalServer { .. } => ErrorKind::InternalServer,
            Self::ClientSdk { .. } => ErrorKind::ClientSdk,
        }
    }

    /// The error message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument { message }
            | Self::AlreadyExists { message, .. }
            | Self::NotFound { message, .. }
            | Self::Authentication { message, .. }
            | Self::BadRequest { message, .. }
            | Self::Timeout { message, .. }
            | Self::InternalServer { message, .. }
            | Self::ClientSdk { message, .. } => message,
        }
    }

    /// The service status that caused this error, if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::InvalidArgument { .. } => None,
            Self::AlreadyExists { status, .. }
            | Self::NotFound { status, .. }
            | Self::Authentication { status, .. }
            | Self::BadRequest { status, .. }
            | Self::Timeout { status, .. }
            | Self::InternalServer { status, .. }
            | Self::ClientSdk { status, .. } => status.as_ref(),
        }
    }
}
