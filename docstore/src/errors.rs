use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for docstore operations.
///
/// Every failure raised by the registry, the identifier policies, the query
/// translator, the CRUD service or a store provider carries one of these kinds.
/// The CRUD service is the only place that turns a kind into a response status
/// (see [`crate::service::Status`]).
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::errors::{DocStoreError, ErrorKind, DocStoreResult};
///
/// fn example() -> DocStoreResult<()> {
///     Err(DocStoreError::new("document not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Client errors
    /// Malformed request body or any other client-supplied input
    InvalidInput,
    /// Collection name does not satisfy the naming rule
    InvalidName,
    /// Path identifier is malformed for the active identifier policy
    InvalidId,

    // Lookup errors
    /// Identifier does not resolve to a stored document
    NotFound,
    /// Collection does not exist in the store
    CollectionNotFound,

    // Store errors
    /// The store rejected a create/read/update/delete/index/evaluate call
    StorageFailure,
    /// A collection was created but its identifier index could not be
    IndexCreationFailed,
    /// A matched position could not be dereferenced into a document
    ReadFailed,
    /// The store has already been closed
    StoreAlreadyClosed,

    // Identifier errors
    /// Token generation failed (clock or randomness failure)
    IdentifierGenerationFailed,

    // Startup errors
    /// Collection manifest could not be read or contains a malformed line
    ManifestError,
    /// Invalid or conflicting configuration
    ConfigurationError,

    /// Error encoding or decoding stored data
    EncodingError,
    /// Generic IO error
    IOError,
    /// The operation is a named extension point without an implementation
    NotImplemented,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::InvalidName => write!(f, "Invalid collection name"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::CollectionNotFound => write!(f, "Collection not found"),
            ErrorKind::StorageFailure => write!(f, "Storage failure"),
            ErrorKind::IndexCreationFailed => write!(f, "Index creation failed"),
            ErrorKind::ReadFailed => write!(f, "Read failed"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::IdentifierGenerationFailed => write!(f, "Identifier generation failed"),
            ErrorKind::ManifestError => write!(f, "Manifest error"),
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::NotImplemented => write!(f, "Not implemented"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom docstore error type.
///
/// `DocStoreError` carries a message, an [`ErrorKind`] and an optional cause so
/// that a store failure can be wrapped by the layer that observed it without
/// losing the original reason.
///
/// ```rust,ignore
/// use docstore::errors::{DocStoreError, ErrorKind};
///
/// let cause = DocStoreError::new("partition closed", ErrorKind::StorageFailure);
/// let err = DocStoreError::new_with_cause(
///     "could not create index on id",
///     ErrorKind::IndexCreationFailed,
///     cause,
/// );
/// ```
#[derive(Clone)]
pub struct DocStoreError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocStoreError>>,
    backtrace: Arc<Backtrace>,
}

impl DocStoreError {
    /// Creates a new `DocStoreError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocStoreError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `DocStoreError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocStoreError) -> Self {
        DocStoreError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DocStoreError> {
        self.cause.as_deref()
    }
}

impl Display for DocStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => {
                let mut backtrace = (*self.backtrace).clone();
                backtrace.resolve();
                write!(f, "{} ({})\n{:?}", self.message, self.error_kind, backtrace)
            }
        }
    }
}

impl Error for DocStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for docstore operations.
pub type DocStoreResult<T> = Result<T, DocStoreError>;

impl From<std::io::Error> for DocStoreError {
    fn from(err: std::io::Error) -> Self {
        DocStoreError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<serde_json::Error> for DocStoreError {
    fn from(err: serde_json::Error) -> Self {
        DocStoreError::new(
            &format!("request body does not contain valid json: {}", err),
            ErrorKind::InvalidInput,
        )
    }
}

impl From<std::num::ParseIntError> for DocStoreError {
    fn from(err: std::num::ParseIntError) -> Self {
        DocStoreError::new(&format!("id cannot be parsed to number: {}", err), ErrorKind::InvalidId)
    }
}
