use crate::errors::{DocStoreError, ErrorKind};
use serde_json::json;

/// Outcome status of a CRUD operation, carrying its HTTP code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    BadRequest,
    UnprocessableEntity,
    InternalServerError,
    NotImplemented,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::BadRequest => 400,
            Status::UnprocessableEntity => 422,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
        }
    }

    /// Maps an error kind to its response status.
    ///
    /// Client input problems are 400, an identifier that resolves to nothing
    /// is 422, the search extension point is 501 and everything else is a
    /// server-side failure.
    pub fn classify(error: &DocStoreError) -> Status {
        match error.kind() {
            ErrorKind::InvalidInput | ErrorKind::InvalidName | ErrorKind::InvalidId => {
                Status::BadRequest
            }
            ErrorKind::NotFound => Status::UnprocessableEntity,
            ErrorKind::NotImplemented => Status::NotImplemented,
            ErrorKind::CollectionNotFound
            | ErrorKind::StorageFailure
            | ErrorKind::IndexCreationFailed
            | ErrorKind::ReadFailed
            | ErrorKind::StoreAlreadyClosed
            | ErrorKind::IdentifierGenerationFailed
            | ErrorKind::ManifestError
            | ErrorKind::ConfigurationError
            | ErrorKind::EncodingError
            | ErrorKind::IOError
            | ErrorKind::InternalError => Status::InternalServerError,
        }
    }
}

/// A status with its JSON body, ready to be written as a response.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub body: serde_json::Value,
}

impl Reply {
    pub fn new(status: Status, body: serde_json::Value) -> Self {
        Reply { status, body }
    }

    /// `{"error": "<message>"}` with the classified status.
    pub fn from_error(error: &DocStoreError) -> Self {
        Reply {
            status: Status::classify(error),
            body: json!({ "error": error.message() }),
        }
    }

    /// `success` with the value, or the classified error.
    pub fn from_result(success: Status, result: Result<serde_json::Value, DocStoreError>) -> Self {
        match result {
            Ok(body) => Reply::new(success, body),
            Err(error) => Reply::from_error(&error),
        }
    }
}
