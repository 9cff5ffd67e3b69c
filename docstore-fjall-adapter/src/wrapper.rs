use docstore::collection::Document;
use docstore::common::Value;
use docstore::errors::{DocStoreError, ErrorKind};
use docstore::store::Position;
use std::error::Error;
use thiserror::Error;

/// Error type for encoding and decoding stored documents and index keys.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FjallValueError {
    #[error("Deserialization failed: {0}")]
    DeserializationError(String),
    #[error("Serialization failed: {0}")]
    SerializationError(String),
    /// A stored key did not have the expected layout
    #[error("Malformed key: {0}")]
    MalformedKey(String),
    #[error("Invalid UTF-8 in stored data: {0}")]
    InvalidUtf8(String),
}

impl From<FjallValueError> for DocStoreError {
    fn from(err: FjallValueError) -> Self {
        DocStoreError::new(&err.to_string(), ErrorKind::EncodingError)
    }
}

pub type FjallValueResult<T> = Result<T, FjallValueError>;

/// Byte-serialized form of a [Document] or [Value] as kept in a partition.
///
/// Encoding uses bincode's legacy configuration over the serde derive of the
/// value types. Equal values always encode to equal bytes, which is what the
/// index keys rely on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FjallValue(Vec<u8>);

impl FjallValue {
    #[inline]
    pub fn try_from_document(document: &Document) -> FjallValueResult<FjallValue> {
        bincode::serde::encode_to_vec(document, bincode::config::legacy())
            .map(FjallValue)
            .map_err(|e| FjallValueError::SerializationError(e.to_string()))
    }

    #[inline]
    pub fn try_into_document(self) -> FjallValueResult<Document> {
        bincode::serde::decode_from_slice(&self.0, bincode::config::legacy())
            .map(|(document, _)| document)
            .map_err(|e| FjallValueError::DeserializationError(e.to_string()))
    }

    #[inline]
    pub fn try_from_value(value: &Value) -> FjallValueResult<FjallValue> {
        bincode::serde::encode_to_vec(value, bincode::config::legacy())
            .map(FjallValue)
            .map_err(|e| FjallValueError::SerializationError(e.to_string()))
    }

    #[inline]
    pub fn try_into_value(self) -> FjallValueResult<Value> {
        bincode::serde::decode_from_slice(&self.0, bincode::config::legacy())
            .map(|(value, _)| value)
            .map_err(|e| FjallValueError::DeserializationError(e.to_string()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for FjallValue {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        FjallValue(bytes.to_vec())
    }
}

impl AsRef<[u8]> for FjallValue {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Key of a document inside its collection partition.
#[inline]
pub(crate) fn position_key(position: Position) -> [u8; 8] {
    position.to_be_bytes()
}

pub(crate) fn decode_position(bytes: &[u8]) -> FjallValueResult<Position> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| FjallValueError::MalformedKey(format!("{} byte position", bytes.len())))?;
    Ok(Position::from_be_bytes(raw))
}

/// Prefix shared by every index entry of `path` equal to `value`.
///
/// Layout: `len(path) | path | len(value) | value`, lengths as big-endian
/// `u32`. The position follows as the last eight bytes of a full entry key.
pub(crate) fn index_prefix(path: &str, value: &FjallValue) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + path.len() + value.len() + 8);
    key.extend_from_slice(&(path.len() as u32).to_be_bytes());
    key.extend_from_slice(path.as_bytes());
    key.extend_from_slice(&(value.len() as u32).to_be_bytes());
    key.extend_from_slice(value.as_ref());
    key
}

pub(crate) fn index_key(path: &str, value: &FjallValue, position: Position) -> Vec<u8> {
    let mut key = index_prefix(path, value);
    key.extend_from_slice(&position_key(position));
    key
}

/// Extracts the position from a full index entry key.
pub(crate) fn index_key_position(key: &[u8]) -> FjallValueResult<Position> {
    if key.len() < 8 {
        return Err(FjallValueError::MalformedKey(format!(
            "index key of {} bytes",
            key.len()
        )));
    }
    decode_position(&key[key.len() - 8..])
}

pub(crate) fn decode_utf8(bytes: &[u8]) -> FjallValueResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FjallValueError::InvalidUtf8(e.to_string()))
}

/// Converts fjall errors to docstore errors.
///
/// A closed keyspace maps to [ErrorKind::StoreAlreadyClosed], an io error to
/// [ErrorKind::IOError] and everything else to [ErrorKind::StorageFailure].
pub(crate) fn to_docstore_error(error: impl Error) -> DocStoreError {
    let error_msg = error.to_string();
    let error_kind = if error_msg.contains("closed") || error_msg.contains("poisoned") {
        ErrorKind::StoreAlreadyClosed
    } else if error_msg.contains("I/O") || error_msg.contains("Io") {
        ErrorKind::IOError
    } else {
        ErrorKind::StorageFailure
    };
    DocStoreError::new(&format!("Fjall Error: {}", error_msg), error_kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::doc;

    #[test]
    fn document_survives_encoding() {
        let document = doc! {
            "name": "book1",
            "pages": 120,
            "tags": vec![Value::from("a"), Value::from("b")],
            "meta": doc! { "isbn": "123" },
        };
        let encoded = FjallValue::try_from_document(&document).unwrap();
        let decoded = encoded.try_into_document().unwrap();
        assert_eq!(decoded, document);
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["name", "pages", "tags", "meta"]);
    }

    #[test]
    fn equal_values_encode_equally() {
        let a = FjallValue::try_from_value(&Value::from("7")).unwrap();
        let b = FjallValue::try_from_value(&Value::from("7".to_string())).unwrap();
        let c = FjallValue::try_from_value(&Value::from(7)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn garbage_does_not_decode() {
        let value = FjallValue::from(&[0xff_u8, 0xff, 0xff, 0xff][..]);
        let err = value.try_into_document().unwrap_err();
        assert!(matches!(err, FjallValueError::DeserializationError(_)));

        let error: DocStoreError = err.into();
        assert_eq!(error.kind(), &ErrorKind::EncodingError);
    }

    #[test]
    fn index_keys_share_their_prefix() {
        let value = FjallValue::try_from_value(&Value::from("abc")).unwrap();
        let prefix = index_prefix("id", &value);
        let key = index_key("id", &value, 42);
        assert!(key.starts_with(&prefix));
        assert_eq!(index_key_position(&key).unwrap(), 42);
    }

    #[test]
    fn index_prefix_is_unambiguous() {
        // "id" + "x..." must not be a prefix of "idx" + "..."
        let value = FjallValue::try_from_value(&Value::from("1")).unwrap();
        let short = index_prefix("id", &value);
        let long = index_prefix("idx", &value);
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn positions_sort_in_key_order() {
        assert!(position_key(2) < position_key(10));
        assert!(position_key(255) < position_key(256));
        assert_eq!(decode_position(&position_key(99)).unwrap(), 99);
        assert!(decode_position(&[1, 2, 3]).is_err());
    }

    #[test]
    fn error_mapping() {
        let closed = std::io::Error::new(std::io::ErrorKind::Other, "keyspace closed");
        assert_eq!(to_docstore_error(closed).kind(), &ErrorKind::StoreAlreadyClosed);

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let error = to_docstore_error(other);
        assert_eq!(error.kind(), &ErrorKind::StorageFailure);
        assert!(error.message().starts_with("Fjall Error:"));
    }
}
