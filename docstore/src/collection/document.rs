use crate::common::{Value, DOC_ID};
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use indexmap::IndexMap;
use std::fmt::{Debug, Display};

/// A schema-less document.
///
/// A document is an ordered mapping from attribute name to [Value]. Attribute
/// order is the order in which attributes were first inserted, so a document
/// read back from a store renders in the same order the client sent it.
///
/// Exactly one attribute is reserved: `id`, the externally visible identifier.
/// It is assigned by the CRUD service on create and forced from the request
/// path on update; any client supplied value is overwritten.
///
/// Nested attributes can be addressed with a dotted path (`"meta.pages"`) in
/// [Document::get_path]; that is how an index on a nested attribute finds its
/// value.
///
/// ```text
/// let mut doc = doc!{ "name": "book1", "isbn": "0815-1" };
/// doc.set_id("AAYjv2bUq0A");
/// assert_eq!(doc.id(), Some("AAYjv2bUq0A"));
/// ```
#[derive(Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Parses a request body into a document.
    ///
    /// The body must be a JSON object; anything else (invalid JSON, arrays,
    /// scalars) is rejected with [ErrorKind::InvalidInput].
    pub fn from_json_slice(body: &[u8]) -> DocStoreResult<Document> {
        let json: serde_json::Value = serde_json::from_slice(body)?;
        Document::try_from(json)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`, replacing any previous value in place.
    pub fn put<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the value at a dotted attribute path, descending into nested
    /// documents. `None` when any segment is missing or is not a document.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = current.as_document()?.data.get(segment)?;
        }
        Some(current)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// The external identifier, if the document has been assigned one.
    pub fn id(&self) -> Option<&str> {
        self.data.get(DOC_ID).and_then(|v| v.as_str())
    }

    /// Sets the reserved `id` attribute, overwriting whatever was there.
    pub fn set_id(&mut self, id: &str) {
        self.data.insert(DOC_ID.to_string(), Value::from(id));
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.clone().into())
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = DocStoreError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Document::from(map)),
            other => {
                log::debug!("Rejecting non-object document body: {}", other);
                Err(DocStoreError::new(
                    "request body does not contain a json object",
                    ErrorKind::InvalidInput,
                ))
            }
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Document {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Document {
            data: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl From<Document> for serde_json::Map<String, serde_json::Value> {
    fn from(doc: Document) -> Self {
        doc.data
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Builds a [Document] from `"key": value` pairs.
///
/// ```
/// use docstore::doc;
///
/// let doc = doc!{ "name": "book1", "pages": 120 };
/// assert_eq!(doc.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };
    ($($key:literal : $value:expr),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($key, $value);
            )*
            doc
        }
    };
}
