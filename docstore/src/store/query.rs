use crate::common::{Value, WILDCARD_QUERY};
use std::fmt::{Display, Formatter};

/// A query evaluated by a store against one collection.
///
/// `All` matches every document. `Eq` matches documents whose value at
/// `attribute` equals `value`, and needs an index on `attribute`. `limit` caps
/// the number of matched positions; `None` means no cap.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    All,
    Eq {
        attribute: String,
        value: Value,
        limit: Option<usize>,
    },
}

impl Query {
    pub fn all() -> Self {
        Query::All
    }

    pub fn eq<V: Into<Value>>(attribute: &str, value: V) -> Self {
        Query::Eq {
            attribute: attribute.to_string(),
            value: value.into(),
            limit: None,
        }
    }

    /// Caps the number of matches. Has no effect on the wildcard query.
    pub fn limit(self, n: usize) -> Self {
        match self {
            Query::All => Query::All,
            Query::Eq {
                attribute, value, ..
            } => Query::Eq {
                attribute,
                value,
                limit: Some(n),
            },
        }
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::All => write!(f, "{}", WILDCARD_QUERY),
            Query::Eq {
                attribute,
                value,
                limit: Some(limit),
            } => write!(f, "{} == {} (limit {})", attribute, value, limit),
            Query::Eq {
                attribute,
                value,
                limit: None,
            } => write!(f, "{} == {}", attribute, value),
        }
    }
}
