use super::TokenGenerator;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::Position;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Names an identifier policy in configuration and in the store stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Token,
    Positional,
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::Token => write!(f, "token"),
            PolicyKind::Positional => write!(f, "positional"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = DocStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(PolicyKind::Token),
            "positional" => Ok(PolicyKind::Positional),
            other => Err(DocStoreError::new(
                &format!("unknown identifier policy '{}', expected token or positional", other),
                ErrorKind::ConfigurationError,
            )),
        }
    }
}

/// How a document's external `id` is chosen and how a path id is read.
///
/// - **Token**: a fresh token is generated before the insert and stored as the
///   `id` attribute. Nothing is inserted if generation fails.
/// - **Positional**: the insert position, rendered in decimal, becomes the
///   `id`; it is written back with an update right after the insert.
///
/// Under both policies documents are found through the `id` index, never by
/// treating the path id as a position. A store must keep one policy for its
/// whole lifetime.
#[derive(Clone)]
pub enum IdentifierPolicy {
    Token(Arc<TokenGenerator>),
    Positional,
}

impl IdentifierPolicy {
    pub fn token() -> DocStoreResult<Self> {
        Ok(IdentifierPolicy::Token(Arc::new(TokenGenerator::new()?)))
    }

    pub fn positional() -> Self {
        IdentifierPolicy::Positional
    }

    pub fn from_kind(kind: PolicyKind) -> DocStoreResult<Self> {
        match kind {
            PolicyKind::Token => IdentifierPolicy::token(),
            PolicyKind::Positional => Ok(IdentifierPolicy::positional()),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            IdentifierPolicy::Token(_) => PolicyKind::Token,
            IdentifierPolicy::Positional => PolicyKind::Positional,
        }
    }

    /// Identifier to assign before the insert. `None` for the positional
    /// policy, whose identifier only exists once the store picked a position.
    pub fn pre_assign(&self) -> DocStoreResult<Option<String>> {
        match self {
            IdentifierPolicy::Token(generator) => Ok(Some(generator.generate()?)),
            IdentifierPolicy::Positional => Ok(None),
        }
    }

    /// Identifier derived from the insert position.
    pub fn from_position(&self, position: Position) -> String {
        position.to_string()
    }

    /// Validates a path identifier and returns its canonical form.
    ///
    /// Positional ids must be decimal numbers and are re-rendered, so `007`
    /// addresses the same document as `7`.
    pub fn parse(&self, raw: &str) -> DocStoreResult<String> {
        match self {
            IdentifierPolicy::Token(_) => TokenGenerator::validate(raw),
            IdentifierPolicy::Positional => {
                let position: Position = raw.parse()?;
                Ok(position.to_string())
            }
        }
    }
}

impl Display for IdentifierPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_kind_round_trips_through_text() {
        assert_eq!("token".parse::<PolicyKind>().unwrap(), PolicyKind::Token);
        assert_eq!(" Positional ".parse::<PolicyKind>().unwrap(), PolicyKind::Positional);
        assert_eq!(PolicyKind::Positional.to_string(), "positional");

        let err = "uuid".parse::<PolicyKind>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    }

    #[test]
    fn token_policy_pre_assigns() {
        let policy = IdentifierPolicy::token().unwrap();
        let id = policy.pre_assign().unwrap().unwrap();
        assert_eq!(policy.parse(&id).unwrap(), id);
        assert_eq!(policy.kind(), PolicyKind::Token);
    }

    #[test]
    fn positional_policy_uses_position() {
        let policy = IdentifierPolicy::positional();
        assert_eq!(policy.pre_assign().unwrap(), None);
        assert_eq!(policy.from_position(42), "42");
    }

    #[test]
    fn positional_ids_are_canonical_numbers() {
        let policy = IdentifierPolicy::positional();
        assert_eq!(policy.parse("7").unwrap(), "7");
        assert_eq!(policy.parse("007").unwrap(), "7");

        for raw in ["abc", "-1", "1.5", ""] {
            let err = policy.parse(raw).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidId, "{}", raw);
            assert!(err.message().starts_with("id cannot be parsed to number"));
        }
    }

    #[test]
    fn token_policy_rejects_bad_characters() {
        let policy = IdentifierPolicy::token().unwrap();
        assert_eq!(policy.parse("a/b").unwrap_err().kind(), &ErrorKind::InvalidId);
    }
}
