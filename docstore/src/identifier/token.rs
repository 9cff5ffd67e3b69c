use super::SnowflakeIdGenerator;
use crate::common::{TOKEN_ALPHABET, TOKEN_LENGTH};
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};

const MAX_TOKEN_LENGTH: usize = 64;

/// Generates short, URL-safe identifier tokens.
///
/// A token is a [SnowflakeIdGenerator] id rendered big-endian in 11 symbols of
/// the 64-symbol base64url alphabet (`A-Z a-z 0-9 - _`). Tokens from a single
/// process never repeat; across processes the random node id makes a collision
/// practically impossible. No uniqueness check is made against the store.
pub struct TokenGenerator {
    ids: SnowflakeIdGenerator,
}

impl TokenGenerator {
    pub fn new() -> DocStoreResult<Self> {
        Ok(TokenGenerator {
            ids: SnowflakeIdGenerator::new()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_ids(ids: SnowflakeIdGenerator) -> Self {
        TokenGenerator { ids }
    }

    pub fn generate(&self) -> DocStoreResult<String> {
        let id = self.ids.get_id()?;
        Ok(encode(id))
    }

    /// Checks that `raw` could be a token: non-empty, at most 64 symbols, all
    /// from the token alphabet.
    pub fn validate(raw: &str) -> DocStoreResult<String> {
        if raw.is_empty() || raw.len() > MAX_TOKEN_LENGTH {
            log::debug!("Rejecting token of length {}", raw.len());
            return Err(DocStoreError::new(
                &format!("id must be 1 to {} characters long", MAX_TOKEN_LENGTH),
                ErrorKind::InvalidId,
            ));
        }
        if !raw.bytes().all(|b| TOKEN_ALPHABET.contains(&b)) {
            log::debug!("Rejecting token with characters outside the alphabet: {}", raw);
            return Err(DocStoreError::new(
                &format!("id {} contains characters outside [A-Za-z0-9_-]", raw),
                ErrorKind::InvalidId,
            ));
        }
        Ok(raw.to_string())
    }
}

fn encode(id: u64) -> String {
    (0..TOKEN_LENGTH)
        .map(|i| {
            let shift = 6 * (TOKEN_LENGTH - 1 - i);
            TOKEN_ALPHABET[((id >> shift) & 0x3f) as usize] as char
        })
        .collect()
}
