// document constants
pub const DOC_ID: &str = "id";

// registry constants
pub const COLLECTION_NAME_PATTERN: &str = "^[A-Za-z]+$";

// store attribute constants
pub const POLICY_ATTRIBUTE: &str = "identifier_policy";

// query constants
pub const WILDCARD_QUERY: &str = "all";

// identifier constants
pub const TOKEN_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
pub const TOKEN_LENGTH: usize = 11;
