use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use chrono::Utc;

/// Returns the current wall clock time in milliseconds since the unix epoch.
///
/// A clock reporting a time before the epoch is treated as an identifier
/// generation failure, since every caller uses the value to build tokens.
pub fn current_time_millis() -> DocStoreResult<u64> {
    let millis = Utc::now().timestamp_millis();
    u64::try_from(millis).map_err(|_| {
        log::error!("System clock reports a time before the unix epoch: {}", millis);
        DocStoreError::new(
            "system clock reports a time before the unix epoch",
            ErrorKind::IdentifierGenerationFailed,
        )
    })
}
