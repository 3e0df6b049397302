use crate::errors::FsStorageError;

/// Prefix of in-flight temporary files. It cannot collide with a valid key.
pub(crate) const TEMP_PREFIX: &str = ".tmp-";

/// Returns whether `key` can be stored as a file name: non-empty and made of
/// ASCII letters, digits, `_`, and `-` only.
///
/// # Examples
/// ```
/// use akami_providers_fs::is_valid_key;
///
/// assert!(is_valid_key("hnsw_node_12"));
/// assert!(!is_valid_key("../escape"));
/// assert!(!is_valid_key(""));
/// ```
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-'))
}

pub(crate) fn checked(key: &str) -> Result<&str, FsStorageError> {
    if is_valid_key(key) {
        Ok(key)
    } else {
        Err(FsStorageError::InvalidKey { key: key.to_owned() })
    }
}

pub(crate) fn temp_name(key: &str) -> String {
    format!("{TEMP_PREFIX}{key}")
}
