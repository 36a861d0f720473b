use thiserror::Error;

pub const MAX_SHEET_KEY_LEN: usize = 64;

/// Problems with a sprite sheet key. Keys double as relative PNG paths
/// under the sprite directory, so they must stay inside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetKeyError {
    #[error("sheet key must not be empty")]
    Empty,
    #[error("sheet key is longer than 64 characters")]
    TooLong,
    #[error("sheet key must not start or end with '/'")]
    EdgeSlash,
    #[error("sheet key must not contain '..'")]
    ParentTraversal,
    #[error("sheet key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

pub(crate) fn validate_sheet_key(key: &str) -> Result<(), SheetKeyError> {
    if key.is_empty() {
        return Err(SheetKeyError::Empty);
    }
    if key.len() > MAX_SHEET_KEY_LEN {
        return Err(SheetKeyError::TooLong);
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(SheetKeyError::EdgeSlash);
    }
    if key.contains("..") {
        return Err(SheetKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(SheetKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}
