//! Key rules enforced by the store

use crate::error::{Result, TableError};

/// Maximum key length in characters
pub const MAX_KEY_LENGTH: usize = 1024;

/// Characters the store refuses in partition and row keys
pub fn is_disallowed_key_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '#' | '?') || matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Validate a single key value
///
/// `field` names the key in the error message.
pub fn validate_key(field: &str, value: &str) -> Result<()> {
    if value.chars().count() > MAX_KEY_LENGTH {
        return Err(TableError::InvalidArgument(format!(
            "{} exceeds {} characters",
            field, MAX_KEY_LENGTH
        )));
    }

    if let Some(c) = value.chars().find(|&c| is_disallowed_key_char(c)) {
        return Err(TableError::InvalidArgument(format!(
            "{} '{}' contains disallowed character {:?}",
            field,
            value.escape_debug(),
            c
        )));
    }

    Ok(())
}
