//! Username rules.

use crate::error::UsernameError;

/// Check that `name` is acceptable as a username.
///
/// Usernames are case-sensitive UTF-8, at most `max_len` bytes, and may not
/// contain control characters or `/` (the ledger uses `/` to separate a
/// username from a link index in storage keys).
///
/// # Errors
///
/// Returns the first [`UsernameError`] that applies.
pub fn validate_username(name: &str, max_len: usize) -> Result<(), UsernameError> {
    if name.is_empty() {
        return Err(UsernameError::Empty);
    }
    if name.len() > max_len {
        return Err(UsernameError::TooLong {
            len: name.len(),
            max: max_len,
        });
    }
    if let Some(c) = name.chars().find(|c| c.is_control() || *c == '/') {
        return Err(UsernameError::InvalidCharacter(c));
    }
    Ok(())
}
