//! Display-name sanitization.

use crate::participant::ParticipantId;

/// Default maximum display-name length, in characters, before the
/// `#xxxx` suffix is added.
pub const MAX_NAME_LEN: usize = 20;

/// Strip control characters, trim, and truncate to `max_len` characters.
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_control()).collect();
    stripped.trim().chars().take(max_len).collect()
}

/// Full display name for `identity`: the sanitized name plus `#` and the
/// first four characters of the identity. `None` if nothing is left after
/// sanitizing.
pub fn display_name(raw: &str, identity: &ParticipantId, max_len: usize) -> Option<String> {
    let name = sanitize_name(raw, max_len);
    if name.is_empty() {
        return None;
    }
    Some(format!("{}#{}", name, identity.short()))
}
