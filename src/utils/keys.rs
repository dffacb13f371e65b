use crate::base::session::SessionId;

/// Prefix under which every transfer blob is stored.
pub const TRANSFER_KEY_PREFIX: &str = "transfers";

const MAX_KEY_NAME_LEN: usize = 128;

/// Replace anything outside `[A-Za-z0-9._-]` so a user-supplied file name is
/// safe as one object-key segment.
pub fn sanitize_key_segment(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if result.chars().all(|c| c == '.') {
        result = result.replace('.', "_");
    }
    if result.len() > MAX_KEY_NAME_LEN {
        let cut = result.len() - MAX_KEY_NAME_LEN;
        result.drain(..cut);
    }
    result
}

/// Blob key for one uploaded file. The random id keeps two same-named files
/// in one session from overwriting each other.
pub fn transfer_blob_key(session: &SessionId, file_name: &str) -> String {
    format!(
        "{TRANSFER_KEY_PREFIX}/{session}/{}-{}",
        uuid::Uuid::new_v4().simple(),
        sanitize_key_segment(file_name)
    )
}
