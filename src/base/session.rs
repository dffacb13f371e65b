//! Short, human-typed session codes.
//!
//! A code is the only thing two devices share. It is a lookup key, not an
//! identity: generation never checks for collisions, and two senders that
//! happen to draw the same code see their records merged.

use crate::prelude::*;

use rand::Rng;
use std::fmt;

/// Characters a code is drawn from. Input is case-normalized before it is
/// compared against this set.
pub const SESSION_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const MIN_SESSION_CODE_LEN: usize = 6;
pub const MAX_GENERATED_CODE_LEN: usize = 9;
pub const DEFAULT_SESSION_CODE_LEN: usize = MAX_GENERATED_CODE_LEN;

/// Upper bound on accepted input, so free text never becomes a store key.
pub const MAX_SESSION_CODE_LEN: usize = 32;

const SHARE_LINK_PARAM: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh code of the default length.
    pub fn generate() -> Self {
        Self::generate_with_len(DEFAULT_SESSION_CODE_LEN)
    }

    /// Mint a fresh code. `len` is clamped to the range a person can type
    /// and the validator accepts.
    pub fn generate_with_len(len: usize) -> Self {
        let len = len.clamp(MIN_SESSION_CODE_LEN, MAX_GENERATED_CODE_LEN);
        let mut rng = rand::rng();
        let code = (0..len)
            .map(|_| SESSION_ALPHABET[rng.random_range(0..SESSION_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalize (trim, uppercase) and validate a typed or pasted code.
    pub fn parse(candidate: &str) -> Result<Self> {
        let normalized = normalize(candidate);
        if normalized.len() < MIN_SESSION_CODE_LEN {
            input_bail!(
                "session code must be at least {MIN_SESSION_CODE_LEN} characters, got {}",
                normalized.len()
            );
        }
        if normalized.len() > MAX_SESSION_CODE_LEN {
            input_bail!("session code must be at most {MAX_SESSION_CODE_LEN} characters");
        }
        if let Some(c) = normalized.bytes().find(|b| !SESSION_ALPHABET.contains(b)) {
            input_bail!("session code contains invalid character `{}`", c as char);
        }
        Ok(Self(normalized))
    }

    /// Accept either a bare code or a share link carrying `?session=CODE`.
    pub fn from_scanned(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        let Some((_, query)) = payload.split_once('?') else {
            return Self::parse(payload);
        };
        let query = query.split('#').next().unwrap_or_default();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if key == SHARE_LINK_PARAM {
                let decoded = urlencoding::decode(value)
                    .map_err(|e| Error::invalid_input(format!("malformed share link: {e}")))?;
                return Self::parse(&decoded);
            }
        }
        input_bail!("share link has no `{SHARE_LINK_PARAM}` parameter")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn normalize(candidate: &str) -> String {
    candidate.trim().to_ascii_uppercase()
}

/// Whether `candidate` would be accepted as a session code.
pub fn validate(candidate: &str) -> bool {
    SessionId::parse(candidate).is_ok()
}

/// Build the link a QR code or message carries for `session`.
pub fn share_link(base_url: &str, session: &SessionId) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{base_url}{separator}{SHARE_LINK_PARAM}={}",
        urlencoding::encode(session.as_str())
    )
}
