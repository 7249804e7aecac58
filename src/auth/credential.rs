use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Cookie that carries the session credential.
pub const SESSION_COOKIE: &str = "token";

const CREDENTIAL_BYTES: usize = 32;

/// Opaque bearer credential.
///
/// The raw secret never leaves this module: it has no `Display`, a redacting
/// `Debug`, and the only ways out are the one-way [`CredentialHash`] and the
/// `Set-Cookie` value built by [`Credential::to_set_cookie`] at the issuing
/// boundary.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Issue a fresh high-entropy credential from the OS RNG.
    pub fn issue() -> Self {
        let mut bytes = [0u8; CREDENTIAL_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a raw cookie value received from a client.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn hash(&self) -> CredentialHash {
        let digest = Sha256::digest(self.0.as_bytes());
        CredentialHash(hex::encode(digest))
    }

    /// Build the `Set-Cookie` header value delivering this credential.
    pub fn to_set_cookie(&self) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/",
            SESSION_COOKIE, self.0
        )
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl Eq for Credential {}

/// One-way hash of a credential; this is the only form that is ever stored
/// or used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Length-checked, branch-free byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
