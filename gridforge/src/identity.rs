//! Device identity tokens
//!
//! Generated firmware announces a signed identity string in its discovery
//! payload. Tokens normally come from an external issuing service behind the
//! [`IdentityIssuer`] trait; [`LocalSigner`] issues them offline from a
//! shared secret. When no token can be obtained the firmware carries
//! [`UNREGISTERED_IDENTITY`] instead.
//!
//! Token layout: twelve 11-bit indices rendered as 3-digit hex groups joined
//! by `-`. Indices 0..11 carry the identity record (two slots reserved), the
//! twelfth is a checksum over the others and the signer's secret.

use serde::{Deserialize, Serialize};

/// Substituted when no identity token is available.
pub const UNREGISTERED_IDENTITY: &str = "UNREGISTERED-DEV-KEY";

const INDEX_SPACE: u32 = 2048;
const TOKEN_WORDS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity issuer unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid identity token: {0}")]
    Malformed(String),
    #[error("Identity token checksum mismatch")]
    ChecksumMismatch,
}

/// Structured identity record. Each field is an index in `0..2048`; larger
/// values wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityData {
    pub role: u16,
    #[serde(rename = "type")]
    pub kind: u16,
    pub name: u16,
    pub version: u16,
    pub model: u16,
    pub prod_date: u16,
    pub act_date: u16,
    pub expiry_date: u16,
    pub sku: u16,
}

impl Default for IdentityData {
    fn default() -> Self {
        Self {
            role: 0,
            kind: 1,
            name: 1,
            version: 1,
            model: 1,
            prod_date: 1,
            act_date: 1,
            expiry_date: 1,
            sku: 1,
        }
    }
}

impl IdentityData {
    fn indices(&self) -> [u16; TOKEN_WORDS - 1] {
        let wrap = |v: u16| (v as u32 % INDEX_SPACE) as u16;
        [
            wrap(self.role),
            wrap(self.kind),
            wrap(self.name),
            0,
            wrap(self.version),
            wrap(self.model),
            wrap(self.prod_date),
            wrap(self.act_date),
            wrap(self.expiry_date),
            wrap(self.sku),
            0,
        ]
    }

    fn from_indices(indices: &[u16]) -> Self {
        Self {
            role: indices[0],
            kind: indices[1],
            name: indices[2],
            version: indices[4],
            model: indices[5],
            prod_date: indices[6],
            act_date: indices[7],
            expiry_date: indices[8],
            sku: indices[9],
        }
    }
}

/// Source of signed identity tokens.
pub trait IdentityIssuer {
    fn issue(&self, data: &IdentityData) -> Result<String, IdentityError>;
}

/// Issue a token, or fall back to [`UNREGISTERED_IDENTITY`]. No retry.
pub fn resolve_identity(issuer: &dyn IdentityIssuer, data: &IdentityData) -> String {
    match issuer.issue(data) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Identity generation failed, using sentinel: {}", e);
            UNREGISTERED_IDENTITY.to_string()
        }
    }
}

/// Offline signer keyed by a master secret.
#[derive(Clone)]
pub struct LocalSigner {
    master_secret: String,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn new(master_secret: impl Into<String>) -> Self {
        Self {
            master_secret: master_secret.into(),
        }
    }

    /// Rolling 31-multiplier hash over `"i0-i1-...-i10" + secret`, folded
    /// into the index space.
    fn checksum(&self, indices: &[u16]) -> u16 {
        let joined = indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("-");
        let mut hash: i32 = 0;
        for unit in joined.encode_utf16().chain(self.master_secret.encode_utf16()) {
            hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
        }
        ((hash as i64).abs() % INDEX_SPACE as i64) as u16
    }

    /// Decode a token and check its checksum.
    pub fn verify(&self, token: &str) -> Result<IdentityData, IdentityError> {
        let indices = token
            .split('-')
            .map(|group| {
                let well_formed = group.len() == 3 && group.chars().all(|c| c.is_ascii_hexdigit());
                well_formed
                    .then(|| u16::from_str_radix(group, 16).ok())
                    .flatten()
                    .filter(|v| (*v as u32) < INDEX_SPACE)
                    .ok_or_else(|| IdentityError::Malformed(format!("bad group '{}'", group)))
            })
            .collect::<Result<Vec<u16>, _>>()?;

        if indices.len() != TOKEN_WORDS {
            return Err(IdentityError::Malformed(format!(
                "expected {} groups, found {}",
                TOKEN_WORDS,
                indices.len()
            )));
        }

        let (data, checksum) = indices.split_at(TOKEN_WORDS - 1);
        if self.checksum(data) != checksum[0] {
            return Err(IdentityError::ChecksumMismatch);
        }
        Ok(IdentityData::from_indices(data))
    }
}

impl IdentityIssuer for LocalSigner {
    fn issue(&self, data: &IdentityData) -> Result<String, IdentityError> {
        if self.master_secret.is_empty() {
            return Err(IdentityError::Unavailable("empty signing secret".to_string()));
        }
        let indices = data.indices();
        let checksum = self.checksum(&indices);
        Ok(indices
            .iter()
            .chain(std::iter::once(&checksum))
            .map(|i| format!("{:03x}", i))
            .collect::<Vec<_>>()
            .join("-"))
    }
}
