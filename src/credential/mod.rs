//! Everything credential-shaped: the closed set of credential kinds, the
//! stored form a realm hands back, the request/descriptor types, and the
//! encoding collaborator.

pub mod encode;
pub mod spec;

pub use encode::*;
pub use spec::*;

use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};

/// The closed set of credential kinds this layer understands, plus an
/// explicit escape hatch for kinds it does not.
///
/// Realms report stored credentials already tagged with one of these; this
/// layer never inspects concrete credential types, it only matches on the
/// tag. `Other` exists for forward compatibility and makes reads fail closed
/// instead of silently dropping a credential from a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    Bcrypt,
    Clear,
    SimpleDigest,
    SaltedSimpleDigest,
    Digest,
    /// A kind outside the closed set. Carries whatever name the backend
    /// reported for it.
    Other(String),
}

impl CredentialKind {
    /// The wire tag for this kind. `Other` has no tag this layer will vouch
    /// for, so asking for one is an error.
    pub fn tag(&self) -> Result<&'static str> {
        match self {
            Self::Bcrypt => Ok("bcrypt"),
            Self::Clear => Ok("clear"),
            Self::SimpleDigest => Ok("simple-digest"),
            Self::SaltedSimpleDigest => Ok("salted-simple-digest"),
            Self::Digest => Ok("digest"),
            Self::Other(kind) => Err(Error::UnsupportedCredentialType(kind.clone())),
        }
    }
}

/// A credential as the realm stores it: kind tag, resolved algorithm name,
/// the parameters it was encoded under, and the opaque encoded material.
///
/// The material never appears in read projections; only the kind tag does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct StoredCredential {
    /// Which credential family this is.
    kind: CredentialKind,
    /// The algorithm the material was encoded under.
    algorithm: String,
    /// The parameters used at encoding time. Persisted so a backend can
    /// re-encode a guess for verification.
    params: AlgorithmParams,
    /// Opaque encoder output.
    #[serde(with = "crate::ser::base64_bytes")]
    material: Vec<u8>,
}

impl StoredCredential {
    /// Build a stored credential from the assembler's output.
    pub fn new(
        kind: CredentialKind,
        algorithm: impl Into<String>,
        params: AlgorithmParams,
        material: Vec<u8>,
    ) -> Self {
        Self { kind, algorithm: algorithm.into(), params, material }
    }
}
