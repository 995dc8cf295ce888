//! The password-encoding collaborator: the contract the credential assembler
//! dispatches into, the parameter object it builds, and a reference
//! implementation suitable for tests and for backends without their own
//! encoder.

use crate::credential::spec::known_algorithm;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// Algorithm-specific parameters handed to the encoder alongside the
/// password itself. Exactly one shape per credential family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmParams {
    /// No parameters beyond the password (clear, simple digest).
    None,
    /// Salt plus iteration count (bcrypt).
    IteratedSalted {
        #[serde(with = "crate::ser::base64_bytes")]
        salt: Vec<u8>,
        iteration_count: u32,
    },
    /// Salt only (salted simple digest).
    Salted {
        #[serde(with = "crate::ser::base64_bytes")]
        salt: Vec<u8>,
    },
    /// HTTP digest style: the username being configured and the realm name
    /// are bound into the derivation. The username is always the principal
    /// currently being mutated, never an arbitrary one.
    Digest {
        username: String,
        realm: String,
    },
}

/// What an encoder can report back. The admin layer flattens all of these
/// into a single credential-encoding failure; the distinction only matters
/// to the encoder's own diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The algorithm name is not provided by this encoder.
    #[error("no such algorithm [{0}]")]
    NoSuchAlgorithm(String),

    /// The parameters do not fit the algorithm (wrong shape, zero iteration
    /// count, and so on).
    #[error("invalid key spec for [{algorithm}]: {reason}")]
    InvalidKeySpec {
        algorithm: String,
        reason: String,
    },

    /// The underlying provider failed for reasons of its own.
    #[error("provider failure: {0}")]
    Provider(String),
}

/// The encoding primitive this layer assembles inputs for. Implementations
/// turn `(algorithm, password, params)` into opaque credential material; how
/// they do it (and how strong it is) is their business entirely.
pub trait PasswordEncoder {
    /// Encode a password under the named algorithm with the given
    /// parameters, producing opaque material safe to persist.
    fn encode(
        &self,
        algorithm: &str,
        password: &str,
        params: &AlgorithmParams,
    ) -> std::result::Result<Vec<u8>, EncodeError>;
}

impl<T: PasswordEncoder + ?Sized> PasswordEncoder for &T {
    fn encode(
        &self,
        algorithm: &str,
        password: &str,
        params: &AlgorithmParams,
    ) -> std::result::Result<Vec<u8>, EncodeError> {
        (**self).encode(algorithm, password, params)
    }
}

/// A deterministic blake3-based encoder.
///
/// This is a *reference* encoder: it domain-separates on the algorithm name
/// and folds every parameter into the derivation, which is all the admin
/// layer's contract needs. It does not implement the actual bcrypt/digest
/// constructions and should not be mistaken for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEncoder;

impl HashEncoder {
    fn derive(algorithm: &str, parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new_derive_key(algorithm);
        for part in parts {
            // length-prefix each part so ("ab","c") != ("a","bc")
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.finalize().as_bytes().to_vec()
    }
}

impl PasswordEncoder for HashEncoder {
    fn encode(
        &self,
        algorithm: &str,
        password: &str,
        params: &AlgorithmParams,
    ) -> std::result::Result<Vec<u8>, EncodeError> {
        if !known_algorithm(algorithm) {
            return Err(EncodeError::NoSuchAlgorithm(algorithm.to_string()));
        }
        let material = match params {
            AlgorithmParams::None => Self::derive(algorithm, &[password.as_bytes()]),
            AlgorithmParams::IteratedSalted { salt, iteration_count } => {
                if *iteration_count == 0 {
                    return Err(EncodeError::InvalidKeySpec {
                        algorithm: algorithm.to_string(),
                        reason: "iteration count must be at least 1".to_string(),
                    });
                }
                let mut material = Self::derive(algorithm, &[salt, password.as_bytes()]);
                for _ in 1..*iteration_count {
                    material = Self::derive(algorithm, &[&material]);
                }
                material
            }
            AlgorithmParams::Salted { salt } => {
                Self::derive(algorithm, &[salt, password.as_bytes()])
            }
            AlgorithmParams::Digest { username, realm } => {
                Self::derive(algorithm, &[username.as_bytes(), realm.as_bytes(), password.as_bytes()])
            }
        };
        Ok(material)
    }
}
