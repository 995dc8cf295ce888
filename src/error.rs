//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while administering identities.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
///
/// Each variant carries the context a boundary layer needs to format or log
/// the failure (principal name, cause text). The crate itself never formats
/// or logs anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The realm (or authorization) backend could not be reached, or errored
    /// mid-operation. No retry is performed internally; the caller decides.
    #[error("realm backend unavailable while operating on identity [{principal}]: {cause}")]
    BackendUnavailable {
        /// The principal the failed operation was addressing.
        principal: String,
        /// What the backend reported.
        cause: String,
    },

    /// The backend failed while creating an identity that was verified to not
    /// exist a moment earlier.
    #[error("could not create identity [{principal}]: {cause}")]
    CannotCreateIdentity {
        principal: String,
        cause: String,
    },

    /// The backend failed while deleting an identity that was verified to
    /// exist a moment earlier.
    #[error("could not delete identity [{principal}]: {cause}")]
    CannotDeleteIdentity {
        principal: String,
        cause: String,
    },

    /// The read-modify-write cycle over an identity's attribute map failed.
    #[error("could not modify identity attributes: {0}")]
    CannotModifyAttributes(String),

    /// The password-encoding collaborator rejected the algorithm or its
    /// parameters. The underlying provider taxonomy is flattened here on
    /// purpose; callers never need to distinguish it.
    #[error("could not encode password credential: {0}")]
    CredentialEncoding(String),

    /// An error while decoding base64 data.
    #[error("base64 decode error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// Create was attempted on a principal that already exists.
    #[error("identity [{0}] already exists")]
    IdentityAlreadyExists(String),

    /// The principal does not exist where existence was required.
    #[error("identity [{0}] not found")]
    IdentityNotFound(String),

    /// The principal exists but failed an authorization check. Distinct from
    /// [`IdentityNotFound`][Error::IdentityNotFound] by design.
    #[error("identity [{0}] is not authorized")]
    IdentityNotAuthorized(String),

    /// A malformed attribute request (for instance, an add with zero values).
    /// Rejected before any backend contact.
    #[error("invalid attribute request: {0}")]
    InvalidAttributeRequest(String),

    /// A malformed or contradictory password request (for instance, two
    /// credential sections present, or none). Rejected before any backend
    /// contact.
    #[error("invalid password request: {0}")]
    InvalidPasswordRequest(String),

    /// An algorithm name outside the closed set a credential type accepts.
    #[error("unsupported password algorithm [{0}]")]
    UnsupportedAlgorithm(String),

    /// A stored credential carries a kind outside the closed set this layer
    /// understands. Reads fail closed on this rather than silently dropping
    /// the credential from the result.
    #[error("unsupported credential type [{0}]")]
    UnsupportedCredentialType(String),
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
