//! The realm collaborator contracts and the identity handle.
//!
//! A realm is the pluggable, mutable store of identities this crate
//! administers. The crate never talks to a realm's identities directly; it
//! goes through [`IdentityHandle`], an owning guard that guarantees the
//! backend handle is disposed on every exit path, including early validation
//! failures and backend errors.

use crate::{
    attributes::Attributes,
    credential::StoredCredential,
    error::{Error, Result},
};
use serde_derive::{Deserialize, Serialize};

/// The name of the subject of an identity record. Case-sensitive and unique
/// within a realm.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Borrow the principal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Principal {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a realm backend reports when it cannot complete a call: a timeout, a
/// dropped connection, a storage fault. This layer wraps it with the
/// principal it was operating on and propagates it verbatim; no retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RealmError(String);

impl RealmError {
    /// Create a new backend error with a human-readable cause.
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }
}

/// Shorthand for results the realm collaborator traits return.
pub type RealmResult<T> = std::result::Result<T, RealmError>;

/// The attribute/credential-bearing projection of an identity as the realm
/// stores it.
#[derive(Debug, Clone, PartialEq, Eq, getset::Getters)]
#[getset(get = "pub")]
pub struct AuthorizationIdentity {
    /// The identity's attribute multimap.
    attributes: Attributes,
    /// The identity's stored credentials, already kind-tagged by the realm.
    credentials: Vec<StoredCredential>,
}

impl AuthorizationIdentity {
    /// Build a projection from its parts.
    pub fn new(attributes: Attributes, credentials: Vec<StoredCredential>) -> Self {
        Self { attributes, credentials }
    }

    /// Split the projection into its parts.
    pub fn into_parts(self) -> (Attributes, Vec<StoredCredential>) {
        (self.attributes, self.credentials)
    }
}

/// A realm that can hand out mutable identity handles.
pub trait ModifiableRealm {
    /// The backend's identity handle type.
    type Identity: RealmIdentity;

    /// Obtain a handle bound to `principal`, whether or not such an identity
    /// exists yet. The caller owns the handle and must dispose it (done
    /// automatically when wrapped in an [`IdentityHandle`]).
    fn resolve_for_update(&self, principal: &Principal) -> RealmResult<Self::Identity>;
}

/// One identity as seen through an exclusive, short-lived backend handle.
///
/// After [`dispose`][RealmIdentity::dispose] every other method may fail;
/// dispose itself is idempotent and always safe to call again.
pub trait RealmIdentity {
    /// Whether the identity exists in the realm.
    fn exists(&self) -> RealmResult<bool>;

    /// Create the identity. The caller checks existence first.
    fn create(&mut self) -> RealmResult<()>;

    /// Delete the identity. The caller checks existence first.
    fn delete(&mut self) -> RealmResult<()>;

    /// Read the identity's attribute/credential projection.
    fn authorization_identity(&self) -> RealmResult<AuthorizationIdentity>;

    /// Replace the identity's whole attribute map.
    fn set_attributes(&mut self, attributes: Attributes) -> RealmResult<()>;

    /// Replace the identity's whole credential set.
    fn set_credentials(&mut self, credentials: Vec<StoredCredential>) -> RealmResult<()>;

    /// Release the handle. Idempotent, never fails.
    fn dispose(&mut self);
}

pub(crate) fn backend_unavailable(principal: &Principal) -> impl Fn(RealmError) -> Error + '_ {
    move |e| Error::BackendUnavailable { principal: principal.to_string(), cause: e.to_string() }
}

/// An owning guard over a backend identity handle.
///
/// The operation that resolved the handle owns it exclusively for the
/// duration of that operation. Disposal happens in `Drop`, so every exit
/// path (success, validation failure, backend error, panic unwind) releases
/// the backend handle exactly once from the backend's point of view.
#[derive(Debug)]
pub struct IdentityHandle<I: RealmIdentity> {
    identity: I,
    principal: Principal,
}

impl<I: RealmIdentity> IdentityHandle<I> {
    /// Resolve a handle for `principal` against `realm`.
    ///
    /// A handle is always obtained first. With `require_exists`, an absent
    /// identity fails with [`Error::IdentityNotFound`] and the handle is
    /// disposed before the error propagates. Backend failure during
    /// resolution or the existence probe becomes
    /// [`Error::BackendUnavailable`], again with the handle disposed if one
    /// was obtained.
    pub fn resolve<R>(realm: &R, principal: &Principal, require_exists: bool) -> Result<Self>
    where
        R: ModifiableRealm<Identity = I> + ?Sized,
    {
        let identity = realm
            .resolve_for_update(principal)
            .map_err(backend_unavailable(principal))?;
        let handle = Self { identity, principal: principal.clone() };
        if require_exists && !handle.exists()? {
            return Err(Error::IdentityNotFound(principal.to_string()));
        }
        Ok(handle)
    }

    /// The principal this handle is bound to.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Probe whether the identity exists, wrapping backend failure with the
    /// bound principal.
    pub fn exists(&self) -> Result<bool> {
        self.identity.exists().map_err(backend_unavailable(&self.principal))
    }

    /// Create the identity. Backend errors propagate raw so the caller can
    /// wrap them with operation-specific context.
    pub fn create(&mut self) -> RealmResult<()> {
        self.identity.create()
    }

    /// Delete the identity. Backend errors propagate raw.
    pub fn delete(&mut self) -> RealmResult<()> {
        self.identity.delete()
    }

    /// Read the attribute/credential projection. Backend errors propagate
    /// raw.
    pub fn authorization_identity(&self) -> RealmResult<AuthorizationIdentity> {
        self.identity.authorization_identity()
    }

    /// Replace the attribute map. Backend errors propagate raw.
    pub fn set_attributes(&mut self, attributes: Attributes) -> RealmResult<()> {
        self.identity.set_attributes(attributes)
    }

    /// Replace the credential set. Backend errors propagate raw.
    pub fn set_credentials(&mut self, credentials: Vec<StoredCredential>) -> RealmResult<()> {
        self.identity.set_credentials(credentials)
    }

    /// Release the handle now instead of at end of scope. Purely a
    /// readability aid; `Drop` does the same thing.
    pub fn dispose(self) {}
}

impl<I: RealmIdentity> Drop for IdentityHandle<I> {
    fn drop(&mut self) {
        self.identity.dispose();
    }
}
