//! An in-memory realm and security domain.
//!
//! This is the reference backend: it backs the crate's own tests and gives
//! integrators something to administer before a real directory-backed realm
//! is wired in. It also exposes the instrumentation (resolve/dispose
//! counters, failure injection) the handle-lifecycle guarantees are tested
//! against.

use crate::{
    attributes::Attributes,
    credential::{PasswordEncoder, StoredCredential},
    domain::{AuthenticationContext, AuthorizedIdentity, SecurityDomain},
    realm::{AuthorizationIdentity, ModifiableRealm, Principal, RealmError, RealmIdentity, RealmResult},
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use subtle::ConstantTimeEq;

/// The attribute key the in-memory domain maps role names from.
pub const ROLES_ATTRIBUTE: &str = "roles";

#[derive(Debug, Clone, Default)]
struct IdentityRecord {
    attributes: Attributes,
    credentials: Vec<StoredCredential>,
}

#[derive(Debug, Default)]
struct RealmState {
    identities: BTreeMap<String, IdentityRecord>,
    resolve_calls: u64,
    dispose_calls: u64,
    failing_resolves: u32,
    identity_ops_until_failure: Option<u32>,
}

impl RealmState {
    fn check_identity_failure(&mut self) -> RealmResult<()> {
        if let Some(remaining) = self.identity_ops_until_failure {
            if remaining == 0 {
                self.identity_ops_until_failure = None;
                return Err(RealmError::new("injected identity operation failure"));
            }
            self.identity_ops_until_failure = Some(remaining - 1);
        }
        Ok(())
    }
}

fn lock(state: &Mutex<RealmState>) -> RealmResult<MutexGuard<'_, RealmState>> {
    state.lock().map_err(|_| RealmError::new("realm state poisoned"))
}

/// A mutable identity store living entirely in memory, shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryRealm {
    state: Arc<Mutex<RealmState>>,
}

impl MemoryRealm {
    /// Create an empty realm.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many handles have been resolved so far.
    pub fn resolve_calls(&self) -> u64 {
        lock(&self.state).map(|state| state.resolve_calls).unwrap_or(0)
    }

    /// How many handles have been disposed so far. Equal to
    /// [`resolve_calls`][MemoryRealm::resolve_calls] whenever no operation is
    /// in flight; the gap between the two is exactly the leaked handles.
    pub fn dispose_calls(&self) -> u64 {
        lock(&self.state).map(|state| state.dispose_calls).unwrap_or(0)
    }

    /// Make the next `resolve_for_update` fail with a backend error.
    pub fn fail_next_resolve(&self) {
        if let Ok(mut state) = lock(&self.state) {
            state.failing_resolves += 1;
        }
    }

    /// Make the next identity operation (existence probe, create, read,
    /// write) fail with a backend error.
    pub fn fail_next_identity_op(&self) {
        self.fail_identity_op_after(0);
    }

    /// Let `successes` identity operations succeed, then fail the one after.
    pub fn fail_identity_op_after(&self, successes: u32) {
        if let Ok(mut state) = lock(&self.state) {
            state.identity_ops_until_failure = Some(successes);
        }
    }

    /// Seed an identity's credential set directly, bypassing the admin
    /// layer. Lets a test (or a migration) plant credentials the assembler
    /// would never produce, such as unknown kinds.
    pub fn store_credentials(&self, principal: &Principal, credentials: Vec<StoredCredential>) {
        if let Ok(mut state) = lock(&self.state) {
            state
                .identities
                .entry(principal.to_string())
                .or_default()
                .credentials = credentials;
        }
    }

    /// Peek at an identity's stored credential set.
    pub fn stored_credentials(&self, principal: &Principal) -> Option<Vec<StoredCredential>> {
        lock(&self.state)
            .ok()?
            .identities
            .get(principal.as_str())
            .map(|record| record.credentials.clone())
    }
}

impl ModifiableRealm for MemoryRealm {
    type Identity = MemoryIdentity;

    fn resolve_for_update(&self, principal: &Principal) -> RealmResult<MemoryIdentity> {
        let mut state = lock(&self.state)?;
        if state.failing_resolves > 0 {
            state.failing_resolves -= 1;
            return Err(RealmError::new("injected resolve failure"));
        }
        state.resolve_calls += 1;
        Ok(MemoryIdentity {
            state: Arc::clone(&self.state),
            principal: principal.clone(),
            disposed: false,
        })
    }
}

/// A handle over one identity in a [`MemoryRealm`].
#[derive(Debug)]
pub struct MemoryIdentity {
    state: Arc<Mutex<RealmState>>,
    principal: Principal,
    disposed: bool,
}

impl MemoryIdentity {
    fn state(&self) -> RealmResult<MutexGuard<'_, RealmState>> {
        if self.disposed {
            return Err(RealmError::new("identity handle already disposed"));
        }
        let mut state = lock(&self.state)?;
        state.check_identity_failure()?;
        Ok(state)
    }
}

impl RealmIdentity for MemoryIdentity {
    fn exists(&self) -> RealmResult<bool> {
        Ok(self.state()?.identities.contains_key(self.principal.as_str()))
    }

    fn create(&mut self) -> RealmResult<()> {
        let mut state = self.state()?;
        if state.identities.contains_key(self.principal.as_str()) {
            return Err(RealmError::new(format!("identity {} already present in store", self.principal)));
        }
        state.identities.insert(self.principal.to_string(), IdentityRecord::default());
        Ok(())
    }

    fn delete(&mut self) -> RealmResult<()> {
        let mut state = self.state()?;
        state
            .identities
            .remove(self.principal.as_str())
            .map(|_| ())
            .ok_or_else(|| RealmError::new(format!("identity {} not present in store", self.principal)))
    }

    fn authorization_identity(&self) -> RealmResult<AuthorizationIdentity> {
        let state = self.state()?;
        let record = state
            .identities
            .get(self.principal.as_str())
            .ok_or_else(|| RealmError::new(format!("identity {} not present in store", self.principal)))?;
        Ok(AuthorizationIdentity::new(record.attributes.clone(), record.credentials.clone()))
    }

    fn set_attributes(&mut self, attributes: Attributes) -> RealmResult<()> {
        let mut state = self.state()?;
        let record = state
            .identities
            .get_mut(self.principal.as_str())
            .ok_or_else(|| RealmError::new(format!("identity {} not present in store", self.principal)))?;
        record.attributes = attributes;
        Ok(())
    }

    fn set_credentials(&mut self, credentials: Vec<StoredCredential>) -> RealmResult<()> {
        let mut state = self.state()?;
        let record = state
            .identities
            .get_mut(self.principal.as_str())
            .ok_or_else(|| RealmError::new(format!("identity {} not present in store", self.principal)))?;
        record.credentials = credentials;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Ok(mut state) = lock(&self.state) {
            state.dispose_calls += 1;
        }
    }
}

/// A security domain over the same store a [`MemoryRealm`] administers.
///
/// Evidence verification re-encodes the guess under the stored credential's
/// algorithm and parameters and compares the material in constant time.
/// Roles are mapped from the [`ROLES_ATTRIBUTE`] attribute key.
#[derive(Debug, Clone)]
pub struct MemoryDomain<E> {
    state: Arc<Mutex<RealmState>>,
    denied: Arc<Mutex<BTreeSet<String>>>,
    failing_contexts: Arc<Mutex<u32>>,
    encoder: E,
}

impl<E> MemoryDomain<E> {
    /// Build a domain over the given realm's store.
    pub fn new(realm: &MemoryRealm, encoder: E) -> Self {
        Self {
            state: Arc::clone(&realm.state),
            denied: Arc::new(Mutex::new(BTreeSet::new())),
            failing_contexts: Arc::new(Mutex::new(0)),
            encoder,
        }
    }

    /// Refuse authorization for a principal from now on.
    pub fn deny(&self, principal: &Principal) {
        if let Ok(mut denied) = self.denied.lock() {
            denied.insert(principal.to_string());
        }
    }

    /// Make the next context creation fail with a backend error.
    pub fn fail_next_context(&self) {
        if let Ok(mut failing) = self.failing_contexts.lock() {
            *failing += 1;
        }
    }
}

impl<E: PasswordEncoder + Clone> SecurityDomain for MemoryDomain<E> {
    type Context = MemoryContext<E>;

    fn new_authentication_context(&self) -> RealmResult<MemoryContext<E>> {
        let mut failing = self
            .failing_contexts
            .lock()
            .map_err(|_| RealmError::new("domain state poisoned"))?;
        if *failing > 0 {
            *failing -= 1;
            return Err(RealmError::new("injected context failure"));
        }
        Ok(MemoryContext {
            state: Arc::clone(&self.state),
            denied: Arc::clone(&self.denied),
            encoder: self.encoder.clone(),
            name: None,
            authorized: false,
            concluded: None,
        })
    }
}

/// One authentication attempt against a [`MemoryDomain`].
#[derive(Debug)]
pub struct MemoryContext<E> {
    state: Arc<Mutex<RealmState>>,
    denied: Arc<Mutex<BTreeSet<String>>>,
    encoder: E,
    name: Option<Principal>,
    authorized: bool,
    concluded: Option<bool>,
}

impl<E> MemoryContext<E> {
    fn name(&self) -> RealmResult<&Principal> {
        self.name
            .as_ref()
            .ok_or_else(|| RealmError::new("authentication name not set"))
    }
}

impl<E: PasswordEncoder> AuthenticationContext for MemoryContext<E> {
    fn set_authentication_name(&mut self, principal: &Principal) -> RealmResult<()> {
        self.name = Some(principal.clone());
        Ok(())
    }

    fn exists(&self) -> RealmResult<bool> {
        let name = self.name()?;
        Ok(lock(&self.state)?.identities.contains_key(name.as_str()))
    }

    fn verify_evidence(&mut self, guess: &str) -> RealmResult<bool> {
        let name = self.name()?.clone();
        let credentials = {
            let state = lock(&self.state)?;
            match state.identities.get(name.as_str()) {
                Some(record) => record.credentials.clone(),
                None => return Ok(false),
            }
        };
        for credential in &credentials {
            let encoded = self
                .encoder
                .encode(credential.algorithm(), guess, credential.params())
                .map_err(|e| RealmError::new(e.to_string()))?;
            if bool::from(encoded.ct_eq(credential.material())) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn authorize(&mut self) -> RealmResult<bool> {
        let name = self.name()?.clone();
        let exists = lock(&self.state)?.identities.contains_key(name.as_str());
        let denied = self
            .denied
            .lock()
            .map_err(|_| RealmError::new("domain state poisoned"))?
            .contains(name.as_str());
        self.authorized = exists && !denied;
        Ok(self.authorized)
    }

    fn succeed(&mut self) {
        self.concluded = Some(true);
    }

    fn fail(&mut self) {
        self.concluded = Some(false);
    }

    fn authorized_identity(&self) -> Option<AuthorizedIdentity> {
        if !self.authorized || self.concluded == Some(false) {
            return None;
        }
        let name = self.name.as_ref()?;
        let state = lock(&self.state).ok()?;
        let record = state.identities.get(name.as_str())?;
        let roles = record
            .attributes
            .get(ROLES_ATTRIBUTE)
            .map(|values| values.to_vec())
            .unwrap_or_default();
        Some(AuthorizedIdentity::new(record.attributes.clone(), roles))
    }
}
