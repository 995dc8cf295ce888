//! The authorization-context collaborator and the diagnostic operations
//! built on it: the authorized-identity read and the authentication probe.
//!
//! Unlike the realm operations, expected negatives here (unknown principal,
//! refused authorization, bad credentials) are *outcomes*, not errors. An
//! admin asking "why can't this user log in" wants the reason back, not a
//! fault. Only backend failure is an `Err`.

use crate::{
    attributes::Attributes,
    error::{Error, Result},
    realm::{backend_unavailable, Principal, RealmResult},
};
use serde_derive::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// The attribute/role-bearing projection of an identity after authorization.
#[derive(Debug, Clone, PartialEq, Eq, getset::Getters)]
#[getset(get = "pub")]
pub struct AuthorizedIdentity {
    /// The identity's attributes.
    attributes: Attributes,
    /// The role names the authorization layer mapped for the identity.
    roles: Vec<String>,
}

impl AuthorizedIdentity {
    /// Build a projection from its parts.
    pub fn new(attributes: Attributes, roles: Vec<String>) -> Self {
        Self { attributes, roles }
    }
}

/// A higher-level identity/authorization service that can open
/// authentication contexts. This is *not* the realm; it sits above one or
/// more realms and owns role mapping and authorization decisions.
pub trait SecurityDomain {
    /// The domain's context type.
    type Context: AuthenticationContext;

    /// Open a fresh authentication context.
    fn new_authentication_context(&self) -> RealmResult<Self::Context>;
}

/// One in-flight authentication attempt against a [`SecurityDomain`].
pub trait AuthenticationContext {
    /// Name the candidate principal.
    fn set_authentication_name(&mut self, principal: &Principal) -> RealmResult<()>;

    /// Whether the named principal exists.
    fn exists(&self) -> RealmResult<bool>;

    /// Verify a plaintext password guess as evidence. Returns whether the
    /// guess matched.
    fn verify_evidence(&mut self, guess: &str) -> RealmResult<bool>;

    /// Run authorization for the named principal. Returns whether it was
    /// granted.
    fn authorize(&mut self) -> RealmResult<bool>;

    /// Mark the attempt successful.
    fn succeed(&mut self);

    /// Mark the attempt failed.
    fn fail(&mut self);

    /// The authorized identity, if authorization was granted.
    fn authorized_identity(&self) -> Option<AuthorizedIdentity>;
}

/// The successful payload of an authorized-identity read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct AuthorizedView {
    /// The principal name.
    name: String,
    /// The identity's attributes.
    attributes: Attributes,
    /// Mapped role names.
    roles: Vec<String>,
}

/// What an authorized-identity read can come back with. Not-found and
/// not-authorized are deliberately distinct: they answer different admin
/// questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadOutcome {
    /// The principal exists, was authorized, and here is its projection.
    Identity(AuthorizedView),
    /// No such principal.
    NotFound { principal: String },
    /// The principal exists but authorization was refused.
    NotAuthorized { principal: String },
}

/// What an authentication probe can come back with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// The guess verified and authorization produced an identity.
    Authenticated { roles: Vec<String> },
    /// No such principal.
    NotFound,
    /// The guess did not verify.
    BadCredentials,
    /// The guess verified but no authorized identity could be obtained
    /// (authorization was refused downstream).
    NoAuthorizedIdentity,
}

/// Diagnostic operations over a [`SecurityDomain`].
pub struct DomainAdmin<D> {
    domain: D,
}

impl<D: SecurityDomain> DomainAdmin<D> {
    /// Wire up an admin over a domain.
    pub fn new(domain: D) -> Self {
        Self { domain }
    }

    /// The domain being administered.
    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Read an identity's attributes and roles as the *authorization* layer
    /// sees them, which can differ from the raw realm view (role mapping,
    /// attribute rewriting).
    pub fn read_authorized_identity(&self, principal: &Principal) -> Result<ReadOutcome> {
        let wrap = backend_unavailable(principal);
        let mut context = self.domain.new_authentication_context().map_err(&wrap)?;
        context.set_authentication_name(principal).map_err(&wrap)?;

        if !context.exists().map_err(&wrap)? {
            return Ok(ReadOutcome::NotFound { principal: principal.to_string() });
        }
        if !context.authorize().map_err(&wrap)? {
            return Ok(ReadOutcome::NotAuthorized { principal: principal.to_string() });
        }
        let identity = context
            .authorized_identity()
            .ok_or_else(|| Error::IdentityNotAuthorized(principal.to_string()))?;
        Ok(ReadOutcome::Identity(AuthorizedView {
            name: principal.to_string(),
            attributes: identity.attributes().clone(),
            roles: identity.roles().clone(),
        }))
    }

    /// Verify a password guess and report what happened. Interactive
    /// diagnosis only; this is not an authentication entry point.
    pub fn probe_authenticate(&self, principal: &Principal, guess: &str) -> Result<ProbeOutcome> {
        // hold the guess in zeroing storage for the duration of the probe
        let guess = Zeroizing::new(guess.to_string());
        let wrap = backend_unavailable(principal);
        let mut context = self.domain.new_authentication_context().map_err(&wrap)?;
        context.set_authentication_name(principal).map_err(&wrap)?;

        if !context.exists().map_err(&wrap)? {
            return Ok(ProbeOutcome::NotFound);
        }
        if context.verify_evidence(&guess).map_err(&wrap)? {
            // the authorization *decision* surfaces through
            // authorized_identity(), same as the original flow
            context.authorize().map_err(&wrap)?;
            context.succeed();
            match context.authorized_identity() {
                Some(identity) => Ok(ProbeOutcome::Authenticated { roles: identity.roles().clone() }),
                None => Ok(ProbeOutcome::NoAuthorizedIdentity),
            }
        } else {
            context.fail();
            Ok(ProbeOutcome::BadCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        admin::RealmAdmin,
        credential::{ClearSpec, HashEncoder, PasswordRequest, SaltedSimpleDigestSpec},
        mem::{MemoryDomain, MemoryRealm},
    };

    fn setup() -> (RealmAdmin<MemoryRealm, HashEncoder>, DomainAdmin<MemoryDomain<HashEncoder>>) {
        let realm = MemoryRealm::new();
        let domain = MemoryDomain::new(&realm, HashEncoder);
        (RealmAdmin::new(realm, HashEncoder), DomainAdmin::new(domain))
    }

    fn clear_request(password: &str) -> PasswordRequest {
        PasswordRequest::clear(ClearSpec { password: password.into(), algorithm: None })
    }

    #[test]
    fn credential_round_trip_through_the_probe() {
        let (admin, domain) = setup();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.set_password(&jonie, clear_request("secret")).unwrap();

        let outcome = domain.probe_authenticate(&jonie, "secret").unwrap();
        assert_eq!(outcome, ProbeOutcome::Authenticated { roles: vec![] });
        let outcome = domain.probe_authenticate(&jonie, "wrong").unwrap();
        assert_eq!(outcome, ProbeOutcome::BadCredentials);
    }

    #[test]
    fn salted_credentials_verify_too() {
        use rand::{rngs::OsRng, RngCore};
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);

        let (admin, domain) = setup();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin
            .set_password(
                &jonie,
                PasswordRequest::salted_simple_digest(SaltedSimpleDigestSpec {
                    password: "secret".into(),
                    salt: salt.to_vec(),
                    algorithm: None,
                }),
            )
            .unwrap();
        let outcome = domain.probe_authenticate(&jonie, "secret").unwrap();
        assert!(matches!(outcome, ProbeOutcome::Authenticated { .. }));
    }

    #[test]
    fn probe_unknown_principal_not_found() {
        let (_, domain) = setup();
        let outcome = domain.probe_authenticate(&Principal::from("ghost"), "x").unwrap();
        assert_eq!(outcome, ProbeOutcome::NotFound);
    }

    #[test]
    fn probe_denied_principal_authenticates_but_yields_no_identity() {
        let (admin, domain) = setup();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.set_password(&jonie, clear_request("secret")).unwrap();
        domain.domain().deny(&jonie);

        let outcome = domain.probe_authenticate(&jonie, "secret").unwrap();
        assert_eq!(outcome, ProbeOutcome::NoAuthorizedIdentity);
    }

    #[test]
    fn authorized_read_reports_attributes_and_roles() {
        let (admin, domain) = setup();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin
            .add_attribute(&jonie, "roles", &["admin".to_string(), "operator".to_string()])
            .unwrap();
        admin
            .add_attribute(&jonie, "mail", &["jonie@example.com".to_string()])
            .unwrap();

        let outcome = domain.read_authorized_identity(&jonie).unwrap();
        match outcome {
            ReadOutcome::Identity(view) => {
                assert_eq!(view.name(), "jonie");
                assert_eq!(view.roles(), &["admin", "operator"]);
                assert_eq!(view.attributes().get("mail").unwrap(), &["jonie@example.com"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn authorized_read_distinguishes_not_found_from_not_authorized() {
        let (admin, domain) = setup();
        let jonie = Principal::from("jonie");

        let outcome = domain.read_authorized_identity(&jonie).unwrap();
        assert_eq!(outcome, ReadOutcome::NotFound { principal: "jonie".to_string() });

        admin.create_identity(&jonie).unwrap();
        domain.domain().deny(&jonie);
        let outcome = domain.read_authorized_identity(&jonie).unwrap();
        assert_eq!(outcome, ReadOutcome::NotAuthorized { principal: "jonie".to_string() });
    }

    #[test]
    fn backend_failure_surfaces_as_error_not_outcome() {
        let (_, domain) = setup();
        domain.domain().fail_next_context();
        let res = domain.probe_authenticate(&Principal::from("jonie"), "x");
        assert!(matches!(res, Err(Error::BackendUnavailable { .. })));
    }
}
