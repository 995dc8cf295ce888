//! The administrative operations over a realm: identity lifecycle, attribute
//! editing, and credential replacement.
//!
//! Every operation resolves its own exclusive [`IdentityHandle`], works
//! through it, and lets the guard dispose it on the way out. No state is
//! kept across requests and nothing here retries; backend failures are
//! wrapped with context and reported upward.

use crate::{
    attributes::Attributes,
    credential::{PasswordEncoder, PasswordRequest},
    error::{Error, Result},
    realm::{backend_unavailable, IdentityHandle, ModifiableRealm, Principal},
};
use serde_derive::{Deserialize, Serialize};

/// The response shape of a realm-local identity read: the attribute map and
/// the *type tags* of the stored credentials. Never any secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct IdentityView {
    /// The principal name.
    name: String,
    /// The identity's attributes.
    attributes: Attributes,
    /// One tag per stored credential (`bcrypt`, `clear`, ...).
    credentials: Vec<String>,
}

/// The administrative front over one realm. Holds the realm and the
/// password-encoding collaborator; both are borrowed per-operation, never
/// shared across operations in any other way.
pub struct RealmAdmin<R, E> {
    realm: R,
    encoder: E,
}

impl<R: ModifiableRealm, E: PasswordEncoder> RealmAdmin<R, E> {
    /// Wire up an admin over a realm and an encoder.
    pub fn new(realm: R, encoder: E) -> Self {
        Self { realm, encoder }
    }

    /// The realm being administered.
    pub fn realm(&self) -> &R {
        &self.realm
    }

    /// Create a new identity. Fails with
    /// [`Error::IdentityAlreadyExists`] if the principal is taken, with no
    /// mutation performed.
    pub fn create_identity(&self, principal: &Principal) -> Result<()> {
        let mut handle = IdentityHandle::resolve(&self.realm, principal, false)?;
        if handle.exists()? {
            return Err(Error::IdentityAlreadyExists(principal.to_string()));
        }
        handle.create().map_err(|e| Error::CannotCreateIdentity {
            principal: principal.to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }

    /// Delete an existing identity. Fails with [`Error::IdentityNotFound`]
    /// if there is nothing to delete.
    pub fn delete_identity(&self, principal: &Principal) -> Result<()> {
        let mut handle = IdentityHandle::resolve(&self.realm, principal, true)?;
        handle.delete().map_err(|e| Error::CannotDeleteIdentity {
            principal: principal.to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }

    /// Read an identity's attributes and credential type tags straight from
    /// the realm.
    ///
    /// A stored credential whose kind falls outside the closed set fails the
    /// whole read with [`Error::UnsupportedCredentialType`]; a read must
    /// never silently omit a credential.
    pub fn read_identity(&self, principal: &Principal) -> Result<IdentityView> {
        let handle = IdentityHandle::resolve(&self.realm, principal, true)?;
        let identity = handle
            .authorization_identity()
            .map_err(backend_unavailable(principal))?;
        let (attributes, stored) = identity.into_parts();
        let mut credentials = Vec::with_capacity(stored.len());
        for credential in &stored {
            credentials.push(credential.kind().tag()?.to_string());
        }
        Ok(IdentityView { name: principal.to_string(), attributes, credentials })
    }

    /// Append one or more values to an attribute key, creating the key if
    /// needed. At least one value is required; order is preserved and
    /// duplicates are allowed.
    pub fn add_attribute(
        &self,
        principal: &Principal,
        key: &str,
        values: &[String],
    ) -> Result<()> {
        if values.is_empty() {
            return Err(Error::InvalidAttributeRequest(
                "at least one value must be given".to_string(),
            ));
        }
        self.edit_attributes(principal, |attributes| {
            for value in values {
                attributes.add_last(key, value.clone());
            }
        })
    }

    /// Remove values from an attribute key.
    ///
    /// With `Some(values)` (an explicit list, even an empty one) only
    /// matching occurrences are removed, leaving the rest in original
    /// relative order. With `None` the whole key is removed. Removing a
    /// missing key or value is a no-op.
    pub fn remove_attribute(
        &self,
        principal: &Principal,
        key: &str,
        values: Option<&[String]>,
    ) -> Result<()> {
        self.edit_attributes(principal, |attributes| match values {
            Some(values) => {
                for value in values {
                    attributes.remove_value(key, value);
                }
            }
            None => attributes.remove_key(key),
        })
    }

    /// The shared read-copy-edit-writeback cycle both attribute operations
    /// use. The stored map is copied into a fresh working map before any
    /// edit and written back whole in one call.
    fn edit_attributes(
        &self,
        principal: &Principal,
        edit: impl FnOnce(&mut Attributes),
    ) -> Result<()> {
        let mut handle = IdentityHandle::resolve(&self.realm, principal, true)?;
        let identity = handle
            .authorization_identity()
            .map_err(|e| Error::CannotModifyAttributes(e.to_string()))?;
        let mut attributes = identity.attributes().clone();
        edit(&mut attributes);
        handle
            .set_attributes(attributes)
            .map_err(|e| Error::CannotModifyAttributes(e.to_string()))?;
        Ok(())
    }

    /// Encode and store a password credential, *replacing* the identity's
    /// credential set (multi-credential identities are out of scope here).
    ///
    /// The request is validated down to a descriptor before any handle is
    /// resolved, so a contradictory request never touches the backend.
    pub fn set_password(&self, principal: &Principal, request: PasswordRequest) -> Result<()> {
        let descriptor = request.into_descriptor()?;
        let mut handle = IdentityHandle::resolve(&self.realm, principal, true)?;
        let credential = descriptor.assemble(principal, &self.encoder)?;
        handle
            .set_credentials(vec![credential])
            .map_err(backend_unavailable(principal))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        credential::{
            AlgorithmParams, BcryptSpec, ClearSpec, CredentialKind, DigestSpec, HashEncoder,
            StoredCredential,
        },
        mem::MemoryRealm,
    };

    fn admin() -> RealmAdmin<MemoryRealm, HashEncoder> {
        RealmAdmin::new(MemoryRealm::new(), HashEncoder)
    }

    fn clear_request(password: &str) -> PasswordRequest {
        PasswordRequest::clear(ClearSpec { password: password.into(), algorithm: None })
    }

    #[test]
    fn create_then_create_again_already_exists() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        let res = admin.create_identity(&jonie);
        assert_eq!(res.err(), Some(Error::IdentityAlreadyExists("jonie".to_string())));
        // both attempts resolved and disposed their own handle
        assert_eq!(admin.realm().resolve_calls(), 2);
        assert_eq!(admin.realm().dispose_calls(), 2);
    }

    #[test]
    fn create_delete_read_yields_not_found() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.delete_identity(&jonie).unwrap();
        let res = admin.read_identity(&jonie);
        assert_eq!(res.err(), Some(Error::IdentityNotFound("jonie".to_string())));
    }

    #[test]
    fn delete_missing_identity_not_found() {
        let admin = admin();
        let res = admin.delete_identity(&Principal::from("ghost"));
        assert_eq!(res.err(), Some(Error::IdentityNotFound("ghost".to_string())));
    }

    #[test]
    fn principal_names_are_case_sensitive() {
        let admin = admin();
        admin.create_identity(&Principal::from("Jonie")).unwrap();
        admin.create_identity(&Principal::from("jonie")).unwrap();
        admin.read_identity(&Principal::from("Jonie")).unwrap();
        admin.read_identity(&Principal::from("jonie")).unwrap();
    }

    #[test]
    fn read_projects_attributes_and_tags_only() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin
            .add_attribute(&jonie, "mail", &["jonie@example.com".to_string()])
            .unwrap();
        admin.set_password(&jonie, clear_request("secret")).unwrap();

        let view = admin.read_identity(&jonie).unwrap();
        assert_eq!(view.name(), "jonie");
        assert_eq!(view.attributes().get("mail").unwrap(), &["jonie@example.com"]);
        assert_eq!(view.credentials(), &["clear"]);
        // no material anywhere in the serialized view
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("material"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn read_fails_closed_on_unknown_credential_kind() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.realm().store_credentials(
            &jonie,
            vec![StoredCredential::new(
                CredentialKind::Other("otp".to_string()),
                "totp",
                AlgorithmParams::None,
                vec![1, 2, 3],
            )],
        );
        let res = admin.read_identity(&jonie);
        assert_eq!(res.err(), Some(Error::UnsupportedCredentialType("otp".to_string())));
    }

    #[test]
    fn attribute_order_preservation() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin
            .add_attribute(&jonie, "k", &["a".to_string(), "b".to_string(), "a".to_string()])
            .unwrap();
        admin
            .remove_attribute(&jonie, "k", Some(&["a".to_string()]))
            .unwrap();
        let view = admin.read_identity(&jonie).unwrap();
        assert_eq!(view.attributes().get("k").unwrap(), &["b"]);
    }

    #[test]
    fn absent_value_list_removes_the_whole_key() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.add_attribute(&jonie, "k", &["a".to_string()]).unwrap();
        admin.remove_attribute(&jonie, "k", None).unwrap();
        let view = admin.read_identity(&jonie).unwrap();
        assert!(!view.attributes().contains_key("k"));
    }

    #[test]
    fn explicit_empty_value_list_removes_nothing() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.add_attribute(&jonie, "k", &["a".to_string()]).unwrap();
        admin.remove_attribute(&jonie, "k", Some(&[])).unwrap();
        let view = admin.read_identity(&jonie).unwrap();
        assert_eq!(view.attributes().get("k").unwrap(), &["a"]);
    }

    #[test]
    fn add_attribute_requires_a_value() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        let before = admin.realm().resolve_calls();
        let res = admin.add_attribute(&jonie, "k", &[]);
        assert!(matches!(res, Err(Error::InvalidAttributeRequest(_))));
        // rejected before any backend contact
        assert_eq!(admin.realm().resolve_calls(), before);
    }

    #[test]
    fn attribute_ops_on_missing_identity_not_found() {
        let admin = admin();
        let ghost = Principal::from("ghost");
        let res = admin.add_attribute(&ghost, "k", &["a".to_string()]);
        assert_eq!(res.err(), Some(Error::IdentityNotFound("ghost".to_string())));
        let res = admin.remove_attribute(&ghost, "k", None);
        assert_eq!(res.err(), Some(Error::IdentityNotFound("ghost".to_string())));
    }

    #[test]
    fn contradictory_password_request_never_touches_the_realm() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        let before = admin.realm().resolve_calls();
        let request = PasswordRequest {
            bcrypt: Some(BcryptSpec {
                password: "secret".into(),
                salt: vec![1, 2],
                iteration_count: 10,
                algorithm: None,
            }),
            clear: Some(ClearSpec { password: "secret".into(), algorithm: None }),
            ..PasswordRequest::default()
        };
        let res = admin.set_password(&jonie, request);
        assert!(matches!(res, Err(Error::InvalidPasswordRequest(_))));
        assert_eq!(admin.realm().resolve_calls(), before);
    }

    #[test]
    fn set_password_replaces_rather_than_appends() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.set_password(&jonie, clear_request("one")).unwrap();
        admin
            .set_password(
                &jonie,
                PasswordRequest::digest(DigestSpec {
                    password: "two".into(),
                    realm: "R".into(),
                    algorithm: None,
                }),
            )
            .unwrap();
        let view = admin.read_identity(&jonie).unwrap();
        assert_eq!(view.credentials(), &["digest"]);
    }

    #[test]
    fn set_password_on_missing_identity_not_found() {
        let admin = admin();
        let res = admin.set_password(&Principal::from("ghost"), clear_request("secret"));
        assert_eq!(res.err(), Some(Error::IdentityNotFound("ghost".to_string())));
    }

    #[test]
    fn digest_credentials_differ_per_principal() {
        let admin = admin();
        let p1 = Principal::from("p1");
        let p2 = Principal::from("p2");
        admin.create_identity(&p1).unwrap();
        admin.create_identity(&p2).unwrap();
        let request = || {
            PasswordRequest::digest(DigestSpec {
                password: "p".into(),
                realm: "R".into(),
                algorithm: None,
            })
        };
        admin.set_password(&p1, request()).unwrap();
        admin.set_password(&p2, request()).unwrap();
        let one = admin.realm().stored_credentials(&p1).unwrap();
        let two = admin.realm().stored_credentials(&p2).unwrap();
        assert_ne!(one[0].material(), two[0].material());
    }

    #[test]
    fn every_operation_disposes_its_handle() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.create_identity(&jonie).unwrap();
        admin.add_attribute(&jonie, "k", &["a".to_string()]).unwrap();
        admin.set_password(&jonie, clear_request("secret")).unwrap();
        admin.read_identity(&jonie).unwrap();
        admin.remove_attribute(&jonie, "k", None).unwrap();
        admin.delete_identity(&jonie).unwrap();
        // failure paths dispose too
        let _ = admin.read_identity(&jonie);
        assert_eq!(admin.realm().resolve_calls(), admin.realm().dispose_calls());
    }

    #[test]
    fn backend_failure_during_create_wraps_cause() {
        let admin = admin();
        let jonie = Principal::from("jonie");
        admin.realm().fail_identity_op_after(1);
        let res = admin.create_identity(&jonie);
        assert!(matches!(res, Err(Error::CannotCreateIdentity { .. })));
        assert_eq!(admin.realm().resolve_calls(), admin.realm().dispose_calls());
    }
}
