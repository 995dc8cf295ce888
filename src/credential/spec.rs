//! Credential descriptors: the tagged request shape that arrives over the
//! administrative surface, the closed algorithm sets each credential family
//! accepts, and the assembly step that turns a validated descriptor into
//! storable credential material.

use crate::{
    credential::{
        encode::{AlgorithmParams, PasswordEncoder},
        CredentialKind, StoredCredential,
    },
    error::{Error, Result},
    realm::Principal,
};
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The only algorithm name the bcrypt credential family accepts.
pub const ALGORITHM_BCRYPT: &str = "bcrypt";
/// The only algorithm name the clear credential family accepts.
pub const ALGORITHM_CLEAR: &str = "clear";

/// A plaintext password as it travels through a request. Zeroed on drop and
/// redacted from debug output so it never ends up in a log line by accident.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Borrow the plaintext. Only the encoder dispatch should need this.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the password has zero characters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self(password.to_string())
    }
}

impl From<String> for Password {
    fn from(password: String) -> Self {
        Self(password)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

macro_rules! algorithm_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $string:literal),+ $(,)? }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $(
                #[doc = $string]
                $variant,
            )+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// The wire name of this algorithm.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $string,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($string => Ok(Self::$variant),)+
                    _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
                }
            }
        }
    }
}

algorithm_enum! {
    /// The six digest algorithms a simple (unsalted) digest may use.
    SimpleDigestAlgorithm {
        Md2 => "simple-digest-md2",
        Md5 => "simple-digest-md5",
        Sha1 => "simple-digest-sha-1",
        Sha256 => "simple-digest-sha-256",
        Sha384 => "simple-digest-sha-384",
        Sha512 => "simple-digest-sha-512",
    }
    default Sha512
}

algorithm_enum! {
    /// The ten salted digest algorithms, five with the password hashed before
    /// the salt and five with the salt hashed first.
    SaltedSimpleDigestAlgorithm {
        PasswordSaltMd5 => "password-salt-digest-md5",
        PasswordSaltSha1 => "password-salt-digest-sha-1",
        PasswordSaltSha256 => "password-salt-digest-sha-256",
        PasswordSaltSha384 => "password-salt-digest-sha-384",
        PasswordSaltSha512 => "password-salt-digest-sha-512",
        SaltPasswordMd5 => "salt-password-digest-md5",
        SaltPasswordSha1 => "salt-password-digest-sha-1",
        SaltPasswordSha256 => "salt-password-digest-sha-256",
        SaltPasswordSha384 => "salt-password-digest-sha-384",
        SaltPasswordSha512 => "salt-password-digest-sha-512",
    }
    default PasswordSaltSha512
}

algorithm_enum! {
    /// The four HTTP digest algorithms.
    DigestAlgorithm {
        Md5 => "digest-md5",
        Sha => "digest-sha",
        Sha256 => "digest-sha-256",
        Sha512 => "digest-sha-512",
    }
    default Sha512
}

/// Whether an algorithm name falls inside any of the closed sets the
/// credential families accept.
pub(crate) fn known_algorithm(name: &str) -> bool {
    name == ALGORITHM_BCRYPT
        || name == ALGORITHM_CLEAR
        || SimpleDigestAlgorithm::from_str(name).is_ok()
        || SaltedSimpleDigestAlgorithm::from_str(name).is_ok()
        || DigestAlgorithm::from_str(name).is_ok()
}

/// The bcrypt section of a password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcryptSpec {
    pub password: Password,
    #[serde(with = "crate::ser::base64_bytes")]
    pub salt: Vec<u8>,
    pub iteration_count: u32,
    /// Optional; the only accepted value is `bcrypt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// The clear-text section of a password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSpec {
    pub password: Password,
    /// Optional; the only accepted value is `clear`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// The simple-digest section of a password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleDigestSpec {
    pub password: Password,
    /// Defaults to `simple-digest-sha-512`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// The salted-simple-digest section of a password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaltedSimpleDigestSpec {
    pub password: Password,
    #[serde(with = "crate::ser::base64_bytes")]
    pub salt: Vec<u8>,
    /// Defaults to `password-salt-digest-sha-512`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// The HTTP-digest section of a password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSpec {
    pub password: Password,
    /// The realm name folded into the digest. Not necessarily the realm the
    /// identity lives in; HTTP digest realms are their own namespace.
    pub realm: String,
    /// Defaults to `digest-sha-512`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// A set-password request exactly as it arrives over the wire: five optional
/// sections, of which exactly one must be present. Validation happens in
/// [`into_descriptor`][PasswordRequest::into_descriptor] and rejects a
/// malformed request before any realm contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcrypt: Option<BcryptSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear: Option<ClearSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_digest: Option<SimpleDigestSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salted_simple_digest: Option<SaltedSimpleDigestSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,
}

impl PasswordRequest {
    /// A request carrying only a bcrypt section.
    pub fn bcrypt(spec: BcryptSpec) -> Self {
        Self { bcrypt: Some(spec), ..Self::default() }
    }

    /// A request carrying only a clear section.
    pub fn clear(spec: ClearSpec) -> Self {
        Self { clear: Some(spec), ..Self::default() }
    }

    /// A request carrying only a simple-digest section.
    pub fn simple_digest(spec: SimpleDigestSpec) -> Self {
        Self { simple_digest: Some(spec), ..Self::default() }
    }

    /// A request carrying only a salted-simple-digest section.
    pub fn salted_simple_digest(spec: SaltedSimpleDigestSpec) -> Self {
        Self { salted_simple_digest: Some(spec), ..Self::default() }
    }

    /// A request carrying only an HTTP-digest section.
    pub fn digest(spec: DigestSpec) -> Self {
        Self { digest: Some(spec), ..Self::default() }
    }

    /// Validate this request down to a descriptor. Exactly one section must
    /// be present; algorithm names must fall inside their family's closed
    /// set; passwords that the family requires to be non-empty must have at
    /// least one character.
    pub fn into_descriptor(self) -> Result<CredentialDescriptor> {
        let Self { bcrypt, clear, simple_digest, salted_simple_digest, digest } = self;
        let present = [
            bcrypt.is_some(),
            clear.is_some(),
            simple_digest.is_some(),
            salted_simple_digest.is_some(),
            digest.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        if present != 1 {
            Err(Error::InvalidPasswordRequest(format!(
                "exactly one credential type must be given, got {}",
                present
            )))?;
        }

        if let Some(spec) = bcrypt {
            require_password(&spec.password)?;
            fixed_algorithm(spec.algorithm.as_deref(), ALGORITHM_BCRYPT)?;
            Ok(CredentialDescriptor::Bcrypt {
                password: spec.password,
                salt: spec.salt,
                iteration_count: spec.iteration_count,
            })
        } else if let Some(spec) = clear {
            require_password(&spec.password)?;
            fixed_algorithm(spec.algorithm.as_deref(), ALGORITHM_CLEAR)?;
            Ok(CredentialDescriptor::Clear { password: spec.password })
        } else if let Some(spec) = simple_digest {
            require_password(&spec.password)?;
            let algorithm = parse_or_default::<SimpleDigestAlgorithm>(spec.algorithm.as_deref())?;
            Ok(CredentialDescriptor::SimpleDigest { password: spec.password, algorithm })
        } else if let Some(spec) = salted_simple_digest {
            let algorithm =
                parse_or_default::<SaltedSimpleDigestAlgorithm>(spec.algorithm.as_deref())?;
            Ok(CredentialDescriptor::SaltedSimpleDigest {
                password: spec.password,
                salt: spec.salt,
                algorithm,
            })
        } else if let Some(spec) = digest {
            let algorithm = parse_or_default::<DigestAlgorithm>(spec.algorithm.as_deref())?;
            Ok(CredentialDescriptor::Digest {
                password: spec.password,
                realm: spec.realm,
                algorithm,
            })
        } else {
            // present == 1 means one of the branches above matched, but a
            // request shape nothing recognized still has to be an error, not
            // an assumption
            Err(Error::InvalidPasswordRequest("unrecognized credential type".to_string()))
        }
    }
}

fn require_password(password: &Password) -> Result<()> {
    if password.is_empty() {
        Err(Error::InvalidPasswordRequest("password must have at least one character".to_string()))?;
    }
    Ok(())
}

fn fixed_algorithm(given: Option<&str>, only: &str) -> Result<()> {
    match given {
        None => Ok(()),
        Some(name) if name == only => Ok(()),
        Some(name) => Err(Error::UnsupportedAlgorithm(name.to_string())),
    }
}

fn parse_or_default<A: FromStr<Err = Error> + Default>(given: Option<&str>) -> Result<A> {
    match given {
        Some(name) => A::from_str(name),
        None => Ok(A::default()),
    }
}

/// A fully validated credential request: exactly one family, algorithm
/// resolved (defaults applied), all required fields present. Closed by
/// construction; adding a sixth family here forces every `match` over it to
/// be revisited.
#[derive(Debug, Clone)]
pub enum CredentialDescriptor {
    Bcrypt {
        password: Password,
        salt: Vec<u8>,
        iteration_count: u32,
    },
    Clear {
        password: Password,
    },
    SimpleDigest {
        password: Password,
        algorithm: SimpleDigestAlgorithm,
    },
    SaltedSimpleDigest {
        password: Password,
        salt: Vec<u8>,
        algorithm: SaltedSimpleDigestAlgorithm,
    },
    Digest {
        password: Password,
        realm: String,
        algorithm: DigestAlgorithm,
    },
}

impl CredentialDescriptor {
    /// The kind tag this descriptor stores under.
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Bcrypt { .. } => CredentialKind::Bcrypt,
            Self::Clear { .. } => CredentialKind::Clear,
            Self::SimpleDigest { .. } => CredentialKind::SimpleDigest,
            Self::SaltedSimpleDigest { .. } => CredentialKind::SaltedSimpleDigest,
            Self::Digest { .. } => CredentialKind::Digest,
        }
    }

    /// The resolved algorithm name for this descriptor.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Bcrypt { .. } => ALGORITHM_BCRYPT,
            Self::Clear { .. } => ALGORITHM_CLEAR,
            Self::SimpleDigest { algorithm, .. } => algorithm.name(),
            Self::SaltedSimpleDigest { algorithm, .. } => algorithm.name(),
            Self::Digest { algorithm, .. } => algorithm.name(),
        }
    }

    /// Build the algorithm parameter object and run the encoder, producing a
    /// storable credential.
    ///
    /// `principal` is the identity currently being mutated: the digest family
    /// binds it into the derivation, which is why a descriptor must never be
    /// assembled speculatively or reused across identities.
    pub fn assemble(
        &self,
        principal: &Principal,
        encoder: &impl PasswordEncoder,
    ) -> Result<StoredCredential> {
        let (password, params) = match self {
            Self::Bcrypt { password, salt, iteration_count } => (
                password,
                AlgorithmParams::IteratedSalted {
                    salt: salt.clone(),
                    iteration_count: *iteration_count,
                },
            ),
            Self::Clear { password } => (password, AlgorithmParams::None),
            Self::SimpleDigest { password, .. } => (password, AlgorithmParams::None),
            Self::SaltedSimpleDigest { password, salt, .. } => {
                (password, AlgorithmParams::Salted { salt: salt.clone() })
            }
            Self::Digest { password, realm, .. } => (
                password,
                AlgorithmParams::Digest {
                    username: principal.to_string(),
                    realm: realm.clone(),
                },
            ),
        };
        let algorithm = self.algorithm();
        let material = encoder
            .encode(algorithm, password.as_str(), &params)
            .map_err(|e| Error::CredentialEncoding(e.to_string()))?;
        Ok(StoredCredential::new(self.kind(), algorithm, params, material))
    }
}
