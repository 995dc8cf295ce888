//! Welcome to realm-admin, an administration layer for mutable identity
//! stores ("realms").
//!
//! A realm holds identities keyed by principal name; this crate is the
//! management surface over one: create and delete identities, inspect and
//! edit their attribute multimaps, and install password credentials encoded
//! under one of several hashing schemes. The realm itself is pluggable (a
//! file store, a directory server, a database) and is reached exclusively
//! through the collaborator traits in [realm]; this crate contains no
//! persistence and no transport.
//!
//! The parts that earn their keep:
//!
//! 1. Every operation resolves exactly one exclusive identity handle, and
//! that handle is *guaranteed* released on every exit path — success,
//! validation failure, backend error — by construction rather than by
//! discipline. A leaked handle can pin backend locks or connections, so this
//! is the property everything else is arranged around.
//! 1. Credential requests arrive as a tagged, partially-optional parameter
//! set; the [credential] module validates them down to a closed descriptor
//! enum and deterministically assembles the parameters for the
//! password-encoding collaborator. Adding a sixth credential family is a
//! compile error at every dispatch site until it is handled.
//! 1. Failures are structured values (kind plus fields), never formatted
//! strings or log side effects; the boundary layer that called us decides
//! how to present them.
//!
//! The [domain] module carries the diagnostic side: reading an identity as
//! the authorization layer sees it, and probing a password guess with the
//! reason for failure reported back instead of raised.
//!
//! The [mem] module ships an in-memory realm and domain so all of the above
//! can be exercised without a live backend.

pub mod error;
pub(crate) mod ser;
pub mod attributes;
pub mod credential;
pub mod realm;
pub mod admin;
pub mod domain;
pub mod mem;
