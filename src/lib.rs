//! # CloudShield (secure file vault)
//!
//! `cloudshield` serves the backend of a small file vault: operators register
//! an identity, log in with their handle and secret, pass a second-factor step
//! and then manage a private list of files.
//!
//! ## Authentication phases
//!
//! Every session walks the same sequence:
//!
//! - **Unauthenticated** until the handle and secret are verified.
//! - **Pending second factor** after a successful credential check.
//! - **Authenticated** once the second factor is confirmed.
//!
//! Logging out returns the session to `Unauthenticated`. There is no path that
//! skips the second-factor step.
//!
//! ## Storage
//!
//! Identities and file records live in memory for the lifetime of the process.
//! Secrets are kept only as Argon2 hashes. File payloads are not retained; each
//! upload is recorded by name, media type and size under a generated storage
//! identifier.
//!
//! ## Authorization
//!
//! File routes are scoped by the handle in the path and require an authenticated
//! session for that same handle. Requests for another identity's files return
//! `404 Not Found` so handles cannot be enumerated.

pub mod api;
pub mod cli;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
