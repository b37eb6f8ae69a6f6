//! # fleet-credentials
//!
//! Runner registration tokens: the [`CredentialSource`] seam, the `ureq`
//! [`GithubClient`], and the fail-fast [`refresh_all`] pass run before every
//! manifest render.

pub mod client;
pub mod error;
pub mod refresh;

pub use client::{Credential, CredentialSource, GithubClient, DEFAULT_API_URL};
pub use error::CredentialError;
pub use refresh::refresh_all;
