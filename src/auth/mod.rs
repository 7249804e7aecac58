//! Session resolution and ownership policy.
//!
//! Every authenticated request carries an opaque bearer credential in the
//! `token` cookie. The credential is issued once at signup, stored only as a
//! one-way hash, and resolved here into a [`Principal`]. Ownership of groups
//! and people is then checked against the principal's account.

mod credential;
mod extract;
mod principal;
mod resolver;

pub use credential::{Credential, CredentialHash, SESSION_COOKIE};
pub use extract::AuthUser;
pub use principal::Principal;
pub use resolver::{authorize_ownership, CredentialDirectory, SessionResolver, SessionUser};
