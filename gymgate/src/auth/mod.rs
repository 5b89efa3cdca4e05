//! Authentication and session-token lifecycle.
//!
//! This module is the security core of the service:
//!
//! - [`password`]: Argon2 password hashing and verification
//! - [`token`]: signed session-token encoding and claim checks
//! - [`throttle`]: failed-login counting and temporary lockouts
//! - [`revocation`]: in-process revocation ledger with background sweeping
//! - [`registry`]: token issuing, persistence and the single-active-session
//!   policy (issuing a new token revokes every prior token of the account)
//! - [`middleware`]: the request gate that turns a bearer header into an
//!   [`crate::api::models::users::AuthenticatedUser`] on the request
//! - [`current_user`]: extractor and role checks for protected handlers
//!
//! # Token lifecycle
//!
//! A successful login issues a signed token and persists an unrevoked record
//! for it. Any later login for the same account first revokes all of the
//! account's valid records, inside a per-account critical section, so at most
//! one token per account is ever usable. Logout revokes every record of the
//! account and additionally puts the presented token string into the
//! revocation ledger for a cheap hot-path rejection until it expires.
//!
//! Validation failures never abort the request pipeline: the gate converts
//! every parse/signature/expiry/revocation problem into "request proceeds
//! unauthenticated" and lets route-level checks produce the final 401/403.

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod registry;
pub mod revocation;
pub mod throttle;
pub mod token;
