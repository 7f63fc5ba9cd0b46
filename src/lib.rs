//! # Konfirmi (portal core)
//!
//! `konfirmi` is the headless core of the Konfirmi customer and admin portals.
//! It talks to the Konfirmi REST backend and owns the client-side pieces the
//! portals share: session persistence, the authenticated API client, the
//! business verification submission flow, and the wallet top-up flow.
//!
//! ## Portals and sessions
//!
//! The customer and admin portals are independent: each scopes its own bearer
//! token (`customerToken` / `adminToken`) and its own login route. A token is
//! the only proof of authentication; any `401` from the backend clears it and
//! yields a login redirect that carries the caller's current path.
//!
//! ## Verification submission
//!
//! Business verification is submitted in four server-gated steps (business
//! info, compliance, contact person, review). Each step is persisted by the
//! backend before the next becomes reachable; the submission state machine in
//! [`verification::submission`] makes skipping a step unrepresentable. The
//! verification status itself is server-owned; clients only ever read it.
//!
//! ## Wallet top-up
//!
//! Top-ups run through a hosted payment page. The backend allocates a
//! reference and a payment URL, the user completes payment externally, and
//! the portal confirms the outcome by polling a public verify endpoint with a
//! bounded retry policy.

pub mod api;
pub mod auth;
pub mod cli;
pub mod session;
pub mod verification;
pub mod wallet;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
