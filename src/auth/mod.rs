//! Authentication for the course platform.
//!
//! Tokens are issued by Supabase auth; this module verifies them locally,
//! proxies sign-up/sign-in/sign-out to the auth REST API and exposes the
//! caller's profile.

pub mod extractor;
pub mod handlers;
mod service;

pub use extractor::AuthenticatedUser;
pub use service::{AuthService, AuthUser, Claims, Session, SignUpOutcome};
