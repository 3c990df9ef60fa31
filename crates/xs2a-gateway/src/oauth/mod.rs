//! OAuth 2.0 authorization-code flow against the bank.
//!
//! ## Flow
//! 1. [`discovery::discover`] reads the bank's well-known document once.
//! 2. [`consent::start_consent`] creates an AIS consent.
//! 3. [`token::build_authorization_link`] sends the user to the bank with a PKCE challenge.
//! 4. [`token::exchange_token`] trades the returned code for tokens.
//!
//! [`store::SessionStore`] ties steps 2 to 4 together across the redirect.

pub mod consent;
pub mod discovery;
pub mod pkce;
pub mod store;
pub mod token;
pub mod types;

pub use store::{AuthorizationState, Session, SessionPolicy, SessionStore};
pub use types::{Consent, Endpoints, Tokens};
