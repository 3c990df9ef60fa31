//! XS2A Gateway
//!
//! An OAuth 2.0 authorization-code client and proxy for PSD2 "Access to
//! Account" (XS2A) account information services.
//!
//! # Features
//!
//! - **Consent flow**: creates an AIS consent for the configured account
//! - **PKCE**: S256 code challenge on the bank authorization link
//! - **Session store**: correlates the bank redirect with the original request
//! - **Mutual TLS**: every bank call presents the TPP client certificate
//! - **Passthrough**: account, balance and transaction bodies are returned verbatim
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use xs2a_gateway::{AisGateway, BankClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = BankClient::new(&config)?;
//!     let gateway = AisGateway::connect(config, Arc::new(client)).await?;
//!
//!     let authorization = gateway.start_authorization().await?;
//!     println!("{}", authorization.auth_url);
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod server;

pub use client::{ApiResponse, BankClient, BankTransport};
pub use config::Config;
pub use error::{AisError, ClientError};
pub use gateway::{AisGateway, Authorization};
