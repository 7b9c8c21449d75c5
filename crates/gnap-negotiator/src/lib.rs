//! GNAP-style grant negotiation server
//!
//! A client requests a grant, is sent through an out-of-band interaction
//! (redirect with callback, redirect with polling, or device user code), and
//! then continues the transaction with a rotating opaque handle until an
//! access token is issued.
//!
//! # Features
//!
//! - **Single-use handles**: every continuation rotates the handle atomically
//! - **Bound callbacks**: server nonce, client nonce and interaction reference
//!   are hashed together so a redirect cannot be forged or replayed
//! - **Proof of possession**: every request carries a detached JWS over its body,
//!   and continuations must come from the key bound at creation
//! - **In-memory**: no database, transactions expire lazily
//!
//! # Example
//!
//! ```no_run
//! use gnap_negotiator::{config::Config, server::GrantServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     GrantServer::new(config).run_http(3000).await
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod server;

pub use config::Config;
pub use error::{GrantError, KeyError, StoreError};
pub use server::grant::{GrantEngine, TransactionStore};
