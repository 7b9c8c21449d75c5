//! Grant negotiation: transaction store, engine and HTTP endpoints.
//!
//! ## Endpoints
//! - `POST /transaction`: first request or continuation, signed with a detached JWS
//! - `GET /interact/{key}`: resolve a redirect interaction
//! - `GET /interact/device?user_code=...`: resolve a user-code interaction

pub mod consent;
pub mod engine;
pub mod handlers;
pub mod store;

pub use consent::{Authorizer, AutoApprove, Decision};
pub use engine::{GrantEngine, GrantResponse, InteractionOutcome, InteractionPath};
pub use store::TransactionStore;
