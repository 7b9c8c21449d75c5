//! Wire types and the transaction entity.

pub mod request;
pub mod response;
pub mod transaction;

pub use request::{Callback, Interact, Jwks, Keys, TransactionRequest};
pub use response::{Token, TransactionResponse, UserCodePayload};
pub use transaction::{
    CallbackBinding, Interaction, InteractionType, Transaction, TransactionState,
};
