//! Grant negotiation engine.
//!
//! Drives the transaction state machine:
//!
//! | From | Event | To |
//! |---|---|---|
//! | (new) | first request, redirect or user code | `WaitingForAuthz` |
//! | (new) | first request, no interaction | `WaitingForIssuing` |
//! | `WaitingForAuthz` | interaction resolved | `WaitingForIssuing` |
//! | `WaitingForAuthz` | continuation (poll) | `WaitingForAuthz` |
//! | `WaitingForIssuing` | continuation with matching reference | `Issued` |
//! | `Issued` | continuation | `Issued` |
//!
//! Every continuation rotates the handle. The engine works on copies handed
//! out by the store and commits them back; a response is fully built and
//! serialized before anything is committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use url::Url;

use super::consent::{Authorizer, AutoApprove, Decision};
use super::store::TransactionStore;
use crate::config::{Config, ExpiryPolicy};
use crate::crypto::{Jwk, binding, jws, random, same_key};
use crate::error::{GrantError, GrantResult, StoreError};
use crate::models::{
    CallbackBinding, Interaction, InteractionType, Token, Transaction, TransactionRequest,
    TransactionResponse, TransactionState, UserCodePayload,
};

/// Attempts at committing against a record that keeps changing underneath.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// A response ready to send, serialized before the commit that produced it.
#[derive(Debug, Clone)]
pub struct GrantResponse {
    pub payload: TransactionResponse,
    pub body: Vec<u8>,
}

impl GrantResponse {
    fn new(payload: TransactionResponse) -> GrantResult<Self> {
        let body = serde_json::to_vec(&payload)?;
        Ok(Self { payload, body })
    }
}

/// Which interaction endpoint was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionPath {
    /// `/interact/{key}`
    Redirect(String),
    /// `/interact/device` with the user code the end user typed
    Device(String),
}

/// Result of a resolved interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// No callback registered; the client finds out by polling.
    Completed,
    /// Send the end user back to the client's callback.
    Redirect(Url),
}

/// Orchestrates first requests, continuations and interaction resolution.
#[derive(Clone)]
pub struct GrantEngine {
    store: TransactionStore,
    config: Arc<Config>,
    authorizer: Arc<dyn Authorizer>,
    commit_attempts: usize,
}

impl GrantEngine {
    /// Create an engine with a fresh store and auto-approving authorization.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            store: TransactionStore::new(),
            config: Arc::new(config),
            authorizer: Arc::new(AutoApprove),
            commit_attempts: MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Replace the authorization step.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Use an existing store.
    #[must_use]
    pub fn with_store(mut self, store: TransactionStore) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &TransactionStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Entry point for `POST /transaction`.
    ///
    /// Parses the body, checks proof of possession against the first key in
    /// `keys.jwks.keys`, then starts or continues a transaction.
    pub async fn handle_request(
        &self,
        raw_body: &[u8],
        detached_signature: &str,
    ) -> GrantResult<GrantResponse> {
        let request: TransactionRequest = serde_json::from_slice(raw_body)
            .map_err(|e| GrantError::malformed(format!("invalid request body: {e}")))?;
        let key = request
            .client_key()
            .ok_or_else(|| GrantError::malformed("keys.jwks.keys[0] is required"))?;

        if let Err(err) = jws::verify_possession(raw_body, detached_signature, key) {
            tracing::debug!(error = %err, "Proof of possession failed");
            return Err(err.into());
        }

        match request.continuation_handle() {
            None => self.handle_first_request(&request, key.clone()).await,
            Some(handle) => {
                self.handle_continuation(handle, key, request.interaction_ref()).await
            }
        }
    }

    /// Create a transaction for an already authenticated first request.
    pub async fn handle_first_request(
        &self,
        request: &TransactionRequest,
        key: Jwk,
    ) -> GrantResult<GrantResponse> {
        let now = Utc::now();
        let interact = request.interact.clone().unwrap_or_default();
        let mut tx = Transaction::new(random::handle()?, key, now);
        let mut response = TransactionResponse::default();

        if interact.redirect {
            if interact.user_code {
                tracing::debug!("Both redirect and user code requested, using redirect");
            }
            let interaction_key = random::interaction_key()?;
            response.interaction_url = Some(self.config.interaction_url(&interaction_key));

            let callback = match interact.callback {
                Some(callback) => {
                    let server_nonce = random::nonce()?;
                    response.server_nonce = Some(server_nonce.clone());
                    Some(CallbackBinding {
                        uri: callback.uri,
                        client_nonce: callback.nonce,
                        server_nonce,
                        hash_algorithm: callback.hash_method,
                    })
                }
                None => None,
            };
            tx.interaction = Interaction::Redirect { callback };
            tx.interaction_key = Some(interaction_key);
            tx.advance(TransactionState::WaitingForAuthz)?;
        } else if interact.user_code {
            let code = random::user_code()?;
            response.user_code =
                Some(UserCodePayload { url: self.config.user_code_url(), code: code.clone() });
            tx.interaction = Interaction::UserCode;
            tx.interaction_key = Some(code);
            tx.advance(TransactionState::WaitingForAuthz)?;
        } else {
            tx.advance(TransactionState::WaitingForIssuing)?;
        }

        response.handle = Some(Token::bearer(tx.handle.clone()));
        let response = GrantResponse::new(response)?;

        let log_id = tx.log_id().to_string();
        let kind = tx.interaction.kind();
        let state = tx.state;
        self.store
            .insert(tx)
            .await
            .map_err(|_| GrantError::internal("generated handle or interaction key collided"))?;

        tracing::info!(transaction = %log_id, interaction = ?kind, state = ?state, "Created transaction");
        Ok(response)
    }

    /// Continue the transaction under `handle`.
    ///
    /// `key` must have the thumbprint of the key bound at creation. A handle
    /// succeeds at most once: two calls racing on the same handle see one
    /// success and one `UnknownTransaction`.
    pub async fn handle_continuation(
        &self,
        handle: &str,
        key: &Jwk,
        interact_ref: Option<&str>,
    ) -> GrantResult<GrantResponse> {
        for _ in 0..self.commit_attempts {
            let mut tx =
                self.store.get(handle).await.map_err(|_| GrantError::UnknownTransaction)?;

            if !same_key(&tx.key, key) {
                tracing::warn!(transaction = %tx.log_id(), "Continuation key does not match bound key");
                return Err(GrantError::UserDenied);
            }

            let now = Utc::now();
            if tx.is_expired(now, self.config.transaction_timeout) {
                return Err(self.expire(&tx, now).await);
            }

            let mut response = TransactionResponse::default();
            match tx.state {
                TransactionState::WaitingForAuthz => {
                    response.wait = Some(self.config.wait_interval);
                }
                TransactionState::WaitingForIssuing => {
                    if let Some(expected) = tx.interaction_ref.as_deref() {
                        if interact_ref != Some(expected) {
                            tracing::warn!(transaction = %tx.log_id(), "Interaction reference mismatch");
                            return Err(GrantError::InteractionMismatch);
                        }
                    }
                    tx.advance(TransactionState::Issued)?;
                    tx.interaction_ref = None;
                    response.access_token = Some(Token::bearer(random::access_token()?));
                }
                TransactionState::Issued => {
                    response.access_token = Some(Token::bearer(random::access_token()?));
                }
                TransactionState::Initialized => {
                    return Err(GrantError::internal("stored transaction was never initialized"));
                }
            }

            tx.handle = random::handle()?;
            response.handle = Some(Token::bearer(tx.handle.clone()));
            self.touch(&mut tx, now);
            let response = GrantResponse::new(response)?;

            match self.store.commit(handle, tx).await {
                Ok(committed) => {
                    tracing::info!(
                        transaction = %committed.log_id(),
                        state = ?committed.state,
                        "Continued transaction"
                    );
                    return Ok(response);
                }
                Err(StoreError::NotFound) => return Err(GrantError::UnknownTransaction),
                Err(StoreError::Stale) => {
                    tracing::debug!("Transaction changed during continuation, retrying");
                }
                Err(StoreError::HandleCollision) => {
                    return Err(GrantError::internal("generated handle collided"));
                }
            }
        }
        Err(GrantError::internal("transaction kept changing during continuation"))
    }

    /// Resolve a pending interaction.
    ///
    /// On approval the transaction moves to `WaitingForIssuing`. With a
    /// registered callback an interaction reference is generated and the end
    /// user is redirected to the callback carrying the binding digest.
    pub async fn resolve_interaction(
        &self,
        path: InteractionPath,
    ) -> GrantResult<InteractionOutcome> {
        let (key, expected) = match path {
            InteractionPath::Redirect(key) => (key, InteractionType::Redirect),
            InteractionPath::Device(code) => {
                (random::normalize_user_code(&code), InteractionType::UserCode)
            }
        };

        let mut approved = false;
        for _ in 0..self.commit_attempts {
            let mut tx = self
                .store
                .get_by_interaction(&key)
                .await
                .map_err(|_| GrantError::UnknownTransaction)?;

            if tx.interaction.kind() != expected {
                return Err(GrantError::WrongInteraction);
            }

            let now = Utc::now();
            if tx.is_expired(now, self.config.transaction_timeout) {
                return Err(self.expire(&tx, now).await);
            }

            if tx.state != TransactionState::WaitingForAuthz {
                return Err(GrantError::InvalidState);
            }

            if !approved {
                if self.authorizer.authorize(&tx).await == Decision::Denied {
                    tracing::info!(transaction = %tx.log_id(), "Interaction denied");
                    return Err(GrantError::UserDenied);
                }
                approved = true;
            }

            tx.advance(TransactionState::WaitingForIssuing)?;
            tx.interaction_key = None;
            self.touch(&mut tx, now);
            let handle = tx.handle.clone();

            let outcome = match tx.interaction.callback().cloned() {
                None => InteractionOutcome::Completed,
                Some(callback) => {
                    let mut url = match Url::parse(&callback.uri) {
                        Ok(url) => url,
                        Err(err) => {
                            self.store.drop_transaction(&handle).await;
                            tracing::warn!(transaction = %tx.log_id(), error = %err, "Dropped transaction with invalid callback");
                            return Err(err.into());
                        }
                    };
                    let interaction_ref = random::interaction_ref()?;
                    let hash = binding::bind(
                        &callback.server_nonce,
                        &callback.client_nonce,
                        &interaction_ref,
                        callback.hash_algorithm,
                    );
                    url.set_query(None);
                    url.query_pairs_mut()
                        .append_pair("hash", &hash)
                        .append_pair(self.config.callback_ref_param.as_str(), &interaction_ref);
                    tx.interaction_ref = Some(interaction_ref);
                    InteractionOutcome::Redirect(url)
                }
            };

            match self.store.commit(&handle, tx).await {
                Ok(committed) => {
                    tracing::info!(
                        transaction = %committed.log_id(),
                        callback = matches!(outcome, InteractionOutcome::Redirect(_)),
                        "Resolved interaction"
                    );
                    return Ok(outcome);
                }
                // A poll rotated the handle in between; reload through the interaction key
                Err(StoreError::NotFound | StoreError::Stale) => {
                    tracing::debug!("Transaction changed during interaction, retrying");
                }
                Err(StoreError::HandleCollision) => {
                    return Err(GrantError::internal("interaction key owned by another transaction"));
                }
            }
        }
        Err(GrantError::internal("transaction kept changing during interaction"))
    }

    /// Drop an expired transaction and produce the error to report.
    ///
    /// `tx` is a snapshot; when its handle was rotated in the meantime the
    /// record is found again through its interaction key and dropped if it
    /// is still expired.
    async fn expire(&self, tx: &Transaction, now: DateTime<Utc>) -> GrantError {
        let mut dropped = self.store.drop_transaction(&tx.handle).await;
        if !dropped {
            if let Some(key) = tx.interaction_key.as_deref() {
                if let Ok(current) = self.store.get_by_interaction(key).await {
                    if current.is_expired(now, self.config.transaction_timeout) {
                        dropped = self.store.drop_transaction(&current.handle).await;
                    }
                }
            }
        }
        tracing::info!(transaction = %tx.log_id(), dropped, "Transaction expired");
        GrantError::Expired
    }

    fn touch(&self, tx: &mut Transaction, now: DateTime<Utc>) {
        if self.config.expiry_policy == ExpiryPolicy::Sliding {
            tx.last_updated = now;
        }
    }
}

impl std::fmt::Debug for GrantEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantEngine").field("config", &self.config).finish()
    }
}
