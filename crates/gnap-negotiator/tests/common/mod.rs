//! Shared helpers: a signing client and request plumbing for the router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{Value, json};
use tower::ServiceExt;

use gnap_negotiator::config::Config;
use gnap_negotiator::crypto::Jwk;
use gnap_negotiator::crypto::jws::{sign_detached, sign_detached_with};
use gnap_negotiator::server::transport::create_router;
use gnap_negotiator::GrantEngine;

enum Signer {
    Ed25519(SigningKey),
    Jose(EncodingKey, Algorithm),
}

/// A client holding a private key and the matching public JWK.
pub struct TestClient {
    signer: Signer,
    pub jwk: Jwk,
}

impl TestClient {
    /// Ed25519 client with a key derived from `seed`.
    pub fn new(seed: u8) -> Self {
        let signing = SigningKey::from_bytes(&[seed; 32]);
        let jwk = Jwk::ed25519(&signing.verifying_key().to_bytes());
        Self { signer: Signer::Ed25519(signing), jwk }
    }

    /// P-256 client signing with ES256.
    pub fn es256() -> Self {
        let signing =
            EncodingKey::from_ec_pem(include_bytes!("../fixtures/es256_private.pem")).unwrap();
        let jwk = serde_json::from_str(include_str!("../fixtures/es256_public.jwk.json")).unwrap();
        Self { signer: Signer::Jose(signing, Algorithm::ES256), jwk }
    }

    /// RSA client signing with `algorithm` (RS* or PS*).
    pub fn rsa(algorithm: Algorithm) -> Self {
        let signing =
            EncodingKey::from_rsa_pem(include_bytes!("../fixtures/rs256_private.pem")).unwrap();
        let jwk = serde_json::from_str(include_str!("../fixtures/rs256_public.jwk.json")).unwrap();
        Self { signer: Signer::Jose(signing, algorithm), jwk }
    }

    /// Request body with this client's key added under `keys.jwks.keys`.
    pub fn body(&self, mut fields: Value) -> Vec<u8> {
        fields["keys"] = json!({ "jwks": { "keys": [self.jwk] } });
        serde_json::to_vec(&fields).unwrap()
    }

    pub fn sign(&self, body: &[u8]) -> String {
        match &self.signer {
            Signer::Ed25519(signing) => sign_detached(body, signing),
            Signer::Jose(signing, algorithm) => {
                sign_detached_with(body, signing, *algorithm).unwrap()
            }
        }
    }

    /// Signed `POST /transaction`.
    pub fn transaction(&self, fields: Value) -> Request<Body> {
        let body = self.body(fields);
        let signature = self.sign(&body);
        Request::post("/transaction")
            .header("Content-Type", "application/json")
            .header("JWS-Signature", signature)
            .body(Body::from(body))
            .unwrap()
    }
}

pub fn engine() -> GrantEngine {
    GrantEngine::new(Config::for_testing())
}

pub fn router(engine: &GrantEngine) -> axum::Router {
    create_router(engine.clone())
}

/// Send a request and return status, headers and raw body.
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

/// Send a request and parse the JSON body.
pub async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Path of an interaction URL (`https://host/interact/KEY` -> `/interact/KEY`).
pub fn interaction_path(url: &str) -> String {
    let key = url.rsplit('/').next().unwrap();
    format!("/interact/{key}")
}
