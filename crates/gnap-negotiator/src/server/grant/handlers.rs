//! Grant negotiation endpoint handlers.
//!
//! Thin translation between HTTP and [`GrantEngine`](super::GrantEngine):
//! header checks happen here, protocol decisions happen in the engine.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::ContentType;
use serde::Deserialize;

use super::engine::{InteractionOutcome, InteractionPath};
use crate::config::protocol::{SIGNATURE_HEADER, USER_CODE_INTERACTION_PATH};
use crate::error::GrantError;
use crate::server::transport::HttpState;

// ─── Transaction Endpoint ────────────────────────────────────────────────────

/// `POST /transaction`
///
/// First request when the body has no handle, continuation otherwise.
pub async fn handle_transaction(
    State(state): State<Arc<HttpState>>,
    content_type: Option<TypedHeader<ContentType>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if content_type.map(|TypedHeader(ct)| ct) != Some(ContentType::json()) {
        return grant_error(
            &GrantError::malformed("Content-Type must be application/json"),
            StatusCode::BAD_REQUEST,
        );
    }

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return grant_error(
            &GrantError::malformed(format!("Missing {SIGNATURE_HEADER} header")),
            StatusCode::BAD_REQUEST,
        );
    };

    match state.engine.handle_request(&body, signature).await {
        Ok(response) => transaction_success(response.body),
        Err(err) => grant_error(&err, StatusCode::BAD_REQUEST),
    }
}

/// JSON body with no-store cache headers; handles and tokens must not be cached.
fn transaction_success(body: Vec<u8>) -> Response {
    let mut response = (StatusCode::OK, body).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

// ─── Interaction Endpoint ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InteractionQuery {
    pub user_code: Option<String>,
}

/// `GET /interact/{key}`
///
/// The reserved `device` segment resolves a user-code interaction; any other
/// segment is a redirect interaction key. Redirects to the client callback
/// when one was registered, otherwise answers 200 with an empty body.
pub async fn handle_interaction(
    State(state): State<Arc<HttpState>>,
    Path(segment): Path<String>,
    Query(query): Query<InteractionQuery>,
) -> Response {
    let path = if segment == USER_CODE_INTERACTION_PATH {
        let Some(code) = query.user_code.filter(|c| !c.trim().is_empty()) else {
            return grant_error(
                &GrantError::malformed("user_code is required"),
                StatusCode::BAD_REQUEST,
            );
        };
        InteractionPath::Device(code)
    } else {
        InteractionPath::Redirect(segment)
    };

    match state.engine.resolve_interaction(path).await {
        Ok(InteractionOutcome::Completed) => StatusCode::OK.into_response(),
        Ok(InteractionOutcome::Redirect(url)) => {
            (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
        }
        Err(err) => grant_error(&err, StatusCode::NOT_FOUND),
    }
}

/// Error body `{"error": code, "error_description": text}`.
///
/// `unknown_status` is used for unknown transactions, which differ per endpoint.
fn grant_error(err: &GrantError, unknown_status: StatusCode) -> Response {
    let status = match err {
        GrantError::UnknownTransaction => unknown_status,
        _ => err.status(),
    };

    if err.is_internal() {
        tracing::error!(error = %err, "Grant request failed");
    } else {
        tracing::debug!(reason = err.reason_code(), "Grant request rejected");
    }

    (
        status,
        Json(serde_json::json!({
            "error": err.reason_code(),
            "error_description": err.to_user_message()
        })),
    )
        .into_response()
}
