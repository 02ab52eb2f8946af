//! Authorization middleware for protected routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::error::ApiError;

/// Run the authorizer on the request's bearer token. On allow the
/// [`IdentityContext`](crate::IdentityContext) is stored in the request
/// extensions; on deny the request ends with 401.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let resource = req.uri().path().to_owned();

    let decision = state
        .authorizer
        .authorize(header.as_deref(), &resource)
        .await;

    match decision.identity {
        Some(identity) if decision.is_allowed() => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        _ => ApiError::Unauthorized.into_response(),
    }
}
