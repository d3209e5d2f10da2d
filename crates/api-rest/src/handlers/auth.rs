use super::reject;
use crate::schemas::{AccessTokenData, AccessTokenRes};
use crate::AppState;
use api_shared::ErrorBody;
use axum::{extract::State, response::Response};

#[utoipa::path(
    post,
    path = "/auth/access-token",
    responses(
        (status = 200, description = "EHR access token", body = AccessTokenRes),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Server configuration error", body = ErrorBody)
    )
)]
/// Hand out the cached EHR access token, exchanging credentials on a cache miss.
///
/// `expires_in` counts down to the buffered expiry, so clients refresh before the vendor
/// would reject the token.
#[axum::debug_handler]
pub async fn access_token(State(state): State<AppState>) -> Response {
    match state.gateway.access_token(false).await {
        Ok(token) => {
            let expires_in = token.expires_in_secs(state.clock.now_ms());
            state.envelopes.success(&AccessTokenRes {
                data: AccessTokenData {
                    access_token: token.value,
                    token_type: "Bearer".into(),
                    expires_in,
                },
            })
        }
        Err(e) => reject(&state, "Access token", e.into()),
    }
}
