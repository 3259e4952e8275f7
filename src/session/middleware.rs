use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::service::SessionService;
use crate::shared::{AppError, AppState};

/// JWT authentication middleware - validates the Authorization Bearer header and adds the
/// signed-in user's `UserView` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), session::jwt_auth))
/// Handlers can then extract `Extension(user): Extension<UserView>`.
#[instrument(skip(state, req, next))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    info!(
        "JWT authentication middleware triggered for request {}",
        req.uri()
    );

    let service = SessionService::new(
        state.token_config.clone(),
        Arc::clone(&state.user_repository),
    );

    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let user = match service.authenticate(authorization).await {
        Ok(user) => user,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    info!(
        user_id = %user.id,
        username = %user.username,
        "Authentication successful, adding user to request"
    );

    // Add user to request extensions for handlers to use
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
