use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult, middleware::auth::AuthUser, models::User, response::ApiResponse,
    services::user_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(me))
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Profile of the caller", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}
