use sea_orm::EntityTrait;

use crate::{
    entity::users::Entity as Users,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Profile of the caller. A token for a removed account gives `USER_NOT_FOUND`.
pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let profile = found.map(User::from).ok_or(AppError::UserNotFound)?;
    Ok(ApiResponse::success("OK", profile, Some(Meta::empty())))
}
