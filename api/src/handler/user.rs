use crate::{extractor::AuthorizedUser, model::user::UserResponse};
use axum::Json;
use shared::error::AppResult;

// ログイン中ユーザー自身の情報を取得する
pub async fn get_current_user(user: AuthorizedUser) -> AppResult<Json<UserResponse>> {
    Ok(Json(UserResponse::from(user.user)))
}
