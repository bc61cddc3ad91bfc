use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    // 指定されたスロットが存在しない
    #[error("{0}")]
    SlotNotFound(String),
    // スロットの確保競争に負けた（status が available ではなかった）
    #[error("{0}")]
    SlotAlreadyBooked(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理の実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    KeyValueStoreError(#[from] redis::RedisError),
    #[error("{0}")]
    BcryptError(#[from] bcrypt::BcryptError),
    #[error("{0}")]
    ConvertToUuidError(#[from] uuid::Error),
    #[error("ログインが必要です。")]
    UnauthenticatedError,
    #[error("認可情報が誤っています。")]
    UnauthorizedError,
    #[error("許可されていない操作です。")]
    ForbiddenOperation,
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("{0}")]
    ExternalServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self {
            AppError::UnprocessableEntity(_) | AppError::NoRowsAffectedError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::EntityNotFound(_) | AppError::SlotNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotAlreadyBooked(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) | AppError::ConvertToUuidError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnauthenticatedError | AppError::UnauthorizedError => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
            AppError::SpecificOperationError(_)
            | AppError::TransactionError(_)
            | AppError::KeyValueStoreError(_)
            | AppError::BcryptError(_)
            | AppError::ConversionEntityError(_)
            | AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        }

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: AppError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn booking_errors_map_to_their_status_codes() {
        assert_eq!(
            status_of(AppError::SlotNotFound("xxx".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::SlotAlreadyBooked("xxx".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::UnprocessableEntity("xxx".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::EntityNotFound("xxx".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn auth_errors_map_to_their_status_codes() {
        assert_eq!(
            status_of(AppError::UnauthenticatedError),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::UnauthorizedError),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::ForbiddenOperation),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_errors_are_opaque_500s() {
        assert_eq!(
            status_of(AppError::ConversionEntityError("xxx".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::ExternalServiceError("xxx".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
