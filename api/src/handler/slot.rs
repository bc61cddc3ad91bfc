use crate::{
    extractor::AuthorizedUser,
    model::slot::{CreateSlotRequest, SlotListQuery, SlotResponse, SlotsResponse},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{id::SlotId, slot::event::CreateSlot};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// スロットの登録（管理者のスケジュール作成）
pub async fn register_slot(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateSlotRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    if req.end_time <= req.start_time {
        return Err(AppError::UnprocessableEntity(
            "終了時刻は開始時刻より後である必要があります。".into(),
        ));
    }

    let slot_id = registry
        .slot_repository()
        .create(CreateSlot::new(req.start_time, req.end_time))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "slotId": slot_id.to_string() })),
    ))
}

// 指定日の空きスロット一覧（予約画面が参照する）
pub async fn show_available_slots(
    _user: AuthorizedUser,
    Query(query): Query<SlotListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SlotsResponse>> {
    query.validate(&())?;

    registry
        .slot_repository()
        .find_available_by_date(query.date)
        .await
        .map(SlotsResponse::from)
        .map(Json)
}

pub async fn show_slot(
    _user: AuthorizedUser,
    Path(slot_id): Path<SlotId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SlotResponse>> {
    registry
        .slot_repository()
        .find_by_id(slot_id)
        .await
        .and_then(|slot| match slot {
            Some(slot) => Ok(Json(slot.into())),
            None => Err(AppError::SlotNotFound(format!(
                "スロット（{}）が見つかりませんでした。",
                slot_id
            ))),
        })
}
