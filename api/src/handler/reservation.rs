use crate::{
    expiry::DeadlineExpiry,
    extractor::AuthorizedUser,
    model::{
        reservation::{CountdownResponse, ReservationResponse, ReservationsResponse},
        slot::slot_display_strings,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use kernel::model::{
    id::ReservationId,
    reservation::{
        countdown::{Countdown, CountdownState},
        event::{ConfirmPayment, ReserveSlot, UpdateReservationStatus},
        ReservationStatus,
    },
};
use kernel::model::id::SlotId;
use kernel::notifier::AdminNotice;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

// スロットの予約操作を行う
pub async fn reserve_slot(
    user: AuthorizedUser,
    Path(slot_id): Path<SlotId>,
    State(registry): State<AppRegistry>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    // -------------------------
    // ① 事前チェック：KYC 審査を通過しているか
    // -------------------------
    if !user.user.is_kyc_approved() {
        return Err(AppError::ForbiddenOperation);
    }

    // -------------------------
    // ② 事前チェック：進行中の予約をすでに持っていないか
    //    ※ このチェックはトランザクションの外にあるため厳密ではない。
    //      （単独オペレーターの予約台帳では衝突は実務上起きないと判断）
    // -------------------------
    let active = registry
        .reservation_repository()
        .find_active_by_user_id(user.id())
        .await?;
    if active.is_some() {
        return Err(AppError::UnprocessableEntity(
            "進行中のご予約がすでにあります。完了または取消後に再度お試しください。".into(),
        ));
    }

    // -------------------------
    // ③ 表示用スナップショットのためにスロットを取得する
    //    （空き状態の最終判定はトランザクション内で改めて行われる）
    // -------------------------
    let slot = registry
        .slot_repository()
        .find_by_id(slot_id)
        .await?
        .ok_or_else(|| {
            AppError::SlotNotFound(format!(
                "スロット（{}）が見つかりませんでした。別の時間帯をお選びください。",
                slot_id
            ))
        })?;
    let (slot_date, slot_time) = slot_display_strings(&slot);

    // -------------------------
    // ④ スロット確保＋予約作成（単一トランザクション）
    // -------------------------
    let now = Utc::now();
    let payment_deadline =
        now + Duration::minutes(registry.booking_config().payment_window_minutes);
    let event = ReserveSlot::new(
        slot_id,
        user.id(),
        user.user.user_name.clone(),
        user.user.email.clone(),
        slot_date.clone(),
        slot_time.clone(),
        now,
        payment_deadline,
    );

    let reservation_id = registry.reservation_repository().reserve(event).await?;

    // -------------------------
    // ⑤ 入金期限のカウントダウンタスクを登録する。
    //    ビューの観測や掃き出しループを待たず、期限に達した時点で
    //    取消が発火する
    // -------------------------
    registry.expiry_scheduler().schedule(
        reservation_id,
        payment_deadline,
        Arc::new(DeadlineExpiry::new(
            registry.clone(),
            reservation_id,
            user.user.user_name.clone(),
        )),
    );

    // -------------------------
    // ⑥ 管理者通知（ベストエフォート。失敗しても予約は巻き戻さない）
    // -------------------------
    notify_admin(
        &registry,
        AdminNotice::new(
            "新規予約".into(),
            format!(
                "{}さんが {} {} の枠を予約しました（入金期限：{}）。",
                user.user.user_name,
                slot_date,
                slot_time,
                payment_deadline.format("%Y-%m-%d %H:%M:%S"),
            ),
        ),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "reservationId": reservation_id.to_string() })),
    ))
}

// 入金確認操作を行う（ユーザーが振込を申告する）
pub async fn confirm_payment(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    let event = ConfirmPayment::new(reservation_id, user.id(), Utc::now());
    registry
        .reservation_repository()
        .confirm_payment(event)
        .await?;

    // 入金確認済みの予約にカウントダウンは不要
    registry.expiry_scheduler().cancel(reservation_id);

    notify_admin(
        &registry,
        AdminNotice::new(
            "入金確認の申告".into(),
            format!(
                "{}さんが予約（{}）の入金を申告しました。内容をご確認ください。",
                user.user.user_name, reservation_id
            ),
        ),
    )
    .await;

    Ok(StatusCode::OK)
}

// ユーザー自身による予約の取消操作を行う
pub async fn cancel_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .reservation_repository()
        .cancel(reservation_id, user.id())
        .await?;

    registry.expiry_scheduler().cancel(reservation_id);

    notify_admin(
        &registry,
        AdminNotice::new(
            "予約の取消".into(),
            format!(
                "{}さんが予約（{}）を取消しました。スロットは解放済みです。",
                user.user.user_name, reservation_id
            ),
        ),
    )
    .await;

    Ok(StatusCode::OK)
}

// 予約画面のカウントダウン表示用。ビューを開き直した時点で
// すでに期限切れだった場合は、ここで自動取消を発火させる
pub async fn show_countdown(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<CountdownResponse>> {
    let reservation = registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("予約（{}）が見つかりませんでした。", reservation_id))
        })?;

    // 本人または管理者のみ参照できる
    if reservation.user_id != user.id() && !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    // カウントダウンが意味を持つのは payment_required の間だけ。
    // 入金確認済み・終了状態の予約では期限切れ処理は発火しない
    if reservation.status != ReservationStatus::PaymentRequired {
        return Ok(Json(CountdownResponse::without_countdown(
            reservation.reservation_id,
            reservation.status,
        )));
    }

    let now = Utc::now();
    let state = Countdown::new(reservation.payment_deadline).status(now);

    if state == CountdownState::Expired {
        // 期限切れを観測したクライアントが取消の効果を発火させる。
        // expire は CAS 更新なので、複数のビューが同時に観測しても
        // 取消が適用されるのは一度だけ
        let released = registry
            .reservation_repository()
            .expire(reservation_id, now)
            .await?;

        if released.is_none() {
            // 最初の読み取りと expire の間に状態が先へ進んでいる
            // （入金確認や別経路の取消が割り込んだ）。
            // 現在の状態を読み直して返す
            let current = registry
                .reservation_repository()
                .find_by_id(reservation_id)
                .await?
                .ok_or_else(|| {
                    AppError::EntityNotFound(format!(
                        "予約（{}）が見つかりませんでした。",
                        reservation_id
                    ))
                })?;
            return Ok(Json(CountdownResponse::without_countdown(
                current.reservation_id,
                current.status,
            )));
        }

        registry.expiry_scheduler().cancel(reservation_id);

        notify_admin(
            &registry,
            AdminNotice::new(
                "予約の自動取消".into(),
                format!(
                    "{}さんの予約（{}）は入金期限切れのため自動取消されました。",
                    reservation.user_name, reservation_id
                ),
            ),
        )
        .await;

        return Ok(Json(CountdownResponse::from_state(
            reservation.reservation_id,
            ReservationStatus::Cancelled,
            CountdownState::Expired,
        )));
    }

    Ok(Json(CountdownResponse::from_state(
        reservation.reservation_id,
        reservation.status,
        state,
    )))
}

// 管理側の承認操作（payment_confirmed → approved）
pub async fn approve_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    let event = UpdateReservationStatus::new(
        reservation_id,
        ReservationStatus::PaymentConfirmed,
        ReservationStatus::Approved,
    );
    registry.reservation_repository().transition(event).await?;

    Ok(StatusCode::OK)
}

// 管理側の却下操作。スロットは解放される
pub async fn reject_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    // 現在の状態を expected として渡す。
    // 別の管理者が先に操作していた場合、この遷移は 0 行更新で失敗する
    let reservation = registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("予約（{}）が見つかりませんでした。", reservation_id))
        })?;

    if reservation.status.is_terminal() {
        return Err(AppError::UnprocessableEntity(format!(
            "予約（{}）はすでに {} のため却下できません。",
            reservation_id, reservation.status
        )));
    }

    let event = UpdateReservationStatus::new(
        reservation_id,
        reservation.status,
        ReservationStatus::Rejected,
    );
    registry.reservation_repository().transition(event).await?;

    registry.expiry_scheduler().cancel(reservation_id);

    notify_admin(
        &registry,
        AdminNotice::new(
            "予約の却下".into(),
            format!(
                "{}さんの予約（{}）を却下しました。スロットは解放済みです。",
                reservation.user_name, reservation_id
            ),
        ),
    )
    .await;

    Ok(StatusCode::OK)
}

// 管理側による予約の削除操作を行う
pub async fn delete_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    registry
        .reservation_repository()
        .delete(reservation_id)
        .await?;

    registry.expiry_scheduler().cancel(reservation_id);

    Ok(StatusCode::OK)
}

// ログイン中ユーザーの予約一覧を取得する
pub async fn show_my_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    registry
        .reservation_repository()
        .find_by_user_id(user.id())
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

// すべての予約一覧を取得する（管理画面用）
pub async fn show_reservation_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    registry
        .reservation_repository()
        .find_all()
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

// 予約の詳細を取得する（本人または管理者）
pub async fn show_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation = registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("予約（{}）が見つかりませんでした。", reservation_id))
        })?;

    if reservation.user_id != user.id() && !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    Ok(Json(reservation.into()))
}

// ----------------------------------------------
// 管理者通知の送信処理（ベストエフォート）
// ----------------------------------------------
async fn notify_admin(registry: &AppRegistry, notice: AdminNotice) {
    if let Err(e) = registry.admin_notifier().notify(notice).await {
        tracing::warn!(
            error.message = %e,
            "管理者通知の送信に失敗しました（処理は継続します）"
        );
    }
}
