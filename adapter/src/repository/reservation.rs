use crate::database::{model::reservation::ReservationRow, ConnectionPool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::{
    id::{ReservationId, SlotId, UserId},
    reservation::{
        event::{ConfirmPayment, ReserveSlot, UpdateReservationStatus},
        Reservation, ReservationStatus,
    },
    slot::SlotStatus,
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

// PostgreSQL の直列化失敗（SQLSTATE 40001）
const SERIALIZATION_FAILURE_CODE: &str = "40001";

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(e) if e.code().as_deref() == Some(SERIALIZATION_FAILURE_CODE)
    )
}

// 予約トランザクション中の直列化失敗は、同じスロットを取り合って
// 負けたことを意味する。事前チェックで競合を検出できなかった場合でも
// 利用者には同じ 409 を返す
fn map_reserve_error(err: sqlx::Error, slot_id: SlotId) -> AppError {
    if is_serialization_failure(&err) {
        AppError::SlotAlreadyBooked(format!(
            "スロット（{}）は直前に他のお客様に予約されました。",
            slot_id
        ))
    } else {
        AppError::SpecificOperationError(err)
    }
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    // スロット確保の操作を行う
    async fn reserve(&self, event: ReserveSlot) -> AppResult<ReservationId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        self.set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定のスロット ID をもつスロットが存在するか
        // - 存在した場合、そのスロットが available か
        //
        // 上記の両方が Yes だった場合のみ、このブロック以降の処理に進む
        {
            //
            // ① スロットの存在確認
            //
            let slot_row: Option<(SlotId, String)> = sqlx::query_as(
                r#"
                SELECT slot_id, status
                FROM slots
                WHERE slot_id = $1
                "#,
            )
            .bind(event.slot_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let Some((_, status)) = slot_row else {
                return Err(AppError::SlotNotFound(format!(
                    "スロット（{}）が見つかりませんでした。別の時間帯をお選びください。",
                    event.slot_id
                )));
            };

            //
            // ② スロットが available かどうか確認
            //    同じスロットへの同時予約はここで高々 1 件に絞られる
            //    （負けた側はこのエラーを受け取る）
            //
            if status != SlotStatus::Available.as_ref() {
                return Err(AppError::SlotAlreadyBooked(format!(
                    "スロット（{}）は直前に他のお客様に予約されました。",
                    event.slot_id
                )));
            }
        }

        // 予約処理を行う、すなわち reservations テーブルにレコードを追加し、
        // スロットの status を booked に更新する
        let reservation_id = ReservationId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO reservations
                (reservation_id, slot_id, user_id, user_name, email,
                slot_date, slot_time, status, created_at,
                payment_confirmed, payment_deadline)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10)
            "#,
        )
        .bind(reservation_id)
        .bind(event.slot_id)
        .bind(event.user_id)
        .bind(&event.user_name)
        .bind(&event.email)
        .bind(&event.slot_date)
        .bind(&event.slot_time)
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .bind(event.created_at)
        .bind(event.payment_deadline)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_reserve_error(e, event.slot_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        let res = sqlx::query(
            r#"
                UPDATE slots
                SET status = $1
                WHERE slot_id = $2
            "#,
        )
        .bind(SlotStatus::Booked.as_ref())
        .bind(event.slot_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_reserve_error(e, event.slot_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No slot record has been updated".into(),
            ));
        }

        // SERIALIZABLE では直列化失敗がコミット時に顕在化することもある
        tx.commit().await.map_err(|e| {
            if is_serialization_failure(&e) {
                map_reserve_error(e, event.slot_id)
            } else {
                AppError::TransactionError(e)
            }
        })?;

        Ok(reservation_id)
    }

    // 入金確認操作を行う（payment_required → payment_confirmed）
    async fn confirm_payment(&self, event: ConfirmPayment) -> AppResult<()> {
        // 期待する状態（payment_required）を WHERE 句に含めることで、
        // 状態がすでに進んでいる・戻っている場合は何も更新されない
        let res = sqlx::query(
            r#"
                UPDATE reservations
                SET
                    status = $1,
                    payment_confirmed = TRUE,
                    payment_confirmed_at = $2
                WHERE reservation_id = $3
                  AND user_id = $4
                  AND status = $5
            "#,
        )
        .bind(ReservationStatus::PaymentConfirmed.as_ref())
        .bind(event.confirmed_at)
        .bind(event.reservation_id)
        .bind(event.user_id)
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）の入金確認を記録できませんでした。予約の状態をご確認ください。",
                event.reservation_id
            )));
        }

        Ok(())
    }

    // 管理側の承認・却下などの状態遷移操作を行う
    async fn transition(&self, event: UpdateReservationStatus) -> AppResult<()> {
        // 遷移表にない組み合わせはデータベースに触れる前に弾く
        if !event.expected.can_transition_to(event.next) {
            return Err(AppError::UnprocessableEntity(format!(
                "予約の状態を {} から {} に変更することはできません。",
                event.expected, event.next
            )));
        }

        let mut tx = self.db.begin().await?;

        self.set_transaction_serializable(&mut tx).await?;

        // expected と一致する行だけを更新する。
        // 同じ予約への操作が競合した場合、負けた側は 0 行更新となる
        let slot_id: Option<SlotId> = sqlx::query_scalar(
            r#"
                UPDATE reservations
                SET status = $1
                WHERE reservation_id = $2
                  AND status = $3
                RETURNING slot_id
            "#,
        )
        .bind(event.next.as_ref())
        .bind(event.reservation_id)
        .bind(event.expected.as_ref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(slot_id) = slot_id else {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）の状態が {} ではないため、操作を適用できませんでした。",
                event.reservation_id, event.expected
            )));
        };

        // rejected / cancelled への遷移では、同一トランザクション内で
        // スロットを available に戻す
        if event.next.releases_slot() {
            self.release_slot(&mut tx, slot_id).await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    // ユーザー自身による取消操作を行う
    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        self.set_transaction_serializable(&mut tx).await?;

        // 本人の非終了予約のみ取消できる
        let slot_id: Option<SlotId> = sqlx::query_scalar(
            r#"
                UPDATE reservations
                SET status = $1
                WHERE reservation_id = $2
                  AND user_id = $3
                  AND status IN ($4, $5)
                RETURNING slot_id
            "#,
        )
        .bind(ReservationStatus::Cancelled.as_ref())
        .bind(reservation_id)
        .bind(user_id)
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .bind(ReservationStatus::PaymentConfirmed.as_ref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(slot_id) = slot_id else {
            return Err(AppError::EntityNotFound(format!(
                "取消できる予約（{}）が見つかりませんでした。",
                reservation_id
            )));
        };

        self.release_slot(&mut tx, slot_id).await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    // 入金期限切れによる自動取消操作を行う。
    // payment_required かつ期限超過の行だけが対象なので、
    // すでに取消済み・入金確認済みの予約に対しては何もしない（冪等）
    async fn expire(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SlotId>> {
        let mut tx = self.db.begin().await?;

        self.set_transaction_serializable(&mut tx).await?;

        let slot_id: Option<SlotId> = sqlx::query_scalar(
            r#"
                UPDATE reservations
                SET status = $1
                WHERE reservation_id = $2
                  AND status = $3
                  AND payment_deadline <= $4
                RETURNING slot_id
            "#,
        )
        .bind(ReservationStatus::Cancelled.as_ref())
        .bind(reservation_id)
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if let Some(slot_id) = slot_id {
            self.release_slot(&mut tx, slot_id).await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(slot_id)
    }

    // 管理側による物理削除操作を行う
    async fn delete(&self, reservation_id: ReservationId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        self.set_transaction_serializable(&mut tx).await?;

        let deleted: Option<(SlotId, String)> = sqlx::query_as(
            r#"
                DELETE FROM reservations
                WHERE reservation_id = $1
                RETURNING slot_id, status
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some((slot_id, status)) = deleted else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                reservation_id
            )));
        };

        // 非終了状態の予約を消した場合はスロットを解放する
        let status = status
            .parse::<ReservationStatus>()
            .map_err(|e| AppError::ConversionEntityError(e.to_string()))?;
        if !status.is_terminal() {
            self.release_slot(&mut tx, slot_id).await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(
            r#"
                SELECT
                    reservation_id, slot_id, user_id, user_name, email,
                    slot_date, slot_time, status, created_at,
                    payment_confirmed, payment_confirmed_at, payment_deadline
                FROM reservations
                WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Reservation::try_from).transpose()
    }

    // ユーザーの非終了予約を取得する
    async fn find_active_by_user_id(&self, user_id: UserId) -> AppResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(
            r#"
                SELECT
                    reservation_id, slot_id, user_id, user_name, email,
                    slot_date, slot_time, status, created_at,
                    payment_confirmed, payment_confirmed_at, payment_deadline
                FROM reservations
                WHERE user_id = $1
                  AND status IN ($2, $3)
                LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .bind(ReservationStatus::PaymentConfirmed.as_ref())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
                SELECT
                    reservation_id, slot_id, user_id, user_name, email,
                    slot_date, slot_time, status, created_at,
                    payment_confirmed, payment_confirmed_at, payment_deadline
                FROM reservations
                WHERE user_id = $1
                ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    // すべての予約情報を取得する（管理画面用）。進行中の予約を先頭に出す
    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
                SELECT
                    reservation_id, slot_id, user_id, user_name, email,
                    slot_date, slot_time, status, created_at,
                    payment_confirmed, payment_confirmed_at, payment_deadline
                FROM reservations
                ORDER BY
                    status IN ($1, $2, $3) ASC,
                    created_at DESC
            "#,
        )
        .bind(ReservationStatus::Approved.as_ref())
        .bind(ReservationStatus::Rejected.as_ref())
        .bind(ReservationStatus::Cancelled.as_ref())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    // 期限を過ぎた payment_required の予約を取得する（掃き出しループ用）
    async fn find_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
                SELECT
                    reservation_id, slot_id, user_id, user_name, email,
                    slot_date, slot_time, status, created_at,
                    payment_confirmed, payment_confirmed_at, payment_deadline
                FROM reservations
                WHERE status = $1
                  AND payment_deadline <= $2
                ORDER BY payment_deadline ASC
            "#,
        )
        .bind(ReservationStatus::PaymentRequired.as_ref())
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }
}

impl ReservationRepositoryImpl {
    // reserve などのトランザクションを利用するにあたり
    // トランザクション分離レベルを SERIALIZABLE にするために
    // 内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    // rejected / cancelled への遷移時にスロットを available に戻すために
    // 内部的に使うメソッド
    async fn release_slot(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slot_id: SlotId,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE slots
                SET status = $1
                WHERE slot_id = $2
            "#,
        )
        .bind(SlotStatus::Available.as_ref())
        .bind(slot_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No slot record has been released".into(),
            ));
        }

        Ok(())
    }
}
