use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kernel::model::id::ReservationId;
use kernel::model::reservation::countdown::ExpiryHandler;
use kernel::notifier::AdminNotice;
use registry::AppRegistry;

// 入金期限に達した予約をその場で取り消すハンドラ。
// 予約の作成時に ExpiryScheduler へ登録される。
// タスクはプロセス内にしか存在しないため、再起動で失われた分は
// 掃き出しループが拾う
pub(crate) struct DeadlineExpiry {
    registry: AppRegistry,
    reservation_id: ReservationId,
    user_name: String,
}

impl DeadlineExpiry {
    pub(crate) fn new(
        registry: AppRegistry,
        reservation_id: ReservationId,
        user_name: String,
    ) -> Self {
        Self {
            registry,
            reservation_id,
            user_name,
        }
    }
}

#[async_trait]
impl ExpiryHandler for DeadlineExpiry {
    async fn on_expired(&self) {
        expire_and_notify(&self.registry, self.reservation_id, &self.user_name, Utc::now()).await;
    }
}

// 1 回分の掃き出し処理。期限を過ぎた payment_required の予約を
// 自動取消し、管理者に通知する
pub async fn sweep_once(registry: &AppRegistry, now: DateTime<Utc>) {
    let expired = match registry.reservation_repository().find_expired(now).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error.message = %e, "期限切れ予約の取得に失敗しました");
            return;
        }
    };

    for reservation in expired {
        expire_and_notify(
            registry,
            reservation.reservation_id,
            &reservation.user_name,
            now,
        )
        .await;
    }
}

// expire は CAS 更新なので、カウントダウンタスク・ビュー側の観測・
// 掃き出しループのどれが競合しても取消が適用されるのは一度だけ
async fn expire_and_notify(
    registry: &AppRegistry,
    reservation_id: ReservationId,
    user_name: &str,
    now: DateTime<Utc>,
) {
    match registry
        .reservation_repository()
        .expire(reservation_id, now)
        .await
    {
        Ok(Some(slot_id)) => {
            tracing::info!(
                reservation_id = %reservation_id,
                slot_id = %slot_id,
                "入金期限切れの予約を自動取消しました"
            );
            let notice = AdminNotice::new(
                "予約の自動取消".into(),
                format!(
                    "{}さんの予約（{}）は入金期限切れのため自動取消されました。",
                    user_name, reservation_id
                ),
            );
            if let Err(e) = registry.admin_notifier().notify(notice).await {
                tracing::warn!(error.message = %e, "管理者通知の送信に失敗しました");
            }
        }
        // 別の経路が先に処理済み
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                reservation_id = %reservation_id,
                error.message = %e,
                "期限切れ予約の自動取消に失敗しました"
            );
        }
    }
}
