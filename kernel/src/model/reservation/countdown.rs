use crate::model::id::ReservationId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

// 残り時間の表示レベル。残り 30 分を切ると warning、10 分を切ると critical
const WARNING_THRESHOLD_SECONDS: i64 = 30 * 60;
const CRITICAL_THRESHOLD_SECONDS: i64 = 10 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Ticking {
        hours: i64,
        minutes: i64,
        seconds: i64,
        level: UrgencyLevel,
    },
    Expired,
}

// 入金期限に対する残り時間の計算。表示用の時分秒への分解もここで行う
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    deadline: DateTime<Utc>,
}

impl Countdown {
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self { deadline }
    }

    pub fn status(&self, now: DateTime<Utc>) -> CountdownState {
        let remaining = (self.deadline - now).num_seconds();
        if remaining <= 0 {
            return CountdownState::Expired;
        }

        let level = if remaining < CRITICAL_THRESHOLD_SECONDS {
            UrgencyLevel::Critical
        } else if remaining < WARNING_THRESHOLD_SECONDS {
            UrgencyLevel::Warning
        } else {
            UrgencyLevel::Normal
        };

        CountdownState::Ticking {
            hours: remaining / 3600,
            minutes: (remaining % 3600) / 60,
            seconds: remaining % 60,
            level,
        }
    }
}

// 期限切れ時に一度だけ呼び出されるハンドラ。
// 複数のビューから同じ予約の期限切れが通知されても整合性が崩れないよう、
// 実装側は冪等でなければならない（ストア側の CAS 更新で担保する）
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    async fn on_expired(&self);
}

// 予約ビューの寿命に束縛された所有型のカウントダウンタスク。
// 1 秒ごとに残り時間を再評価し、期限を跨いだ瞬間にハンドラを一度だけ呼んで
// 停止する。開始時点ですでに期限切れの場合は即座に一度だけ呼ぶ。
// stop() または Drop でタスクは確実に中断され、以降ハンドラは呼ばれない
pub struct PaymentCountdown {
    handle: JoinHandle<()>,
}

impl PaymentCountdown {
    pub fn spawn(deadline: DateTime<Utc>, handler: Arc<dyn ExpiryHandler>) -> Self {
        Self::spawn_with_tick(deadline, handler, Duration::from_secs(1))
    }

    fn spawn_with_tick(
        deadline: DateTime<Utc>,
        handler: Arc<dyn ExpiryHandler>,
        tick: Duration,
    ) -> Self {
        let countdown = Countdown::new(deadline);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                // 最初の tick は即座に完了するため、開始時点で期限切れの
                // 予約も遅延なく処理される
                interval.tick().await;
                if countdown.status(Utc::now()) == CountdownState::Expired {
                    handler.on_expired().await;
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PaymentCountdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// 予約 ID ごとのカウントダウンタスクの置き場。
// 予約の作成時にタスクを登録し、入金確認・取消・却下などで
// カウントダウンが不要になったら cancel で破棄する。
// エントリの差し替えや取消では古いタスクが Drop により中断される
#[derive(Default)]
pub struct ExpiryScheduler {
    timers: Mutex<HashMap<ReservationId, PaymentCountdown>>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        &self,
        reservation_id: ReservationId,
        deadline: DateTime<Utc>,
        handler: Arc<dyn ExpiryHandler>,
    ) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        // 発火済みのタスクはここで間引く
        timers.retain(|_, countdown| !countdown.is_finished());
        timers.insert(reservation_id, PaymentCountdown::spawn(deadline, handler));
    }

    pub fn cancel(&self, reservation_id: ReservationId) {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&reservation_id);
    }

    pub fn is_scheduled(&self, reservation_id: ReservationId) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&reservation_id)
    }
}
