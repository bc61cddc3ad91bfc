use async_trait::async_trait;
use derive_new::new;
use shared::error::AppResult;

// 管理者への通知内容。テンプレート整形は呼び出し側で済ませる
#[derive(Debug, Clone, new)]
pub struct AdminNotice {
    pub subject: String,
    pub body: String,
}

// 管理者通知の送信口。送信失敗は呼び出し側でログに残して握りつぶす
// （ベストエフォートであり、予約の状態遷移を巻き戻す理由にはならない）
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, notice: AdminNotice) -> AppResult<()>;
}
