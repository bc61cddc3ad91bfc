use async_trait::async_trait;
use kernel::notifier::{AdminNotice, AdminNotifier};
use shared::{config::NotifierConfig, error::AppResult};

// 管理者向け通知を Webhook に POST する送信口。
// 送信先が未設定の場合はログだけ残して成功扱いにする
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl AdminNotifier for WebhookNotifier {
    async fn notify(&self, notice: AdminNotice) -> AppResult<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::info!(subject = %notice.subject, "管理者通知の送信先が未設定のためスキップします");
            return Ok(());
        };

        let res = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "subject": notice.subject,
                "body": notice.body,
            }))
            .send()
            .await
            .map_err(|e| shared::error::AppError::ExternalServiceError(e.to_string()))?;

        if !res.status().is_success() {
            return Err(shared::error::AppError::ExternalServiceError(format!(
                "通知の送信に失敗しました: {}",
                res.status()
            )));
        }

        Ok(())
    }
}
