use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub notifier: NotifierConfig,
    pub booking: BookingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let redis = RedisConfig {
            host: std::env::var("REDIS_HOST")?,
            port: std::env::var("REDIS_PORT")?.parse()?,
        };
        let auth = AuthConfig {
            ttl: std::env::var("AUTH_TOKEN_TTL")?.parse()?,
        };
        let notifier = NotifierConfig {
            // 管理者通知の送信先。未設定の場合は通知をスキップする
            webhook_url: std::env::var("ADMIN_WEBHOOK_URL").ok(),
        };
        let booking = BookingConfig::from_env()?;
        Ok(Self {
            database,
            redis,
            auth,
            notifier,
            booking,
        })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

pub struct AuthConfig {
    pub ttl: u64,
}

pub struct NotifierConfig {
    pub webhook_url: Option<String>,
}

#[derive(Clone, Copy)]
pub struct BookingConfig {
    // 予約確定後、振込確認の入力を待つ時間（分）
    pub payment_window_minutes: i64,
    // 期限切れ予約の掃き出し間隔（秒）
    pub sweep_interval_seconds: u64,
}

impl BookingConfig {
    const DEFAULT_PAYMENT_WINDOW_MINUTES: i64 = 30;
    const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

    fn from_env() -> Result<Self> {
        let payment_window_minutes = match std::env::var("PAYMENT_WINDOW_MINUTES") {
            Ok(v) => v.parse()?,
            Err(_) => Self::DEFAULT_PAYMENT_WINDOW_MINUTES,
        };
        let sweep_interval_seconds = match std::env::var("EXPIRY_SWEEP_INTERVAL_SECONDS") {
            Ok(v) => v.parse()?,
            Err(_) => Self::DEFAULT_SWEEP_INTERVAL_SECONDS,
        };
        Ok(Self {
            payment_window_minutes,
            sweep_interval_seconds,
        })
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            payment_window_minutes: Self::DEFAULT_PAYMENT_WINDOW_MINUTES,
            sweep_interval_seconds: Self::DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}
