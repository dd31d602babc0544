use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Worker pool size for one dispatch pass — caps simultaneous outbound
    /// calls to channel providers (default: 8)
    pub dispatch_concurrency: usize,

    /// Seconds between automatic retry sweeps (default: 300)
    pub retry_interval_secs: u64,

    /// Maximum delivery attempts per (record, channel) pair (default: 3)
    pub retry_max_attempts: i32,

    /// FCM HTTP endpoint for push delivery
    pub fcm_api_url: String,

    /// FCM server key; absent means push uses the local no-op sender
    pub fcm_server_key: Option<String>,

    /// Resend API key for email delivery; absent means email uses the
    /// local no-op sender
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// SMS gateway endpoint; absent means SMS uses the local no-op sender
    pub sms_api_url: Option<String>,

    /// SMS gateway API key
    pub sms_api_key: Option<String>,

    /// SMS sender id
    pub sms_from: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            dispatch_concurrency: std::env::var("DISPATCH_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_CONCURRENCY must be a valid usize"))?,
            retry_interval_secs: std::env::var("RETRY_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_INTERVAL_SECS must be a valid u64"))?,
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_MAX_ATTEMPTS must be a valid i32"))?,
            fcm_api_url: std::env::var("FCM_API_URL")
                .unwrap_or_else(|_| "https://fcm.googleapis.com/fcm/send".to_string()),
            fcm_server_key: std::env::var("FCM_SERVER_KEY").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            sms_api_url: std::env::var("SMS_API_URL").ok(),
            sms_api_key: std::env::var("SMS_API_KEY").ok(),
            sms_from: std::env::var("SMS_FROM").ok(),
        })
    }
}
