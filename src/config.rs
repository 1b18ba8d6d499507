use std::{env, str::FromStr, time::Duration};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Staging,
    Production,
}

impl FromStr for AppEnv {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "staging" | "stage" => Ok(AppEnv::Staging),
            "production" | "prod" => Ok(AppEnv::Production),
            _ => Ok(AppEnv::Development), // default if unknown
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: AppEnv,
    pub http_port: u16,

    /// Telegram bot token, as issued by BotFather.
    pub bot_token: String,
    pub telegram_api_base: String,

    /// Public URL the webhook is registered under (e.g. the Render external URL).
    pub public_base_url: String,
    pub webhook_path: String,

    pub sheet_id: String,
    /// Tab inside the spreadsheet that holds one column per category.
    pub sheet_name: String,
    pub sheets_api_base: String,

    /// Raw service-account JSON used to sign Sheets access tokens.
    pub google_credentials: String,

    /// Pause between two document uploads of the same job.
    pub delivery_delay: Duration,
}

/// Entry point to load configuration
pub fn load() -> Result<Config> {
    load_dotenv()?;
    Config::from_env()
}

/// Load .env base, then .env.{APP_ENV}
fn load_dotenv() -> Result<()> {
    // 1. Load base .env (if it exists)
    let _ = dotenvy::dotenv();

    // 2. Read APP_ENV from env (may come from .env)
    let env_name = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    // 3. Try to load .env.{APP_ENV}, e.g. .env.production
    let filename = format!(".env.{}", env_name);
    let _ = dotenvy::from_filename(&filename);

    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String> {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{} env var is required", key).into())
        };

        let env_str = var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let env = AppEnv::from_str(&env_str).unwrap_or(AppEnv::Development);

        // Render and similar hosts inject PORT; HTTP_PORT wins when both are set.
        let http_port: u16 = var("HTTP_PORT")
            .or_else(|| var("PORT"))
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| "HTTP_PORT must be a valid u16")?;

        let bot_token = required("BOT_TOKEN")?;
        let sheet_id = required("SHEET_ID")?;
        let google_credentials = required("GOOGLE_CREDENTIALS")?;

        let public_base_url = var("PUBLIC_BASE_URL")
            .or_else(|| var("RENDER_EXTERNAL_URL"))
            .filter(|v| !v.trim().is_empty())
            .ok_or("PUBLIC_BASE_URL (or RENDER_EXTERNAL_URL) env var is required")?
            .trim_end_matches('/')
            .to_string();

        let webhook_path = var("WEBHOOK_PATH").unwrap_or_else(|| "/webhook".to_string());
        if !webhook_path.starts_with('/') {
            return Err("WEBHOOK_PATH must start with '/'".into());
        }

        let sheet_name = var("SHEET_NAME").unwrap_or_else(|| "DB BBW".to_string());

        let delay_ms: u64 = var("DELIVERY_DELAY_MS")
            .unwrap_or_else(|| "1200".to_string())
            .parse()
            .map_err(|_| "DELIVERY_DELAY_MS must be a non-negative integer")?;

        let telegram_api_base = var("TELEGRAM_API_BASE")
            .unwrap_or_else(|| "https://api.telegram.org".to_string());
        let sheets_api_base = var("SHEETS_API_BASE")
            .unwrap_or_else(|| "https://sheets.googleapis.com".to_string());

        Ok(Self {
            env,
            http_port,
            bot_token,
            telegram_api_base,
            public_base_url,
            webhook_path,
            sheet_id,
            sheet_name,
            sheets_api_base,
            google_credentials,
            delivery_delay: Duration::from_millis(delay_ms),
        })
    }

    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.public_base_url, self.webhook_path)
    }
}
