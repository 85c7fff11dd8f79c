// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Weekday;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::PgStore,
    services::{
        auth::AuthService,
        balance_service::BalanceService,
        duty_service::DutyService,
        leave_service::LeaveService,
        notifier::{ApprovalNotifier, TelegramChannel},
        period_service::PeriodService,
        scheduler::{ScheduleConfig, Scheduler},
    },
};

#[derive(Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bot_token: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub telegram_api_url: String,
    pub notify_timeout: Duration,
    pub schedule: ScheduleConfig,
}

impl Settings {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));
        let parsed = |key: &str, default: &str| -> anyhow::Result<u64> {
            let raw = get(key).unwrap_or_else(|| default.to_string());
            raw.parse().with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
        };

        let weekday_raw = get("DUTY_ROTATION_WEEKDAY").unwrap_or_else(|| "mon".to_string());
        let rotation_weekday = Weekday::from_str(&weekday_raw)
            .map_err(|_| anyhow::anyhow!("DUTY_ROTATION_WEEKDAY must be a weekday, got '{weekday_raw}'"))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bot_token: required("BOT_TOKEN")?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: u32::try_from(parsed("DB_MAX_CONNECTIONS", "5")?)
                .context("DB_MAX_CONNECTIONS is too large")?,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| "https://api.telegram.org".to_string()),
            notify_timeout: Duration::from_secs(parsed("NOTIFY_TIMEOUT_SECS", "10")?),
            schedule: ScheduleConfig {
                tick: Duration::from_secs(parsed("SCHEDULER_TICK_SECS", "3600")?.max(1)),
                rotation_weekday,
                reset_window_days: u32::try_from(parsed("PERIOD_RESET_WINDOW_DAYS", "7")?)
                    .context("PERIOD_RESET_WINDOW_DAYS is too large")?,
            },
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub notifier: ApprovalNotifier,
    pub auth_service: AuthService<PgStore>,
    pub leave_service: LeaveService<PgStore>,
    pub balance_service: BalanceService<PgStore>,
    pub duty_service: DutyService<PgStore>,
    pub period_service: PeriodService<PgStore>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("Database connection established");

        // --- Dependency graph ---
        let http = reqwest::Client::builder()
            .timeout(settings.notify_timeout)
            .build()
            .context("failed to build the HTTP client")?;
        let channel = TelegramChannel::new(http, settings.telegram_api_url.clone(), settings.bot_token.clone());
        let notifier = ApprovalNotifier::new(Arc::new(channel), settings.notify_timeout);

        let store = PgStore::new(db_pool.clone());
        let auth_service = AuthService::new(store.clone(), settings.jwt_secret.clone(), settings.bot_token.clone());
        let leave_service = LeaveService::new(store.clone(), notifier.clone());
        let balance_service = BalanceService::new(store.clone());
        let duty_service = DutyService::new(store.clone());
        let period_service = PeriodService::new(store);

        Ok(Self {
            db_pool,
            settings: Arc::new(settings),
            notifier,
            auth_service,
            leave_service,
            balance_service,
            duty_service,
            period_service,
        })
    }

    pub fn scheduler(&self) -> Scheduler<PgStore> {
        Scheduler::new(
            self.duty_service.clone(),
            self.period_service.clone(),
            self.settings.schedule,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/leave_desk"),
        ("JWT_SECRET", "secret"),
        ("BOT_TOKEN", "123:abc"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.notify_timeout, Duration::from_secs(10));
        assert_eq!(settings.schedule.tick, Duration::from_secs(3600));
        assert_eq!(settings.schedule.rotation_weekday, Weekday::Mon);
        assert_eq!(settings.schedule.reset_window_days, 7);
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = Settings::from_lookup(lookup(&REQUIRED[..2])).err().unwrap();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("DUTY_ROTATION_WEEKDAY", "fri"), ("NOTIFY_TIMEOUT_SECS", "3")]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.schedule.rotation_weekday, Weekday::Fri);
        assert_eq!(settings.notify_timeout, Duration::from_secs(3));

        pairs.push(("SCHEDULER_TICK_SECS", "hourly"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }
}
