use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).map(|v| v.to_ascii_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub mail: MailConfig,
    pub auth: AuthConfig,
    pub schedule: ScheduleConfig,
    pub backup: BackupConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `BOW_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("BOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            mail: MailConfig::from_env_profiled(p),
            auth: AuthConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
            backup: BackupConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!("  postgres:  host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!("  mail:      mailer={}, host={}", self.mail.mailer, self.mail.host.as_deref().unwrap_or("(none)"));
        tracing::info!("  schedule:  enabled={}, reminder_window={}d", self.schedule.enabled, self.schedule.reminder_window_days);
        tracing::info!("  backup:    disk={}, keep_days={}", self.backup.disk, self.backup.keep_days);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub max_upload_mb: u32,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8080),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
            max_upload_mb: profiled_env_u32(p, "MAX_UPLOAD_MB", 10),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "book_of_work"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── Mail ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// "smtp" or "log".
    pub mailer: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
    /// Base URL of the dashboard, used to build links in mails.
    pub app_url: String,
}

impl MailConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            mailer: profiled_env_or(p, "MAIL_MAILER", "log").to_lowercase(),
            host: profiled_env_opt(p, "MAIL_HOST"),
            port: profiled_env_opt(p, "MAIL_PORT").and_then(|v| v.parse().ok()),
            tls: profiled_env_bool(p, "MAIL_TLS", true),
            username: profiled_env_opt(p, "MAIL_USERNAME"),
            password: profiled_env_opt(p, "MAIL_PASSWORD"),
            from_address: profiled_env_or(p, "MAIL_FROM_ADDRESS", "no-reply@localhost"),
            from_name: profiled_env_or(p, "MAIL_FROM_NAME", "Book of Work"),
            app_url: profiled_env_or(p, "APP_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn is_smtp(&self) -> bool {
        self.mailer == "smtp" && self.host.is_some()
    }

    /// Formatted sender mailbox (`Name <address>`).
    pub fn from_mailbox(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}

// ── Auth ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_ttl_hours: u32,
}

impl AuthConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            token_ttl_hours: profiled_env_u32(p, "TOKEN_TTL_HOURS", 720),
        }
    }
}

// ── Schedule ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Per-job cron overrides keyed by job name (e.g. `deadline_reminders`).
    pub cron_overrides: Vec<(String, String)>,
    pub reminder_window_days: u32,
    pub contract_expiry_window_days: u32,
    pub rag_amber_days: u32,
    /// Retention for read notifications, e.g. `90d`.
    pub notification_retention: String,
}

/// Job names whose cron expression can be overridden via `SCHEDULE_{NAME}`.
const SCHEDULE_JOB_KEYS: &[&str] = &[
    "deadline_reminders",
    "overdue_alerts",
    "risk_review_reminders",
    "contract_expiry_alerts",
    "governance_review_reminders",
    "weekly_digest",
    "prune_notifications",
    "backup",
];

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        let cron_overrides = SCHEDULE_JOB_KEYS
            .iter()
            .filter_map(|job| {
                let key = format!("SCHEDULE_{}", job.to_uppercase());
                profiled_env_opt(p, &key).map(|cron| (job.to_string(), cron))
            })
            .collect();

        Self {
            enabled: profiled_env_bool(p, "SCHEDULER_ENABLED", true),
            cron_overrides,
            reminder_window_days: profiled_env_u32(p, "REMINDER_WINDOW_DAYS", 7),
            contract_expiry_window_days: profiled_env_u32(p, "CONTRACT_EXPIRY_WINDOW_DAYS", 90),
            rag_amber_days: profiled_env_u32(p, "RAG_AMBER_DAYS", 14),
            notification_retention: profiled_env_or(p, "NOTIFICATION_RETENTION", "90d"),
        }
    }

    pub fn cron_override(&self, job: &str) -> Option<&str> {
        self.cron_overrides
            .iter()
            .find(|(name, _)| name == job)
            .map(|(_, cron)| cron.as_str())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_overrides: Vec::new(),
            reminder_window_days: 7,
            contract_expiry_window_days: 90,
            rag_amber_days: 14,
            notification_retention: "90d".to_string(),
        }
    }
}

// ── Backup ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// "local" or "s3".
    pub disk: String,
    pub dir: PathBuf,
    pub keep_days: u32,
    pub keep_min: u32,
    pub aws: AwsConfig,
}

impl BackupConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            disk: profiled_env_or(p, "BACKUP_DISK", "local").to_lowercase(),
            dir: PathBuf::from(profiled_env_or(p, "BACKUP_DIR", "data/backups")),
            keep_days: profiled_env_u32(p, "BACKUP_KEEP_DAYS", 30),
            keep_min: profiled_env_u32(p, "BACKUP_KEEP_MIN", 3),
            aws: AwsConfig::from_env_profiled(p),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.disk == "s3" && self.aws.is_configured()
    }
}

// ── AWS / S3 ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "eu-west-2"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            s3_bucket: profiled_env_opt(p, "BACKUP_S3_BUCKET"),
            s3_prefix: profiled_env_opt(p, "BACKUP_S3_PREFIX"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    /// A bucket is enough; credentials may come from the instance role.
    pub fn is_configured(&self) -> bool {
        self.s3_bucket.as_deref().is_some_and(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("BOWTEST_PG_DATABASE", "profiled_db");
        let cfg = PostgresConfig::from_env_profiled("BOWTEST");
        assert_eq!(cfg.database, "profiled_db");
        env::remove_var("BOWTEST_PG_DATABASE");
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        env::set_var("BOWBOOL_MAIL_TLS", "off");
        assert!(!profiled_env_bool("BOWBOOL", "MAIL_TLS", true));
        env::set_var("BOWBOOL_MAIL_TLS", "Yes");
        assert!(profiled_env_bool("BOWBOOL", "MAIL_TLS", false));
        env::remove_var("BOWBOOL_MAIL_TLS");
    }

    #[test]
    fn schedule_overrides_are_collected() {
        env::set_var("BOWSCHED_SCHEDULE_BACKUP", "30 1 * * *");
        let cfg = ScheduleConfig::from_env_profiled("BOWSCHED");
        assert_eq!(cfg.cron_override("backup"), Some("30 1 * * *"));
        assert_eq!(cfg.cron_override("weekly_digest"), None);
        env::remove_var("BOWSCHED_SCHEDULE_BACKUP");
    }

    #[test]
    fn connection_string_uses_defaults() {
        let cfg = PostgresConfig {
            host: "db".into(),
            port: 5433,
            database: "bow".into(),
            username: None,
            password: None,
            ssl_mode: "disable".into(),
            max_connections: 5,
        };
        assert_eq!(cfg.connection_string(), "postgres://postgres:@db:5433/bow?sslmode=disable");
        assert!(!cfg.is_configured());
    }
}
