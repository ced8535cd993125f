use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::warn;

use bow_core::rag::RagSettings;
use bow_core::Config;
use bow_notify::{Dispatcher, TemplateRenderer};
use bow_scheduler::JobScheduler;
use bow_storage::BackupStore;

use crate::db;
use crate::imports::ImportSessions;

pub const APP_NAME: &str = "Book of Work";

pub struct AppState {
    pub config: Config,
    /// `None` when PostgreSQL is not configured; data endpoints answer 503.
    pub pg_pool: Option<PgPool>,
    pub dispatcher: Dispatcher,
    pub templates: TemplateRenderer,
    pub scheduler: Mutex<JobScheduler>,
    pub imports: ImportSessions,
    /// `None` when the backup target could not be set up.
    pub backups: Option<BackupStore>,
}

impl AppState {
    /// Connect to everything the configuration names.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let pg_pool = db::init_pg_pool(&config.postgres).await;
        let dispatcher = Dispatcher::from_mail_config(&config.mail)?;
        let scheduler = JobScheduler::from_config(&config.schedule)?;
        let backups = match BackupStore::from_config(&config.backup) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(error = %e, "Backup storage unavailable, backups disabled");
                None
            }
        };
        Ok(Self::new(config, pg_pool, dispatcher, scheduler, backups))
    }

    pub fn new(
        config: Config,
        pg_pool: Option<PgPool>,
        dispatcher: Dispatcher,
        scheduler: JobScheduler,
        backups: Option<BackupStore>,
    ) -> Self {
        Self {
            config,
            pg_pool,
            dispatcher,
            templates: TemplateRenderer::new(),
            scheduler: Mutex::new(scheduler),
            imports: ImportSessions::default(),
            backups,
        }
    }

    pub fn rag(&self) -> RagSettings {
        RagSettings::from(&self.config.schedule)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Absolute URL for an app-relative link such as `/risks/{id}`.
    pub fn absolute_link(&self, path: &str) -> String {
        format!("{}{}", self.config.mail.app_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
impl AppState {
    /// State with no database, no mail channels and no backup target.
    pub fn for_tests() -> std::sync::Arc<Self> {
        let mut scheduler = JobScheduler::new();
        scheduler.prime(Utc::now());
        std::sync::Arc::new(Self::new(
            Config::for_profile("BOW_TEST"),
            None,
            Dispatcher::empty(),
            scheduler,
            None,
        ))
    }
}
