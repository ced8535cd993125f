//! Command-line entry points.
//!
//! With no subcommand the binary serves the HTTP API. The other commands
//! cover one-off operator tasks that share the same configuration.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use bow_core::models::{CreateUser, Role, User};
use bow_core::{Config, Validate};
use bow_scheduler::{JobKind, JobScheduler};

use crate::state::AppState;
use crate::{auth, db, jobs, repo, router};

/// Book of Work server: API, scheduled jobs and operator commands.
#[derive(Parser, Debug)]
#[command(name = "bow-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// Bind address, overrides HOST.
        #[arg(long)]
        host: Option<String>,
        /// Bind port, overrides PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit.
    Migrate,
    /// Run one scheduled job immediately, e.g. `run-job deadline_reminders`.
    RunJob { job: JobKind },
    /// Create an administrator account.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "Administrator")]
        name: String,
        #[arg(long, env = "BOW_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Write a database snapshot and apply retention.
    Backup,
    /// Print the job table with each job's next run.
    Jobs,
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Migrate => {
            let pool = db::connect(&config.postgres).await?;
            db::migrate(&pool).await
        }
        Command::RunJob { job } => {
            let state = AppState::build(config).await?;
            let report = jobs::run_job(&state, job).await?;
            println!("{}: {}", report.job, report.summary);
            Ok(())
        }
        Command::CreateAdmin { email, name, password } => {
            create_admin(&config, name, email, password).await
        }
        Command::Backup => {
            let state = AppState::build(config).await?;
            let outcome = jobs::create_backup(&state, Utc::now()).await?;
            println!("{} ({} bytes)", outcome.backup.name, outcome.backup.size_bytes);
            for name in &outcome.pruned {
                println!("pruned {name}");
            }
            Ok(())
        }
        Command::Jobs => {
            print_jobs(&config)?;
            Ok(())
        }
    }
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.log_summary();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::build(config).await?);

    if state.config.schedule.enabled && state.pg_pool.is_some() {
        jobs::spawn_scheduler(state.clone());
    } else {
        info!("job scheduler not started");
    }

    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn create_admin(config: &Config, name: String, email: String, password: String) -> anyhow::Result<()> {
    let input = CreateUser {
        name,
        email,
        password,
        role: Role::Admin,
        department_id: None,
        team_id: None,
        email_notifications: true,
    };
    input.validate()?;

    let pool = db::connect(&config.postgres).await?;
    db::migrate(&pool).await?;

    let user = User::new(&input, Utc::now());
    let hash = auth::hash_password(&input.password)?;
    if let Err(e) = repo::users::insert(&pool, &user, &hash).await {
        if db::is_unique_violation(&e) {
            bail!("a user with e-mail {} already exists", user.email);
        }
        return Err(e).context("creating administrator");
    }
    println!("created administrator {} ({})", user.email, user.id);
    Ok(())
}

fn print_jobs(config: &Config) -> anyhow::Result<()> {
    let scheduler = JobScheduler::from_config(&config.schedule)?;
    let now = Utc::now();
    println!("{:<30} {:<16} {:<8} NEXT RUN", "JOB", "SCHEDULE", "ENABLED");
    for entry in scheduler.entries() {
        let next = scheduler
            .next_run(entry.job, now)
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<30} {:<16} {:<8} {next}", entry.job.as_str(), entry.expression, entry.enabled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["bow-server"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["bow-server", "serve", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        match cli.command {
            Some(Command::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_job_parses_job_names() {
        let cli = Cli::try_parse_from(["bow-server", "run-job", "weekly_digest"]).unwrap();
        assert!(matches!(cli.command, Some(Command::RunJob { job: JobKind::WeeklyDigest })));

        assert!(Cli::try_parse_from(["bow-server", "run-job", "make_coffee"]).is_err());
    }

    #[test]
    fn create_admin_requires_an_email() {
        let err = Cli::try_parse_from(["bow-server", "create-admin", "--password", "secret-pass1"]).unwrap_err();
        assert!(err.to_string().contains("--email"));
    }
}
