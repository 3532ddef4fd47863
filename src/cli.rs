use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use time::Duration;

use crate::{
    accounts,
    config::AppConfig,
    db::{self, Role},
    identity::Identities,
    profiles,
    storage::ObjectStore,
    telemetry, AppState,
};

#[derive(Parser, Debug)]
#[command(name = "hakkutsu", about = "Excavation job board and knowledge base", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default command)
    Serve(ServeArgs),
    /// Set the role of an existing account, e.g. to create the first admin
    GrantRole(GrantRoleArgs),
    /// Finish account deletions that were interrupted
    ResumeDeletions,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct GrantRoleArgs {
    #[arg(long)]
    email: String,
    /// One of user, recruiter, admin
    #[arg(long)]
    role: Role,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let command = cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default()));
    if let Command::Serve(args) = &command {
        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
    }

    let db_pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;

    match command {
        Command::Serve(_) => serve(config, db_pool).await,
        Command::GrantRole(GrantRoleArgs { email, role }) => {
            let identities = Identities::new(db_pool.clone(), Duration::minutes(config.otp_ttl_minutes));
            let identity = identities
                .find_by_email(&email.trim().to_lowercase())
                .await?
                .with_context(|| format!("no account for {email}"))?;
            profiles::store::update_role(&db_pool, identity.id, role).await?;
            tracing::info!(id = %identity.id, %role, "role granted");
            Ok(())
        }
        Command::ResumeDeletions => {
            let report = accounts::resume_pending(&db_pool).await?;
            tracing::info!(completed = report.completed, failed = report.failed, "deletion jobs resumed");
            if report.failed > 0 {
                anyhow::bail!("{} account deletion(s) still pending", report.failed);
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, db_pool: sqlx::SqlitePool) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;

    let identities = Identities::new(db_pool.clone(), Duration::minutes(config.otp_ttl_minutes));
    let objects = ObjectStore::new(config.uploads.dir.clone(), config.uploads.max_bytes);
    let app = crate::app(AppState::new(db_pool, identities, objects), &config.sessions);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
