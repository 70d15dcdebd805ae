use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collab_invites::api::{self, AppState};
use collab_invites::cli;
use collab_invites::config;
use collab_invites::invites::InviteHandler;
use collab_invites::store::memory::MemoryStore;
use collab_invites::store::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Export spans over OTLP only when an endpoint is configured.
    use opentelemetry::KeyValue;

    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "collab-invites"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "collab_invites=debug,collabd=debug,tower_http=debug".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();
    let default_port = cfg.port;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port.unwrap_or(default_port)).await,
        Some(cli::Commands::Invite { command }) => {
            let url = cfg
                .database_url
                .clone()
                .context("DATABASE_URL is required for invite commands")?;
            let db = Arc::new(PgStore::connect(&url).await?);
            let state = AppState::from_backend(db, &cfg);
            handle_invite_command(command, &state.invites).await
        }
        None => run_server(cfg, default_port).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let state = match &cfg.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = PgStore::connect(url).await?;

            tracing::info!("Running migrations...");
            db.migrate().await?;

            Arc::new(AppState::from_backend(Arc::new(db), &cfg))
        }
        None => {
            tracing::warn!("No DATABASE_URL, using in-memory store");
            Arc::new(AppState::from_backend(Arc::new(MemoryStore::new()), &cfg))
        }
    };

    if cfg.mail_relay_url.is_none() {
        tracing::warn!("COLLAB_MAIL_RELAY_URL not set, invite emails will be skipped");
    }

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .nest("/api/v1", api::api_router(state))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("collabd listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn handle_invite_command(
    cmd: cli::InviteCommands,
    invites: &InviteHandler,
) -> anyhow::Result<()> {
    match cmd {
        cli::InviteCommands::List { project_id } => {
            let pid = parse_id("project_id", &project_id)?;
            let pending = invites.get_all_invites(pid).await?;
            if pending.is_empty() {
                println!("No pending invites.");
            } else {
                println!("{:<38} {:<32} {:<14} CREATED", "ID", "EMAIL", "PRIVILEGES");
                for i in pending {
                    println!(
                        "{:<38} {:<32} {:<14} {}",
                        i.id, i.email, i.privileges, i.created_at
                    );
                }
            }
        }
        cli::InviteCommands::Count { project_id } => {
            let pid = parse_id("project_id", &project_id)?;
            println!("{}", invites.get_invite_count(pid).await?);
        }
        cli::InviteCommands::Revoke {
            project_id,
            invite_id,
        } => {
            let pid = parse_id("project_id", &project_id)?;
            let iid = parse_id("invite_id", &invite_id)?;
            invites.revoke_invite(pid, iid).await?;
            println!("Invite {} revoked.", iid);
        }
    }
    Ok(())
}

fn parse_id(name: &str, raw: &str) -> anyhow::Result<uuid::Uuid> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("invalid {}: {}", name, raw))
}
