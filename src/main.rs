use crate::{
    app::App,
    auth::{AdminSecret, DEFAULT_ADMIN_PASSWORD},
    db::PostgresDb,
    db_pool::DbPool,
    migrations::run_migrations,
    routes::build_router,
};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod auth;
mod db;
mod db_pool;
mod error;
mod handler;
mod migrations;
mod models;
mod routes;
mod schema;
mod signals;

#[cfg(not(debug_assertions))]
#[must_use]
pub const fn is_debug() -> bool {
    false
}

#[cfg(debug_assertions)]
#[must_use]
pub const fn is_debug() -> bool {
    true
}

#[derive(Parser, Debug)]
#[command(version, about = "Admin API for a partner URL shortener")]
struct Arguments {
    #[arg(long, default_value_t = 8080, help = "Port to listen on", env = "PORT")]
    port: u16,

    #[arg(
        long,
        default_value_t = 6,
        value_parser = clap::value_parser!(u8).range(1..=32),
        help = "Length of generated codes (1-32, the width of urls.code)",
        env = "CODE_LENGTH"
    )]
    code_length: u8,

    #[arg(long, help = "Logging level of the Rust log", env = "RUST_LOG")]
    #[clap(default_value_t = String::from("info,tower_http=debug"))]
    rust_log_level: String,

    #[arg(long, env = "DATABASE_URL")]
    db_url: String,

    #[arg(
        long,
        default_value_t = 10,
        help = "DB pool size",
        env = "DB_POOL_SIZE"
    )]
    db_pool_size: usize,

    #[arg(
        long,
        default_value_t = String::from(DEFAULT_ADMIN_PASSWORD),
        hide_default_value = true,
        hide_env_values = true,
        help = "Shared secret expected as `Authorization: Bearer <secret>`",
        env = "ADMIN_PASSWORD"
    )]
    admin_password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.rust_log_level))
        .with(tracing_subscriber::fmt::layer().with_ansi(is_debug()))
        .init();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Could not install rustls default crypto provider."))?;

    run_migrations(&args.db_url)?;

    let dbpool = DbPool::build(&args.db_url, args.db_pool_size).await?;

    let secret = AdminSecret::new(&args.admin_password);

    let app = App::new(args.code_length.into(), Arc::new(PostgresDb::new(dbpool)));

    let router = build_router(app, secret);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    tracing::info!("listening on http://{}", addr);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    signals::create_term_signal_handler(tx);

    let listener = TcpListener::bind(addr).await?;

    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let graceful = server.with_graceful_shutdown(async {
        rx.await.ok();
    });

    if let Err(e) = graceful.await {
        tracing::error!("server error: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Arguments::try_parse_from(["linkhub", "--db-url", "postgres://localhost/db"])
            .unwrap();

        assert_eq!(args.code_length, 6);
        assert_eq!(args.db_pool_size, 10);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Arguments::try_parse_from([
            "linkhub",
            "--db-url",
            "postgres://localhost/db",
            "--admin-password",
            "hunter2",
            "--code-length",
            "8",
        ])
        .unwrap();

        assert_eq!(args.admin_password, "hunter2");
        assert_eq!(args.code_length, 8);
    }

    #[test]
    fn test_code_length_bounds() {
        for bad in ["0", "33"] {
            let res = Arguments::try_parse_from([
                "linkhub",
                "--db-url",
                "postgres://localhost/db",
                "--code-length",
                bad,
            ]);
            assert!(res.is_err(), "{bad}");
        }

        let args = Arguments::try_parse_from([
            "linkhub",
            "--db-url",
            "postgres://localhost/db",
            "--code-length",
            "32",
        ])
        .unwrap();
        assert_eq!(args.code_length, 32);
    }
}
