use std::sync::Arc;

use ridewave::config::Config;
use ridewave::db::PgPool;
use ridewave::engine::Engine;
use ridewave::error::{invalid_config_error, Error};
use ridewave::external::placeholder_api::PlaceholderHistoryFeed;
use ridewave::navigation::TracingNavigator;
use ridewave::server::serve;
use ridewave::session::{MemorySessionBackend, PgSessionBackend, SessionBackend};
use ridewave::simulation::Executor;

async fn session_backend(config: &Config) -> Result<Arc<dyn SessionBackend>, Error> {
    match &config.database_url {
        Some(db_uri) => {
            let PgPool(pool) = PgPool::new(db_uri, config.database_max_connections).await?;

            Ok(Arc::new(PgSessionBackend::new(pool).await?))
        }
        None => {
            tracing::info!("no database configured, keeping sessions in memory");

            Ok(Arc::new(MemorySessionBackend::new()))
        }
    }
}

fn count_arg(arg: Option<String>, default: usize) -> Result<usize, Error> {
    match arg {
        Some(raw) => raw.parse().map_err(|_| invalid_config_error("simulate")),
        None => Ok(default),
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;

    let engine = Engine::new(
        session_backend(&config).await?,
        Arc::new(TracingNavigator),
        Arc::new(PlaceholderHistoryFeed::new(config.history_feed_url.clone())),
    )?;

    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("simulate") => {
            let riders = count_arg(args.next(), 100)?;
            let workers = count_arg(args.next(), 10)?;

            Executor::new(engine).run(riders, workers).await;

            Ok(())
        }
        Some(other) => {
            tracing::warn!("unknown command {}", other);

            Err(invalid_config_error("command"))
        }
        None => serve(engine, config.addr).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}
