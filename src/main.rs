use anyhow::{anyhow, bail, Context, Result};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use leadline::channels::{TelephonyGateway, TwilioClient};
use leadline::core::config::{AppConfig, StoreBackend};
use leadline::core::shared::utils::{create_conn, run_migrations};
use leadline::core::store::{MemoryStore, PgStore, TenantStore};
use leadline::main_module::run_axum_server;
use leadline::AppState;

const USAGE: &str = "Usage:
  leadline                                             serve webhooks and the app API
  leadline migrate                                     apply pending database migrations
  leadline add-tenant <name> <owner_phone> <twilio_number>
  leadline add-worker <twilio_number> <name> [phone]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => serve().await,
        Some("migrate") => {
            open_postgres()?;
            info!("Migrations up to date");
            Ok(())
        }
        Some("add-tenant") => add_tenant(&args[2..]).await,
        Some("add-worker") => add_worker(&args[2..]).await,
        Some("--help") | Some("-h") => {
            println!("{USAGE}");
            Ok(())
        }
        Some(command) => {
            eprintln!("Unknown command: {command}");
            eprintln!("{USAGE}");
            bail!("Unknown command: {command}")
        }
    }
}

async fn serve() -> Result<()> {
    let config = AppConfig::from_env()?;

    let store: Arc<dyn TenantStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = create_conn(database_url).context("Failed to create database pool")?;
            run_migrations(&pool).map_err(|e| anyhow!("Failed to run migrations: {e}"))?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    if !config.twilio.validate_signatures {
        warn!("Twilio signature validation is disabled");
    }

    let telephony: Arc<dyn TelephonyGateway> = Arc::new(TwilioClient::new(config.twilio.clone()));
    let state = Arc::new(AppState::new(config, store, telephony));
    run_axum_server(state).await?;
    Ok(())
}

/// Provisioning commands only need the database.
fn open_postgres() -> Result<PgStore> {
    let database_url = std::env::var("DATABASE_URL").context("Missing required env var: DATABASE_URL")?;
    let pool = create_conn(&database_url).context("Failed to create database pool")?;
    run_migrations(&pool).map_err(|e| anyhow!("Failed to run migrations: {e}"))?;
    Ok(PgStore::new(pool))
}

async fn add_tenant(args: &[String]) -> Result<()> {
    let [name, owner_phone, twilio_number] = args else {
        bail!("add-tenant expects <name> <owner_phone> <twilio_number>\n{USAGE}");
    };
    let store = open_postgres()?;
    let tenant = store
        .insert_tenant(name.trim(), owner_phone.trim(), twilio_number.trim())
        .await?;
    println!("{}", serde_json::to_string_pretty(&tenant)?);
    Ok(())
}

async fn add_worker(args: &[String]) -> Result<()> {
    let (twilio_number, name, phone) = match args {
        [number, name] => (number, name, None),
        [number, name, phone] => (number, name, Some(phone.trim())),
        _ => bail!("add-worker expects <twilio_number> <name> [phone]\n{USAGE}"),
    };
    let store = open_postgres()?;
    let tenant = store
        .tenant_by_number(twilio_number.trim())
        .await?
        .ok_or_else(|| anyhow!("No tenant registered for {}", twilio_number.trim()))?;
    let worker = store.insert_worker(tenant.id, name.trim(), phone).await?;
    println!("{}", serde_json::to_string_pretty(&worker)?);
    Ok(())
}
