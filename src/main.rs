mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;
mod wizard;

use std::env;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::App,
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "fundbot=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let admins: HashSet<i64> = env::var("ADMIN_IDS")
    .expect("ADMIN_IDS not set")
    .split(',')
    .filter(|s| !s.trim().is_empty())
    .map(|id| id.trim().parse().expect("Invalid Admin ID format"))
    .collect();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:donations.db?mode=rwc".into());
  let token = env::var("TELOXIDE_TOKEN").expect("TELOXIDE_TOKEN not set");
  let config = Config::from_env();

  info!("Starting fundbot v{}", env!("CARGO_PKG_VERSION"));

  if admins.is_empty() {
    warn!("No admins configured, goal creation is unavailable");
  }

  let app = Arc::new(AppState::new(&db_url, &token, admins, config).await);

  App::new()
    .register(plugins::cron::WizardGC)
    .register(plugins::cron::InvoiceSync)
    .register(plugins::server::Plugin)
    .register(plugins::telegram::Plugin)
    .run(app)
    .await;
}
