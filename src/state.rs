use std::env;

use teloxide::Bot;

use crate::{
  prelude::*,
  sv,
  sv::cryptobot::{CryptoBot, NANO_USDT},
  wizard::Wizard,
};

pub struct Config {
  /// Currency code passed through to the provider and stored per donation.
  pub currency: String,
  /// Donation shortcut buttons, in nano units.
  pub donation_presets: Vec<i64>,
  /// Idle time before an abandoned goal-creation draft is dropped.
  pub wizard_ttl: TimeDelta,
  /// Seconds between provider reconciliation passes; 0 disables them.
  pub invoice_sync_secs: u64,
  pub cryptobot_token: String,
  pub cryptobot_testnet: bool,
}

impl Config {
  pub fn from_env() -> Self {
    let currency = env::var("CURRENCY").unwrap_or_else(|_| "USDT".into());

    let donation_presets = env::var("DONATION_PRESETS")
      .unwrap_or_else(|_| "1,5,10,25".into())
      .split(',')
      .filter_map(|s| s.trim().parse::<i64>().ok())
      .map(|units| units * NANO_USDT)
      .collect();

    let wizard_ttl = env::var("WIZARD_TTL")
      .ok()
      .and_then(|s| humantime::parse_duration(&s).ok())
      .and_then(|d| TimeDelta::from_std(d).ok())
      .unwrap_or_else(|| TimeDelta::hours(1));

    let invoice_sync_secs = env::var("INVOICE_SYNC_SECS")
      .ok()
      .and_then(|s| s.parse().ok())
      .unwrap_or(300);

    let cryptobot_token =
      env::var("CRYPTOBOT_API_TOKEN").expect("CRYPTOBOT_API_TOKEN not set");
    let cryptobot_testnet = env::var("CRYPTOBOT_TESTNET")
      .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
      .unwrap_or(false);

    Self {
      currency,
      donation_presets,
      wizard_ttl,
      invoice_sync_secs,
      cryptobot_token,
      cryptobot_testnet,
    }
  }
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub bot: Bot,
  pub admins: HashSet<i64>,
  pub config: Config,
  pub wizard: Wizard,
  pub cryptobot: CryptoBot,
}

impl AppState {
  pub async fn new(
    db_url: &str,
    bot_token: &str,
    admins: HashSet<i64>,
    config: Config,
  ) -> Self {
    let db = Database::connect(db_url)
      .await
      .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let cryptobot =
      CryptoBot::new(config.cryptobot_token.clone(), config.cryptobot_testnet);

    Self {
      db,
      bot: Bot::new(bot_token),
      admins,
      config,
      wizard: Wizard::new(),
      cryptobot,
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      goal: sv::Goal::new(&self.db),
      donation: sv::Donation::new(&self.db),
    }
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub goal: sv::Goal<'a>,
  pub donation: sv::Donation<'a>,
}
