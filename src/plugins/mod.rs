pub mod cron;
pub mod server;
pub mod telegram;

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::state::AppState;

#[async_trait::async_trait]
pub trait Plugin: Send + Sync + 'static {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Box<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new() }
  }

  pub fn register<P: Plugin>(mut self, plugin: P) -> Self {
    self.plugins.push(Box::new(plugin));
    self
  }

  /// Runs every plugin on its own task and parks until the last one exits.
  pub async fn run(self, app: Arc<AppState>) {
    let mut tasks = JoinSet::new();

    for plugin in self.plugins {
      let app = app.clone();

      tasks.spawn(async move {
        let name = plugin.name();
        tracing::info!("init `{}`", name);

        if let Err(err) = plugin.start(app).await {
          tracing::error!("failed `{}`: {err}", name);
        }
      });
    }

    while tasks.join_next().await.is_some() {}
  }
}
