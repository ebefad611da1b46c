use std::sync::Arc;

use async_trait::async_trait;

use crate::{
  plugins::{Plugin, telegram},
  prelude::*,
  state::AppState,
  sv::cryptobot::InvoiceStatus,
};

/// Drops goal-creation drafts their admin walked away from. Purely a memory
/// bound: nothing durable depends on wizard state.
pub struct WizardGC;

#[async_trait]
impl Plugin for WizardGC {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
      interval.tick().await;

      let dropped = app.wizard.gc(app.config.wizard_ttl);
      if dropped > 0 {
        debug!("wizard: dropped {dropped} stale draft(s)");
      }
    }
  }
}

/// Reconciles pending donations against the provider. Catches paid invoices
/// whose webhook never arrived and retires expired ones.
pub struct InvoiceSync;

#[async_trait]
impl Plugin for InvoiceSync {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let interval_secs = app.config.invoice_sync_secs;
    if interval_secs == 0 {
      info!("InvoiceSync disabled via config (0 interval)");
      return Ok(());
    }

    info!("InvoiceSync started (interval: {interval_secs}s)");

    let mut interval =
      tokio::time::interval(Duration::from_secs(interval_secs));

    // skip the tick that fires immediately
    interval.tick().await;

    loop {
      interval.tick().await;

      if let Err(err) = run_sync(&app).await {
        error!("invoice sync failed: {err}");
      }
    }
  }
}

async fn run_sync(app: &Arc<AppState>) -> Result<()> {
  let sv = app.sv();

  let pending = sv.donation.pending().await?;
  if pending.is_empty() {
    return Ok(());
  }

  let invoice_ids: Vec<i64> = pending
    .iter()
    .filter_map(|d| d.provider_payment_id.parse().ok())
    .collect();

  let invoices = app.cryptobot.get_invoices(Some(invoice_ids), None).await?;

  for invoice in invoices {
    let provider_id = invoice.invoice_id.to_string();

    match invoice.status {
      InvoiceStatus::Paid => match sv.donation.confirm(&provider_id).await {
        Ok(confirmed) if confirmed.applied => {
          info!("sync: payment {provider_id} confirmed late");
          telegram::send_donation_receipt(app, &confirmed).await;
        }
        Ok(_) => {}
        Err(err) => {
          error!("sync: failed to confirm {provider_id}: {err}");
        }
      },
      InvoiceStatus::Expired => match sv.donation.fail(&provider_id).await {
        Ok(_) => debug!("sync: payment {provider_id} expired unpaid"),
        Err(err) => error!("sync: failed to retire {provider_id}: {err}"),
      },
      InvoiceStatus::Active => {}
    }
  }

  Ok(())
}
