use sea_orm::sea_query::Expr;

use crate::{
  entity::{DonationStatus, donation, goal},
  prelude::*,
  sv::goal::bump_current,
};

pub struct Donation<'a> {
  db: &'a DatabaseConnection,
}

/// Outcome of a confirmation. `applied` is false when the provider replayed
/// a confirmation we had already counted.
#[derive(Debug)]
pub struct Confirmed {
  pub donation: donation::Model,
  pub goal: Option<goal::Model>,
  pub applied: bool,
}

impl<'a> Donation<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Records a payment at initiation time, before the provider settles it.
  /// The provider payment id is the idempotency key: a second insert for the
  /// same id fails with `DuplicatePayment`.
  pub async fn create(
    &self,
    user_tg_id: i64,
    goal_id: Option<i32>,
    amount: i64,
    currency: &str,
    provider_payment_id: &str,
    status: DonationStatus,
  ) -> Result<donation::Model> {
    if amount <= 0 {
      return Err(Error::InvalidArgs(
        "Donation amount must be positive".into(),
      ));
    }

    let now = Utc::now().naive_utc();
    donation::ActiveModel {
      id: NotSet,
      user_tg_id: Set(user_tg_id),
      goal_id: Set(goal_id),
      amount: Set(amount),
      currency: Set(currency.to_string()),
      provider_payment_id: Set(provider_payment_id.to_string()),
      status: Set(status),
      created_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(|e| {
      Error::on_duplicate(
        e,
        Error::DuplicatePayment(provider_payment_id.to_string()),
      )
    })
  }

  pub async fn by_provider_id(
    &self,
    provider_payment_id: &str,
  ) -> Result<Option<donation::Model>> {
    Ok(
      donation::Entity::find()
        .filter(donation::Column::ProviderPaymentId.eq(provider_payment_id))
        .one(self.db)
        .await?,
    )
  }

  /// Donations still waiting on the provider, oldest first. Drives the
  /// reconciliation pass that catches webhooks we never received.
  pub async fn pending(&self) -> Result<Vec<donation::Model>> {
    Ok(
      donation::Entity::find()
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .order_by_asc(donation::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }

  /// Settles a provider confirmation: the donation becomes confirmed and the
  /// owning goal's progress grows by the donation amount, both inside one
  /// transaction. Replayed confirmations return the current state without
  /// touching the goal again; a donation that already failed stays failed.
  pub async fn confirm(&self, provider_payment_id: &str) -> Result<Confirmed> {
    let txn = self.db.begin().await?;

    let mut donation = donation::Entity::find()
      .filter(donation::Column::ProviderPaymentId.eq(provider_payment_id))
      .one(&txn)
      .await?
      .ok_or_else(|| Error::UnknownPayment(provider_payment_id.into()))?;

    match donation.status {
      DonationStatus::Confirmed => {
        drop(txn);
        let goal = self.goal_snapshot(donation.goal_id).await?;
        return Ok(Confirmed { donation, goal, applied: false });
      }
      DonationStatus::Failed => return Err(Error::AlreadyFailed),
      DonationStatus::Pending => {}
    }

    // Compare-and-set on the status: of two racing deliveries only one
    // applies the amount, the other observes zero affected rows.
    let flipped = donation::Entity::update_many()
      .col_expr(
        donation::Column::Status,
        Expr::value(DonationStatus::Confirmed),
      )
      .filter(donation::Column::Id.eq(donation.id))
      .filter(donation::Column::Status.eq(DonationStatus::Pending))
      .exec(&txn)
      .await?
      .rows_affected;

    if flipped == 0 {
      drop(txn);
      donation.status = DonationStatus::Confirmed;
      let goal = self.goal_snapshot(donation.goal_id).await?;
      return Ok(Confirmed { donation, goal, applied: false });
    }

    donation.status = DonationStatus::Confirmed;

    if let Some(goal_id) = donation.goal_id {
      let affected = bump_current(&txn, goal_id, donation.amount).await?;
      if affected == 0 {
        warn!(
          "payment {provider_payment_id}: goal {goal_id} is gone, \
           progress not updated"
        );
      }
    }

    txn.commit().await?;

    let goal = self.goal_snapshot(donation.goal_id).await?;
    Ok(Confirmed { donation, goal, applied: true })
  }

  /// Marks a pending donation failed after a negative provider outcome. The
  /// goal is never touched. Idempotent for repeated failure callbacks; a
  /// confirmed donation cannot be failed afterwards.
  pub async fn fail(
    &self,
    provider_payment_id: &str,
  ) -> Result<donation::Model> {
    let mut donation = self
      .by_provider_id(provider_payment_id)
      .await?
      .ok_or_else(|| Error::UnknownPayment(provider_payment_id.into()))?;

    match donation.status {
      DonationStatus::Failed => return Ok(donation),
      DonationStatus::Confirmed => return Err(Error::AlreadyConfirmed),
      DonationStatus::Pending => {}
    }

    let flipped = donation::Entity::update_many()
      .col_expr(donation::Column::Status, Expr::value(DonationStatus::Failed))
      .filter(donation::Column::Id.eq(donation.id))
      .filter(donation::Column::Status.eq(DonationStatus::Pending))
      .exec(self.db)
      .await?
      .rows_affected;

    if flipped == 0 {
      // lost a race against a confirmation or another failure callback
      return match self.by_provider_id(provider_payment_id).await? {
        Some(row) if row.status == DonationStatus::Failed => Ok(row),
        _ => Err(Error::AlreadyConfirmed),
      };
    }

    donation.status = DonationStatus::Failed;
    Ok(donation)
  }

  async fn goal_snapshot(
    &self,
    goal_id: Option<i32>,
  ) -> Result<Option<goal::Model>> {
    match goal_id {
      Some(id) => Ok(goal::Entity::find_by_id(id).one(self.db).await?),
      None => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::{self, test_utils::test_db};

  async fn seed_user(db: &DatabaseConnection, tg_user_id: i64) {
    sv::User::new(db)
      .create(tg_user_id, None, None, None)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn confirm_applies_amount_to_goal() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let goal =
      sv::Goal::new(&db).create("Roof Repair", "", 1000).await.unwrap();
    let sv = Donation::new(&db);

    sv.create(1, Some(goal.id), 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();

    let confirmed = sv.confirm("pay-1").await.unwrap();
    assert!(confirmed.applied);
    assert_eq!(confirmed.donation.status, DonationStatus::Confirmed);
    assert_eq!(confirmed.goal.unwrap().current_amount, 300);
  }

  #[tokio::test]
  async fn confirm_is_idempotent() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let goal =
      sv::Goal::new(&db).create("Roof Repair", "", 1000).await.unwrap();
    let sv = Donation::new(&db);

    sv.create(1, Some(goal.id), 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();

    sv.confirm("pay-1").await.unwrap();
    let replay = sv.confirm("pay-1").await.unwrap();

    assert!(!replay.applied);
    assert_eq!(replay.goal.unwrap().current_amount, 300);
  }

  #[tokio::test]
  async fn confirm_unknown_payment_leaves_goals_untouched() {
    let db = test_db::setup().await;
    let goal =
      sv::Goal::new(&db).create("Roof Repair", "", 1000).await.unwrap();

    let result = Donation::new(&db).confirm("pay-404").await;
    assert!(matches!(result, Err(Error::UnknownPayment(_))));

    let goal =
      goal::Entity::find_by_id(goal.id).one(&db).await.unwrap().unwrap();
    assert_eq!(goal.current_amount, 0);
  }

  #[tokio::test]
  async fn failed_donation_cannot_be_confirmed() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let sv = Donation::new(&db);
    sv.create(1, None, 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();
    sv.fail("pay-1").await.unwrap();

    assert!(matches!(sv.confirm("pay-1").await, Err(Error::AlreadyFailed)));
  }

  #[tokio::test]
  async fn confirmed_donation_cannot_be_failed() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let sv = Donation::new(&db);
    sv.create(1, None, 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();
    sv.confirm("pay-1").await.unwrap();

    assert!(matches!(sv.fail("pay-1").await, Err(Error::AlreadyConfirmed)));
  }

  #[tokio::test]
  async fn fail_is_idempotent() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let sv = Donation::new(&db);
    sv.create(1, None, 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();

    let first = sv.fail("pay-1").await.unwrap();
    let second = sv.fail("pay-1").await.unwrap();
    assert_eq!(first.status, DonationStatus::Failed);
    assert_eq!(second.status, DonationStatus::Failed);
  }

  #[tokio::test]
  async fn duplicate_provider_payment_is_rejected() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let sv = Donation::new(&db);
    sv.create(1, None, 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();

    let result = sv
      .create(1, None, 500, "USDT", "pay-1", DonationStatus::Pending)
      .await;
    assert!(matches!(result, Err(Error::DuplicatePayment(_))));
  }

  #[tokio::test]
  async fn create_rejects_nonpositive_amount() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let result = Donation::new(&db)
      .create(1, None, 0, "USDT", "pay-1", DonationStatus::Pending)
      .await;
    assert!(matches!(result, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn donation_without_goal_still_confirms() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;

    let sv = Donation::new(&db);
    sv.create(1, None, 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();

    let confirmed = sv.confirm("pay-1").await.unwrap();
    assert!(confirmed.applied);
    assert!(confirmed.goal.is_none());
  }

  #[tokio::test]
  async fn two_donors_fund_a_goal_and_replays_do_not_double_count() {
    let db = test_db::setup().await;
    seed_user(&db, 1).await;
    seed_user(&db, 2).await;

    let goals = sv::Goal::new(&db);
    let goal =
      goals.create("Roof Repair", "Fix the roof", 1000).await.unwrap();

    let donations = Donation::new(&db);
    donations
      .create(1, Some(goal.id), 300, "USDT", "pay-1", DonationStatus::Pending)
      .await
      .unwrap();
    donations
      .create(2, Some(goal.id), 250, "USDT", "pay-2", DonationStatus::Pending)
      .await
      .unwrap();

    donations.confirm("pay-1").await.unwrap();
    donations.confirm("pay-2").await.unwrap();

    let active = goals.active().await.unwrap().unwrap();
    assert_eq!(active.current_amount, 550);
    assert_eq!(goals.donation_count().await.unwrap(), 2);
    assert_eq!(goals.donor_count().await.unwrap(), 2);

    // provider redelivers the first confirmation
    let replay = donations.confirm("pay-1").await.unwrap();
    assert!(!replay.applied);

    let active = goals.active().await.unwrap().unwrap();
    assert_eq!(active.current_amount, 550);
    assert_eq!(goals.donor_count().await.unwrap(), 2);
  }
}
