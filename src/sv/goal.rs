use sea_orm::sea_query::Expr;

use crate::{
  entity::{DonationStatus, donation, goal},
  prelude::*,
};

pub struct Goal<'a> {
  db: &'a DatabaseConnection,
}

/// Adds `delta` to a goal's progress with a SQL-level increment, so that
/// concurrent confirmations cannot lose updates. Returns the number of rows
/// touched; zero means the goal no longer exists.
pub(crate) async fn bump_current<C: ConnectionTrait>(
  conn: &C,
  goal_id: i32,
  delta: i64,
) -> Result<u64> {
  let result = goal::Entity::update_many()
    .col_expr(
      goal::Column::CurrentAmount,
      Expr::col(goal::Column::CurrentAmount).add(delta),
    )
    .filter(goal::Column::Id.eq(goal_id))
    .exec(conn)
    .await?;

  Ok(result.rows_affected)
}

impl<'a> Goal<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Creates a goal and makes it the only active one. Deactivating the
  /// previous goal and inserting the new row happen in one transaction, so
  /// readers never observe zero or two active goals.
  pub async fn create(
    &self,
    title: &str,
    description: &str,
    target_amount: i64,
  ) -> Result<goal::Model> {
    if target_amount <= 0 {
      return Err(Error::InvalidArgs(
        "Goal target amount must be positive".into(),
      ));
    }

    let txn = self.db.begin().await?;

    goal::Entity::update_many()
      .col_expr(goal::Column::IsActive, Expr::value(false))
      .filter(goal::Column::IsActive.eq(true))
      .exec(&txn)
      .await?;

    let now = Utc::now().naive_utc();
    let goal = goal::ActiveModel {
      id: NotSet,
      title: Set(title.to_string()),
      description: Set(description.to_string()),
      target_amount: Set(target_amount),
      current_amount: Set(0),
      is_active: Set(true),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(goal)
  }

  /// The goal currently accepting donations, newest row winning should the
  /// single-active invariant ever be violated.
  pub async fn active(&self) -> Result<Option<goal::Model>> {
    Ok(
      goal::Entity::find()
        .filter(goal::Column::IsActive.eq(true))
        .order_by_desc(goal::Column::Id)
        .one(self.db)
        .await?,
    )
  }

  /// Gateway form of the progress increment; the confirmation path applies
  /// the same statement inside its own transaction.
  #[allow(dead_code)]
  pub async fn add_to_current(
    &self,
    goal_id: i32,
    delta: i64,
  ) -> Result<bool> {
    let affected = bump_current(self.db, goal_id, delta).await?;
    if affected == 0 {
      warn!("goal {goal_id} vanished before its progress could be updated");
    }
    Ok(affected > 0)
  }

  /// Confirmed donations toward the active goal, joined at query time rather
  /// than kept as a cached counter.
  pub async fn donation_count(&self) -> Result<u64> {
    Ok(
      donation::Entity::find()
        .inner_join(goal::Entity)
        .filter(goal::Column::IsActive.eq(true))
        .filter(donation::Column::Status.eq(DonationStatus::Confirmed))
        .count(self.db)
        .await?,
    )
  }

  /// Distinct users behind the active goal's confirmed donations.
  pub async fn donor_count(&self) -> Result<u64> {
    let donors: Vec<i64> = donation::Entity::find()
      .select_only()
      .column(donation::Column::UserTgId)
      .distinct()
      .inner_join(goal::Entity)
      .filter(goal::Column::IsActive.eq(true))
      .filter(donation::Column::Status.eq(DonationStatus::Confirmed))
      .into_tuple()
      .all(self.db)
      .await?;

    Ok(donors.len() as u64)
  }

  pub async fn all(&self) -> Result<Vec<goal::Model>> {
    Ok(
      goal::Entity::find()
        .order_by_desc(goal::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  #[tokio::test]
  async fn create_keeps_a_single_active_goal() {
    let db = test_db::setup().await;
    let sv = Goal::new(&db);

    let first = sv.create("Roof Repair", "Fix the roof", 1000).await.unwrap();
    assert!(first.is_active);

    let second = sv.create("New Boiler", "Replace it", 2000).await.unwrap();
    assert!(second.is_active);

    let active: Vec<goal::Model> = goal::Entity::find()
      .filter(goal::Column::IsActive.eq(true))
      .all(&db)
      .await
      .unwrap();

    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let first =
      goal::Entity::find_by_id(first.id).one(&db).await.unwrap().unwrap();
    assert!(!first.is_active);
  }

  #[tokio::test]
  async fn active_is_always_the_most_recent() {
    let db = test_db::setup().await;
    let sv = Goal::new(&db);

    assert!(sv.active().await.unwrap().is_none());

    sv.create("One", "", 100).await.unwrap();
    sv.create("Two", "", 100).await.unwrap();
    let third = sv.create("Three", "", 100).await.unwrap();

    assert_eq!(sv.active().await.unwrap().unwrap().id, third.id);
  }

  #[tokio::test]
  async fn create_rejects_nonpositive_target() {
    let db = test_db::setup().await;
    let sv = Goal::new(&db);

    assert!(matches!(
      sv.create("Zero", "", 0).await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      sv.create("Negative", "", -5).await,
      Err(Error::InvalidArgs(_))
    ));
  }

  #[tokio::test]
  async fn increments_accumulate_without_loss() {
    let db = test_db::setup().await;
    let sv = Goal::new(&db);

    let goal = sv.create("Roof Repair", "", 10_000).await.unwrap();

    let deltas = [300, 250, 75, 125, 250];
    for delta in deltas {
      assert!(sv.add_to_current(goal.id, delta).await.unwrap());
    }

    let goal =
      goal::Entity::find_by_id(goal.id).one(&db).await.unwrap().unwrap();
    assert_eq!(goal.current_amount, deltas.iter().sum::<i64>());
  }

  #[tokio::test]
  async fn increment_on_missing_goal_reports_no_rows() {
    let db = test_db::setup().await;
    let sv = Goal::new(&db);

    assert!(!sv.add_to_current(999, 100).await.unwrap());
  }
}
