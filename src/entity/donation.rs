use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{goal, user};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum DonationStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "confirmed")]
  Confirmed,
  #[sea_orm(string_value = "failed")]
  Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub user_tg_id: i64,
  pub goal_id: Option<i32>,
  pub amount: i64,
  pub currency: String,
  #[sea_orm(unique)]
  pub provider_payment_id: String,
  pub status: DonationStatus,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserTgId",
    to = "user::Column::TgUserId"
  )]
  User,
  #[sea_orm(
    belongs_to = "goal::Entity",
    from = "Column::GoalId",
    to = "goal::Column::Id"
  )]
  Goal,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<goal::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Goal.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
