use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::donation;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donation_goals")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub title: String,
  pub description: String,
  pub target_amount: i64,
  pub current_amount: i64,
  pub is_active: bool,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "donation::Entity")]
  Donations,
}

impl Related<donation::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Donations.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
