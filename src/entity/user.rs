use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::donation;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub tg_user_id: i64,
  pub username: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
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
