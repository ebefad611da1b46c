pub use sea_orm_migration::prelude::*;

mod m20260515_000001_create_users;
mod m20260515_000002_create_donation_goals;
mod m20260515_000003_create_donations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260515_000001_create_users::Migration),
      Box::new(m20260515_000002_create_donation_goals::Migration),
      Box::new(m20260515_000003_create_donations::Migration),
    ]
  }
}
