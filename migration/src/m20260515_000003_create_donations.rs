use sea_orm_migration::prelude::*;

use super::{
  m20260515_000001_create_users::Users,
  m20260515_000002_create_donation_goals::DonationGoals,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Donations::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Donations::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Donations::UserTgId).big_integer().not_null())
          .col(ColumnDef::new(Donations::GoalId).integer().null())
          .col(ColumnDef::new(Donations::Amount).big_integer().not_null())
          .col(ColumnDef::new(Donations::Currency).text().not_null())
          .col(
            ColumnDef::new(Donations::ProviderPaymentId).text().not_null(),
          )
          .col(
            ColumnDef::new(Donations::Status)
              .text()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Donations::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_donations_user")
              .from(Donations::Table, Donations::UserTgId)
              .to(Users::Table, Users::TgUserId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_donations_goal")
              .from(Donations::Table, Donations::GoalId)
              .to(DonationGoals::Table, DonationGoals::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_donations_goal")
          .table(Donations::Table)
          .col(Donations::GoalId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_donations_provider_payment")
          .table(Donations::Table)
          .col(Donations::ProviderPaymentId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Donations::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Donations {
  Table,
  Id,
  UserTgId,
  GoalId,
  Amount,
  Currency,
  ProviderPaymentId,
  Status,
  CreatedAt,
}
