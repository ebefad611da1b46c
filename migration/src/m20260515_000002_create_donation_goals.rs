use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(DonationGoals::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(DonationGoals::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(DonationGoals::Title).text().not_null())
          .col(ColumnDef::new(DonationGoals::Description).text().not_null())
          .col(
            ColumnDef::new(DonationGoals::TargetAmount)
              .big_integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(DonationGoals::CurrentAmount)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(DonationGoals::IsActive)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(DonationGoals::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_donation_goals_active")
          .table(DonationGoals::Table)
          .col(DonationGoals::IsActive)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(DonationGoals::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum DonationGoals {
  Table,
  Id,
  Title,
  Description,
  TargetAmount,
  CurrentAmount,
  IsActive,
  CreatedAt,
}
