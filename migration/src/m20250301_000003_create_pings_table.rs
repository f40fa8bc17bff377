use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users_table::Users;
use super::m20250301_000002_create_gigs_table::Gigs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
pub enum Pings {
    Table,
    Id,
    GigId,
    ApplicantId,
    PosterId,
    Message,
    PortfolioLink,
    PortfolioDescription,
    Status,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Pings::GigId).uuid().not_null())
                    .col(ColumnDef::new(Pings::ApplicantId).uuid().not_null())
                    .col(ColumnDef::new(Pings::PosterId).uuid().not_null())
                    .col(ColumnDef::new(Pings::Message).text().not_null())
                    .col(ColumnDef::new(Pings::PortfolioLink).string().null())
                    .col(ColumnDef::new(Pings::PortfolioDescription).text().null())
                    .col(ColumnDef::new(Pings::Status).string().not_null().default("pending"))
                    .col(
                        ColumnDef::new(Pings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pings_gig_id")
                            .from(Pings::Table, Pings::GigId)
                            .to(Gigs::Table, Gigs::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pings_applicant_id")
                            .from(Pings::Table, Pings::ApplicantId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ping per (gig, applicant)
        manager
            .create_index(
                Index::create()
                    .name("idx_pings_gig_applicant_unique")
                    .table(Pings::Table)
                    .col(Pings::GigId)
                    .col(Pings::ApplicantId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Pings::Table).to_owned())
            .await
    }
}
