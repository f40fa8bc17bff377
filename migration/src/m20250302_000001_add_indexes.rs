use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_gigs_table::Gigs;
use super::m20250301_000003_create_pings_table::Pings;
use super::m20250301_000004_create_activities_table::Activities;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[&str] = &[
    "idx_gigs_created_by",
    "idx_gigs_status_expires_at",
    "idx_gigs_created_at",
    "idx_pings_applicant_id",
    "idx_activities_expires_at",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Owner listing
        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_created_by")
                    .table(Gigs::Table)
                    .col(Gigs::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // Public listing filter and the expiry sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_status_expires_at")
                    .table(Gigs::Table)
                    .col(Gigs::Status)
                    .col(Gigs::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_created_at")
                    .table(Gigs::Table)
                    .col(Gigs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // "My pings"
        manager
            .create_index(
                Index::create()
                    .name("idx_pings_applicant_id")
                    .table(Pings::Table)
                    .col(Pings::ApplicantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activities_expires_at")
                    .table(Activities::Table)
                    .col(Activities::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
