use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
pub enum Activities {
    Table,
    Id,
    Kind,
    ActorId,
    ActorName,
    GigId,
    GigTitle,
    CreatedAt,
    ExpiresAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign keys: the feed keeps denormalized names after deletions.
        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activities::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Activities::Kind).string().not_null())
                    .col(ColumnDef::new(Activities::ActorId).uuid().not_null())
                    .col(ColumnDef::new(Activities::ActorName).string().not_null())
                    .col(ColumnDef::new(Activities::GigId).uuid().not_null())
                    .col(ColumnDef::new(Activities::GigTitle).string().not_null())
                    .col(
                        ColumnDef::new(Activities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Activities::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await
    }
}
