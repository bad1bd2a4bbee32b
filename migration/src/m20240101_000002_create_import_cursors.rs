use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create import_cursors table, one row per tracked user
        manager
            .create_table(
                Table::create()
                    .table(ImportCursors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportCursors::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ImportCursors::Backfilling)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ImportCursors::MaxId).big_integer())
                    .col(ColumnDef::new(ImportCursors::SinceId).big_integer())
                    .col(
                        ColumnDef::new(ImportCursors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ImportCursors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ImportCursors {
    Table,
    Username,
    Backfilling,
    MaxId,
    SinceId,
    UpdatedAt,
}
