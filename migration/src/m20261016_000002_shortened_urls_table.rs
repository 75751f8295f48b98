//! 短链接表迁移
//!
//! short_code 唯一，软删除后也不会复用

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortenedUrls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortenedUrls::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShortenedUrls::ShortCode)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ShortenedUrls::OriginalUrl).text().not_null())
                    .col(
                        ColumnDef::new(ShortenedUrls::CustomAlias)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShortenedUrls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortenedUrls::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShortenedUrls::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortenedUrls::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortened_urls_expires_at")
                    .table(ShortenedUrls::Table)
                    .col(ShortenedUrls::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortened_urls_deleted_at")
                    .table(ShortenedUrls::Table)
                    .col(ShortenedUrls::DeletedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShortenedUrls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ShortenedUrls {
    Table,
    Id,
    ShortCode,
    OriginalUrl,
    CustomAlias,
    CreatedAt,
    ExpiresAt,
    ClickCount,
    DeletedAt,
}
