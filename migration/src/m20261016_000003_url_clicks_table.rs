//! 点击记录表迁移
//!
//! 只追加写入，随短链接级联删除

use sea_orm_migration::prelude::*;

use crate::m20261016_000002_shortened_urls_table::ShortenedUrls;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UrlClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UrlClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UrlClicks::UrlId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UrlClicks::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UrlClicks::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(UrlClicks::UserAgent).text().null())
                    .col(ColumnDef::new(UrlClicks::Referrer).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_url_clicks_url_id")
                            .from(UrlClicks::Table, UrlClicks::UrlId)
                            .to(ShortenedUrls::Table, ShortenedUrls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 单链接最近点击查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_url_clicks_url_time")
                    .table(UrlClicks::Table)
                    .col(UrlClicks::UrlId)
                    .col(UrlClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UrlClicks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UrlClicks {
    Table,
    Id,
    UrlId,
    ClickedAt,
    IpAddress,
    UserAgent,
    Referrer,
}
