//! 内容表迁移
//!
//! 创建 content 表，存储上传文件和文本笔记：
//! - kind 区分 file / note
//! - expires_at 过期时间（必填）
//! - deleted_at 软删除标记

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Content::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Content::Id)
                            .string_len(16)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Content::Kind).string_len(8).not_null())
                    .col(ColumnDef::new(Content::Title).text().null())
                    .col(ColumnDef::new(Content::Filename).text().null())
                    .col(ColumnDef::new(Content::StoragePath).text().null())
                    .col(ColumnDef::new(Content::Size).big_integer().null())
                    .col(ColumnDef::new(Content::Body).text().null())
                    .col(
                        ColumnDef::new(Content::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Content::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Content::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Content::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 清理任务按过期时间扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_expires_at")
                    .table(Content::Table)
                    .col(Content::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_deleted_at")
                    .table(Content::Table)
                    .col(Content::DeletedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_kind")
                    .table(Content::Table)
                    .col(Content::Kind)
                    .to_owned(),
            )
            .await?;

        // 管理列表按创建时间倒序
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_created_at")
                    .table(Content::Table)
                    .col(Content::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Content::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Content {
    Table,
    Id,
    Kind,
    Title,
    Filename,
    StoragePath,
    Size,
    Body,
    CreatedAt,
    ExpiresAt,
    ViewCount,
    DeletedAt,
}
