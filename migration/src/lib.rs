pub use sea_orm_migration::prelude::*;

mod m20261016_000001_content_table;
mod m20261016_000002_shortened_urls_table;
mod m20261016_000003_url_clicks_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_content_table::Migration),
            Box::new(m20261016_000002_shortened_urls_table::Migration),
            Box::new(m20261016_000003_url_clicks_table::Migration),
        ]
    }
}
