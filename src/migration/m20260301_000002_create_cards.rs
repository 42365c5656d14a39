//! Migration: Create cards table.
//!
//! Card IDs are assigned by the import pipeline (max + 1), so the primary key
//! is a plain BIGINT rather than a sequence.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE cards (
                    id BIGINT PRIMARY KEY,
                    name VARCHAR(200) NOT NULL,
                    level INTEGER NOT NULL
                        CHECK (level >= 1 AND level <= 5),
                    animated BOOLEAN NOT NULL DEFAULT FALSE,
                    image_ext VARCHAR(8) NOT NULL DEFAULT 'jpg'
                        CHECK (image_ext IN ('jpg', 'jpeg', 'png', 'gif')),
                    col_id VARCHAR(100) NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                    tags JSONB NOT NULL DEFAULT '[]'::jsonb,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- One card per collection + name + level
                CREATE UNIQUE INDEX idx_cards_collection_name_level
                    ON cards(col_id, LOWER(name), level);

                -- Name lookup for existing-card checks
                CREATE INDEX idx_cards_lower_name ON cards(LOWER(name));

                CREATE INDEX idx_cards_col_id ON cards(col_id);

                CREATE TRIGGER update_cards_updated_at
                    BEFORE UPDATE ON cards
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_cards_updated_at ON cards;
                DROP TABLE IF EXISTS cards CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
