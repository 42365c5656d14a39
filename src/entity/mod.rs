//! SeaORM entity definitions for PostgreSQL database.

pub mod card;
pub mod collection;
