//! Card import library.
//!
//! Turns batches of named image files into cards of a collection, publishing
//! the images to object storage and the cards to PostgreSQL.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod migration;
pub mod models;
pub mod services;
