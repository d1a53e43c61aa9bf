// FICHIER : migra/src/json_db/mod.rs

pub mod collections;
pub mod migrations;
pub mod schema;
pub mod storage;
pub mod transactions;
