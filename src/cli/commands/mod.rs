pub mod accounts;
pub mod database;
