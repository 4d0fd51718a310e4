pub mod account_service;
pub mod seed_service;

pub use account_service::{AccountError, AccountService, NewAccount};
pub use seed_service::{SeedService, SeedSummary};
