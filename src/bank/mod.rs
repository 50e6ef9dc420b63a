//! The remote bank data feed: wire types, REST client, spoken replies.

mod client;
mod models;
pub mod reply;

pub use client::{BankClient, BankError};
pub use models::{AccountRecord, TransactionRecord};
