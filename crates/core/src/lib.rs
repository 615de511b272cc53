//! Core business logic for costs.
//!
//! This crate contains the ledger engine with ZERO web or database dependencies.
//! Storage is reached through the [`ledger::LedgerStore`] traits, implemented
//! in memory here and over SQL in `costs-db`.
//!
//! # Modules
//!
//! - `ledger` - Account types, transaction rules, balance mutation and summaries

pub mod ledger;
