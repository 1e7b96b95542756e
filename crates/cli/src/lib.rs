//! Command-line front end for the tool crib ledger.
//!
//! Stands in for the dashboard page: it resolves arguments, drives the
//! ledger, and prints the semantic records as JSON.

pub mod config;
pub mod sample;
pub mod store;
