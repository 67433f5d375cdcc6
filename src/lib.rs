// unifi-filter-sync: content-filter block lists <-> local text files
// Exposes the controller client and sync workflows as a library

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod filter_file;
pub mod filters;
pub mod session;
