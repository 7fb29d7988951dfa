//! Terminal time tracker. Tasks are logged against DAS categories, timed by a small daemon and
//! exported as spreadsheets, CSV, calendars or JSON backups.
//!

pub mod cli;
pub mod daemon;
pub mod export;
pub mod fs;
pub mod report;
pub mod store;
pub mod tracker;
pub mod utils;
