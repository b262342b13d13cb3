pub mod banner;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod consts;
pub mod error;
pub mod events;
pub mod ledger;
pub mod market;
pub mod models;
pub mod settlement;
pub mod store;
pub mod users;
pub mod withdrawal;
pub mod workflow;
