// Library for tests to access modules

pub mod accumulator;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod locator;
pub mod models;
pub mod retention;
pub mod routes;
pub mod snapshot_store;
pub mod usage_log;
