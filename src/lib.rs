pub mod aggregator;
pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
