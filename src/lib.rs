pub mod api;
pub mod backtest;
pub mod config;
pub mod data;
pub mod scanner;
pub mod storage;
pub mod strategy;
pub mod web;

pub use config::Config;
