pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod output;
pub mod pool;
pub mod random;
pub mod state;
pub mod stats;
