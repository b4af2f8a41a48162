pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod error;
pub mod input;
pub mod money;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod records;
