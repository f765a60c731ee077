pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod model;
pub mod openrgb;
pub mod output;
pub mod state;
pub mod tracker;
