pub mod config;
pub mod detail;
pub mod error;
pub mod harness;
pub mod listing;
pub mod model;
pub mod navigate;
pub mod normalize;
pub mod notify;
pub mod outline;
pub mod pipeline;
pub mod recorder;
pub mod store;
pub mod upsert;
