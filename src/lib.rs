pub mod cancel;
pub mod config;
pub mod error;
pub mod ink;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod tuning;
