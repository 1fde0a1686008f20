//! Handlers 模块

pub mod health;
pub mod metrics;

pub use health::*;
pub use metrics::*;
