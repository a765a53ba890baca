//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod error;
pub mod manifest;
pub mod output;
pub mod records;
pub mod telemetry;
