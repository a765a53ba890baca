//! Application layer: the symbol store, link resolution, rendering and the
//! build that ties them together.

pub mod build;
pub mod diagnostics;
pub mod error;
pub mod links;
pub mod observers;
pub mod records;
pub mod render;
pub mod store;
