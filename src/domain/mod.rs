//! Domain layer types and invariants.

pub mod comment;
pub mod error;
pub mod links;
pub mod pages;
pub mod slug;
pub mod symbols;
