//! docweave: an incremental documentation compiler.
//!
//! A build ingests a manifest of comments, symbols and pages into the
//! [`application::store::SymbolStore`], resolves cross-references through the
//! [`application::links::LinkResolver`], renders every page with the
//! [`application::render::Formatter`] and writes the post-processed HTML.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
