//! Askama views rendered by the page formatter.

pub mod views;
