//! The catfetch page: two controls and one output region.
//!
//! [`page::Page::mount`] is the startup routine; [`cli`] turns command-line
//! flags and the loaded configuration into the settings `main` runs with.
pub mod cli;
pub mod page;

pub use page::{Control, Page};
