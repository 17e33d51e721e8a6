//! wistia-extract - find the Wistia video ID behind a page URL.
//!
//! Recognises Wistia embed URLs directly, otherwise fetches the page (after an
//! optional site login) through one of several transport strategies and scans
//! the markup for the embed.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod server;

pub use error::{ExtractError, Result};
pub use pipeline::{ExtractRequest, ExtractionResult, Pipeline};
