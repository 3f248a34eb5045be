//! Backend for the Falista mobile app - turns a photo into a daily fortune
//!
//! Receives an image with optional context, asks a multimodal text-generation
//! provider for a fortune, and normalizes whatever reply shape comes back into
//! a payload the mobile client can always render.

pub mod ai;
pub mod app;
pub mod error;
pub mod fortune;
pub mod models;
pub mod prompts;
pub mod server;

pub use error::{Error, Result};
