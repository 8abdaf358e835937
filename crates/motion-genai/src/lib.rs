//! Client for the hosted Gemini image models.
//!
//! This crate provides:
//! - The [`ImageModel`] trait the studio orchestrators call
//! - A `generateContent` client for frame generation and upscaling
//! - Prompt construction for both request kinds

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{FrameRequest, GeminiImageClient, ImageModel, UpscaleRequest};
pub use config::GenAiConfig;
pub use error::{GenAiError, GenAiResult};
