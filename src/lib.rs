// src/lib.rs
pub mod auth;
pub mod browser;
pub mod config;
pub mod credentials;
pub mod display;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod navigator;
pub mod orchestrator;
pub mod paginator;
pub mod session;
pub mod spider;
pub mod tagger;

pub use error::{Result, SpiderError};
