//! # sessionlens-core
//!
//! Core library for sessionlens - a local dashboard over AI coding
//! assistant session logs.
//!
//! This library provides:
//! - Parsers for the JSONL transcript format (bounded summary and full
//!   streaming detail)
//! - Project/session discovery with liveness detection
//! - Cost estimation, pagination/filtering, and heatmap analytics
//! - An mtime-keyed disk cache for derived artifacts
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows scanner → parsers → analytics: the scanner discovers
//! transcripts and builds cheap summaries, the detail parser streams a
//! whole transcript once, and the analytics layer derives the views the
//! dashboard renders. The disk cache sits transparently between the
//! parsers and their callers, keyed by source mtime.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sessionlens_core::{Config, DashboardService};
//! use sessionlens_core::analytics::SessionQuery;
//!
//! let config = Config::load().expect("failed to load config");
//! let service = DashboardService::new(config);
//! let page = service
//!     .session_list(&SessionQuery { page: 1, page_size: 20, ..Default::default() })
//!     .expect("scan failed");
//! for session in &page.sessions {
//!     println!("{} ({})", session.session_id, session.project_name);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use service::DashboardService;
pub use types::*;

// Public modules
pub mod analytics;
pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod format;
pub mod logging;
pub mod parsers;
pub mod paths;
pub mod scanner;
pub mod service;
pub mod settings;
pub mod types;
