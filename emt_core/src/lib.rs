//! `emt_core` is the core library for the [emt](https://github.com/emt-rs/emt) template embedder. It rewrites source text that references an external HTML template (`templateUrl: 'hello.html'`) into source text carrying the template inline as a string literal (`template:'<b>hi</b>'`), minifying and escaping the template content on the way and preserving every byte outside the matched spans.
//!
//! ## Processing Pipeline
//!
//! ```text
//! JS/TS source text
//!   → Flavor pattern (regex scan, left to right, non-overlapping)
//!   → Template loader (stat → read → decode → minify → escape → wrap)
//!   → Engine (records replacements, applies the error policy, splices output)
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Engine options, `emt.toml` loading, text encodings, and the minify pass-through configuration.
//! - [`escape`] — String-literal escaping for single-quoted embeds.
//! - [`minify`] — Wrapper around the HTML-minification collaborator.
//!
//! ## Key Types
//!
//! - [`Engine`] — The resolver/splicer. One instance processes any number of documents, each in a fully sequential run.
//! - [`SourceDocument`] — Immutable input text plus its filesystem path.
//! - [`ReferenceOccurrence`] — One matched declaration span with its extracted relative path.
//! - [`ReferenceOutcome`] — Tagged result of resolving one occurrence: embedded, ignored, or failed.
//! - [`ProcessOutcome`] — The (possibly unchanged) output text plus non-fatal diagnostics.
//! - [`EmtConfig`] — Configuration loaded from `emt.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use emt_core::Engine;
//! use emt_core::EngineOptions;
//! use emt_core::SourceDocument;
//!
//! # async fn demo() -> emt_core::EmtResult<()> {
//! let engine = Engine::new(EngineOptions::default())?;
//! let document = SourceDocument::new(
//! 	PathBuf::from("app/hello.component.js"),
//! 	"templateUrl: 'hello.html'".to_string(),
//! );
//! let outcome = engine.process(&document).await?;
//! if outcome.changed() {
//! 	println!("{}", outcome.content);
//! }
//! # Ok(())
//! # }
//! ```

pub use config::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use loader::*;
pub use pattern::*;

pub mod config;
mod document;
mod engine;
mod error;
pub mod escape;
mod loader;
pub mod minify;
mod pattern;

#[cfg(test)]
mod __tests;
