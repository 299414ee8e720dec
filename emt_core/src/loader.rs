use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::EmtError;
use crate::config::TextEncoding;
use crate::escape::escape_single_quoted;
use crate::minify;
use crate::minify::MinifyOptions;
use crate::pattern::FlavorPattern;

/// Tagged result of resolving one reference occurrence. Produced by the
/// loader, consumed by the engine.
#[derive(Debug)]
pub enum ReferenceOutcome {
	/// The template was loaded and the occurrence should be replaced.
	Embedded {
		/// Full replacement text including the wrapper prefix and suffix.
		replacement: String,
	},
	/// The template exceeds the size ceiling; the occurrence stays as is.
	Ignored { path: PathBuf, size: u64, limit: u64 },
	/// Reading or minifying the template failed.
	Failed(EmtError),
}

/// Resolves one template path to ready-to-splice literal text: size check,
/// read, decode, minify, escape, wrap. Every call is independent and
/// side-effect-free beyond the read; the loader holds only immutable
/// configuration and never retries.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
	max_size: Option<u64>,
	encoding: TextEncoding,
	minify: MinifyOptions,
}

impl TemplateLoader {
	pub fn new(max_size: Option<u64>, encoding: TextEncoding, minify: MinifyOptions) -> Self {
		Self {
			max_size,
			encoding,
			minify,
		}
	}

	/// Resolve `path` to a [`ReferenceOutcome`]. All failure modes are
	/// reported through the returned outcome rather than an `Err`, so the
	/// engine alone decides the error policy.
	pub async fn resolve(&self, path: &Path, wrapper: &FlavorPattern) -> ReferenceOutcome {
		if let Some(limit) = self.max_size {
			let size = match tokio::fs::metadata(path).await {
				Ok(metadata) => metadata.len(),
				Err(e) => return read_failure(path, &e),
			};

			// Oversize templates are skipped before any content is read.
			if size > limit {
				return ReferenceOutcome::Ignored {
					path: path.to_path_buf(),
					size,
					limit,
				};
			}
		}

		let bytes = match tokio::fs::read(path).await {
			Ok(bytes) => bytes,
			Err(e) => return read_failure(path, &e),
		};
		let content = match self.encoding.decode(bytes) {
			Ok(content) => content,
			Err(e) => return read_failure(path, &e),
		};

		let minified = match minify::minify(&content, &self.minify) {
			Ok(minified) => minified,
			Err(e) => {
				return ReferenceOutcome::Failed(EmtError::TemplateMinify {
					path: path.display().to_string(),
					cause: e.to_string(),
				});
			}
		};

		debug!(
			path = %path.display(),
			raw = content.len(),
			minified = minified.len(),
			"loaded template"
		);

		ReferenceOutcome::Embedded {
			replacement: wrapper.wrap(&escape_single_quoted(&minified)),
		}
	}
}

fn read_failure(path: &Path, cause: &dyn std::fmt::Display) -> ReferenceOutcome {
	ReferenceOutcome::Failed(EmtError::TemplateRead {
		path: path.display().to_string(),
		cause: cause.to_string(),
	})
}
