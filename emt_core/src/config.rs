use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::EmtError;
use crate::EmtResult;
use crate::minify::MinifyOptions;
use crate::pattern::SourceFlavor;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["emt.toml", ".emt.toml", ".config/emt.toml"];

/// Error produced when file bytes are not valid in the configured encoding.
#[derive(Debug, Error)]
#[error("file content is not valid {encoding}")]
pub struct DecodeError {
	encoding: &'static str,
}

/// Text encoding used to decode input documents and template files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
	/// Strict UTF-8. Invalid byte sequences are a read error.
	#[default]
	#[serde(alias = "utf-8")]
	Utf8,
	/// UTF-8 with invalid sequences replaced by U+FFFD.
	#[serde(alias = "utf-8-lossy")]
	Utf8Lossy,
	/// ISO-8859-1. Every byte maps to the code point of the same value.
	#[serde(alias = "iso-8859-1")]
	Latin1,
}

impl TextEncoding {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Utf8 => "utf8",
			Self::Utf8Lossy => "utf8-lossy",
			Self::Latin1 => "latin1",
		}
	}

	/// Decode raw file bytes into text.
	pub fn decode(&self, bytes: Vec<u8>) -> Result<String, DecodeError> {
		match self {
			Self::Utf8 => {
				String::from_utf8(bytes).map_err(|_| {
					DecodeError {
						encoding: self.name(),
					}
				})
			}
			Self::Utf8Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
			Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
		}
	}
}

/// Options for one [`Engine`](crate::Engine) instance. Resolved once at
/// construction and immutable for every subsequent run.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
	/// Overrides the per-document base directory for resolving references.
	pub base_path: Option<PathBuf>,
	/// Templates larger than this many bytes are ignored rather than
	/// embedded.
	pub max_size: Option<u64>,
	/// Downgrade read/minify failures to diagnostics and keep scanning.
	pub skip_errors: bool,
	/// Declaration grammar and replacement wrapper to use.
	pub flavor: SourceFlavor,
	/// Encoding of input documents.
	pub js_encoding: TextEncoding,
	/// Encoding of referenced template files.
	pub template_encoding: TextEncoding,
	/// Pass-through configuration for the HTML minifier.
	pub minify: MinifyOptions,
	/// References matching this regular expression are left untouched.
	pub skip_templates: Option<String>,
}

/// Exclusion configuration using gitignore-style patterns, applied on top
/// of `.gitignore` rules during file discovery.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Configuration loaded from an `emt.toml` file.
///
/// ```toml
/// base_path = "src/app"
/// max_size = 100000
/// skip_errors = false
/// flavor = "typed"
/// skip_templates = '-large\.html$'
///
/// [minify]
/// keep_comments = true
///
/// [exclude]
/// patterns = ["vendor/", "*.spec.js"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct EmtConfig {
	/// Base directory for resolving template references, relative to the
	/// project root unless absolute.
	pub base_path: Option<PathBuf>,
	/// Maximum template size in bytes to embed.
	pub max_size: Option<u64>,
	/// Log and skip unreadable or unminifiable templates instead of
	/// failing.
	#[serde(default)]
	pub skip_errors: bool,
	/// Declaration grammar to scan for.
	#[serde(default)]
	pub flavor: SourceFlavor,
	/// Encoding of input source files.
	#[serde(default)]
	pub js_encoding: TextEncoding,
	/// Encoding of referenced template files.
	#[serde(default)]
	pub template_encoding: TextEncoding,
	/// HTML minifier configuration.
	#[serde(default)]
	pub minify: MinifyOptions,
	/// References matching this regular expression are left untouched.
	pub skip_templates: Option<String>,
	/// File discovery exclusions.
	#[serde(default)]
	pub exclude: ExcludeConfig,
}

impl EmtConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> EmtResult<Option<EmtConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: EmtConfig =
			toml::from_str(&content).map_err(|e| EmtError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Engine options derived from this config. A relative `base_path` is
	/// resolved against `root`.
	pub fn engine_options(&self, root: &Path) -> EngineOptions {
		let base_path = self.base_path.as_ref().map(|base| {
			if base.is_absolute() {
				base.clone()
			} else {
				root.join(base)
			}
		});

		EngineOptions {
			base_path,
			max_size: self.max_size,
			skip_errors: self.skip_errors,
			flavor: self.flavor,
			js_encoding: self.js_encoding,
			template_encoding: self.template_encoding,
			minify: self.minify.clone(),
			skip_templates: self.skip_templates.clone(),
		}
	}
}
