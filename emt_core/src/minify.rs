//! Wrapper around the HTML-minification collaborator.

use minify_html::Cfg;
use serde::Deserialize;
use thiserror::Error;

/// Error raised by the minification step.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MinifyError(pub String);

/// Pass-through configuration for the HTML minifier.
#[derive(Debug, Clone, Deserialize)]
pub struct MinifyOptions {
	/// When false the template text passes through unmodified.
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	/// Keep HTML comments in the minified output.
	#[serde(default)]
	pub keep_comments: bool,
	/// Keep closing tags HTML allows to be omitted.
	#[serde(default)]
	pub keep_closing_tags: bool,
	/// Keep `<html>` and `<head>` opening tags.
	#[serde(default)]
	pub keep_html_and_head_opening_tags: bool,
	/// Minify the content of `<style>` tags and `style` attributes.
	#[serde(default)]
	pub minify_css: bool,
	/// Minify the content of `<script>` tags.
	#[serde(default)]
	pub minify_js: bool,
}

fn default_enabled() -> bool {
	true
}

impl Default for MinifyOptions {
	fn default() -> Self {
		Self {
			enabled: true,
			keep_comments: false,
			keep_closing_tags: false,
			keep_html_and_head_opening_tags: false,
			minify_css: false,
			minify_js: false,
		}
	}
}

/// Minify template content according to `options`. With `enabled = false`
/// this is the identity transform.
pub fn minify(content: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
	if !options.enabled {
		return Ok(content.to_string());
	}

	let mut cfg = Cfg::new();
	cfg.keep_comments = options.keep_comments;
	cfg.keep_closing_tags = options.keep_closing_tags;
	cfg.keep_html_and_head_opening_tags = options.keep_html_and_head_opening_tags;
	cfg.minify_css = options.minify_css;
	cfg.minify_js = options.minify_js;

	let minified = minify_html::minify(content.as_bytes(), &cfg);
	String::from_utf8(minified).map_err(|e| MinifyError(e.to_string()))
}
