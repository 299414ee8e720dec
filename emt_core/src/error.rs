use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum EmtError {
	#[error(transparent)]
	#[diagnostic(code(emt::io_error))]
	Io(#[from] std::io::Error),

	#[error("Can't read template file: {path}. Error details: {cause}")]
	#[diagnostic(
		code(emt::template_read),
		help("check that the templateUrl value resolves against the base directory")
	)]
	TemplateRead { path: String, cause: String },

	#[error("Error while minifying template {path}. Error from minifier: {cause}")]
	#[diagnostic(code(emt::template_minify))]
	TemplateMinify { path: String, cause: String },

	#[error("can't decode `{path}` as {encoding}")]
	#[diagnostic(
		code(emt::decode),
		help("set `js_encoding` / `template_encoding` in emt.toml to match the file's encoding")
	)]
	Decode {
		path: String,
		encoding: &'static str,
	},

	#[error("invalid reference pattern: {0}")]
	#[diagnostic(code(emt::pattern))]
	Pattern(String),

	#[error("invalid skip_templates pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(emt::skip_templates_pattern),
		help("the value must be a valid regular expression")
	)]
	SkipTemplatesPattern { pattern: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(emt::config_parse),
		help("check that emt.toml is valid TOML with optional [minify] and [exclude] sections")
	)]
	ConfigParse(String),
}

pub type EmtResult<T> = Result<T, EmtError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
