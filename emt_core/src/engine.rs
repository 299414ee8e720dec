use std::borrow::Cow;
use std::path::PathBuf;

use regex::Regex;
use tracing::debug;
use tracing::warn;

use crate::EmtError;
use crate::EmtResult;
use crate::config::EngineOptions;
use crate::document::LineTable;
use crate::document::SourceDocument;
use crate::loader::ReferenceOutcome;
use crate::loader::TemplateLoader;
use crate::pattern::FlavorPattern;
use crate::pattern::ReferenceOccurrence;

/// Kind of a non-fatal per-occurrence diagnostic. Oversize skips and
/// downgraded errors are distinct outcomes and stay distinct here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
	/// The referenced file exceeds the configured size ceiling.
	OversizeTemplate {
		path: PathBuf,
		size: u64,
		limit: u64,
	},
	/// A read or minify failure downgraded by `skip_errors`.
	SkippedError { message: String },
	/// The reference matched the configured `skip_templates` pattern.
	SkippedTemplate { reference: String },
}

/// A non-fatal diagnostic attached to one occurrence left untouched in the
/// output.
#[derive(Debug, Clone)]
pub struct EmbedDiagnostic {
	pub kind: DiagnosticKind,
	/// 1-indexed line of the occurrence's opening offset.
	pub line: usize,
	/// 1-indexed column of the occurrence's opening offset.
	pub column: usize,
}

impl EmbedDiagnostic {
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::OversizeTemplate { path, size, limit } => {
				format!(
					"template `{}` is {size} bytes (limit: {limit} bytes), leaving reference as is",
					path.display()
				)
			}
			DiagnosticKind::SkippedError { message } => message.clone(),
			DiagnosticKind::SkippedTemplate { reference } => {
				format!("template `{reference}` matches skip_templates, leaving reference as is")
			}
		}
	}
}

/// Result of processing one document.
#[derive(Debug)]
pub struct ProcessOutcome<'a> {
	/// The output text. Borrows the input unchanged when nothing was
	/// embedded.
	pub content: Cow<'a, str>,
	/// Number of references replaced.
	pub embedded: usize,
	/// Non-fatal diagnostics for occurrences left untouched.
	pub diagnostics: Vec<EmbedDiagnostic>,
}

impl ProcessOutcome<'_> {
	/// True when the output differs from the input document.
	pub fn changed(&self) -> bool {
		self.embedded > 0
	}
}

/// The resolver/splicer engine. Construction compiles the flavor pattern
/// and validates `skip_templates`; one engine may then process any number
/// of documents. Each run owns its own scan position and replacement list,
/// so distinct documents can be processed concurrently from a shared
/// engine.
#[derive(Debug)]
pub struct Engine {
	options: EngineOptions,
	pattern: FlavorPattern,
	skip_templates: Option<Regex>,
	loader: TemplateLoader,
}

impl Engine {
	pub fn new(options: EngineOptions) -> EmtResult<Self> {
		let pattern = FlavorPattern::compile(options.flavor)?;
		let skip_templates = match &options.skip_templates {
			Some(source) => {
				let regex = Regex::new(source).map_err(|e| {
					EmtError::SkipTemplatesPattern {
						pattern: source.clone(),
						reason: e.to_string(),
					}
				})?;
				Some(regex)
			}
			None => None,
		};
		let loader = TemplateLoader::new(
			options.max_size,
			options.template_encoding,
			options.minify.clone(),
		);

		Ok(Self {
			options,
			pattern,
			skip_templates,
			loader,
		})
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	/// Process one document: find every reference occurrence left to right,
	/// resolve each through the loader one at a time, and splice the
	/// accepted replacements into a new buffer. Occurrences are resolved
	/// strictly sequentially — each outcome is known before the next scan
	/// starts. Returns the input borrowed and unchanged when no occurrence
	/// was embedded.
	pub async fn process<'a>(&self, document: &'a SourceDocument) -> EmtResult<ProcessOutcome<'a>> {
		let text = document.content.as_str();
		let line_table = LineTable::new(text);
		let mut accepted: Vec<(ReferenceOccurrence, String)> = Vec::new();
		let mut diagnostics = Vec::new();
		let mut scan_pos = 0;

		while let Some(occurrence) = self.pattern.find_at(text, scan_pos) {
			// The pattern cannot produce an empty span, but the scan position
			// must strictly increase every iteration regardless.
			scan_pos = occurrence.span.end.max(occurrence.span.start + 1);

			if occurrence.skip_marker {
				debug!(
					reference = %occurrence.reference,
					"skip marker present, leaving reference as is"
				);
				continue;
			}

			if let Some(skip) = &self.skip_templates {
				if skip.is_match(&occurrence.reference) {
					let diagnostic = diagnostic_at(
						&line_table,
						&occurrence,
						DiagnosticKind::SkippedTemplate {
							reference: occurrence.reference.clone(),
						},
					);
					warn!("{}", diagnostic.message());
					diagnostics.push(diagnostic);
					continue;
				}
			}

			let absolute = self.resolve_reference(document, &occurrence.reference);
			match self.loader.resolve(&absolute, &self.pattern).await {
				ReferenceOutcome::Embedded { replacement } => {
					accepted.push((occurrence, replacement));
				}
				ReferenceOutcome::Ignored { path, size, limit } => {
					let diagnostic = diagnostic_at(
						&line_table,
						&occurrence,
						DiagnosticKind::OversizeTemplate { path, size, limit },
					);
					warn!("{}", diagnostic.message());
					diagnostics.push(diagnostic);
				}
				ReferenceOutcome::Failed(error) => {
					if self.options.skip_errors {
						let diagnostic = diagnostic_at(
							&line_table,
							&occurrence,
							DiagnosticKind::SkippedError {
								message: error.to_string(),
							},
						);
						warn!("{}", diagnostic.message());
						diagnostics.push(diagnostic);
					} else {
						// Fatal: abort the whole run, no partial output.
						return Err(error);
					}
				}
			}
		}

		Ok(assemble(text, accepted, diagnostics))
	}

	/// Join a reference against the effective base directory: the explicit
	/// `base_path` option when set, the document's own directory otherwise.
	/// Leading path separators are stripped so absolute-looking references
	/// stay under the base.
	fn resolve_reference(&self, document: &SourceDocument, reference: &str) -> PathBuf {
		let base = self
			.options
			.base_path
			.as_deref()
			.unwrap_or_else(|| document.dir());
		base.join(reference.trim_start_matches(['/', '\\']))
	}
}

/// Build the output by walking accepted occurrences in document order,
/// emitting each gap of original text followed by its replacement, then
/// the trailing remainder. Byte ranges outside the accepted spans are
/// reproduced verbatim. With no accepted occurrences the input is returned
/// borrowed, without allocating.
fn assemble<'a>(
	text: &'a str,
	accepted: Vec<(ReferenceOccurrence, String)>,
	diagnostics: Vec<EmbedDiagnostic>,
) -> ProcessOutcome<'a> {
	if accepted.is_empty() {
		return ProcessOutcome {
			content: Cow::Borrowed(text),
			embedded: 0,
			diagnostics,
		};
	}

	let removed: usize = accepted.iter().map(|(occurrence, _)| occurrence.span.len()).sum();
	let added: usize = accepted.iter().map(|(_, replacement)| replacement.len()).sum();
	let embedded = accepted.len();

	let mut output = String::with_capacity(text.len() - removed + added);
	let mut cursor = 0;
	for (occurrence, replacement) in accepted {
		output.push_str(&text[cursor..occurrence.span.start]);
		output.push_str(&replacement);
		cursor = occurrence.span.end;
	}
	output.push_str(&text[cursor..]);

	ProcessOutcome {
		content: Cow::Owned(output),
		embedded,
		diagnostics,
	}
}

fn diagnostic_at(
	line_table: &LineTable,
	occurrence: &ReferenceOccurrence,
	kind: DiagnosticKind,
) -> EmbedDiagnostic {
	let (line, column) = line_table.line_column(occurrence.span.start);
	EmbedDiagnostic { kind, line, column }
}
