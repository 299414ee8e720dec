use std::ops::Range;

use regex::Regex;
use serde::Deserialize;

use crate::EmtError;
use crate::EmtResult;

/// Plain flavor: `templateUrl: 'path.html'`, with the key optionally
/// quoted, arbitrary whitespace around the colon, and single, double, or
/// back quotes around the path. An optional `/*!*/` marker before the
/// opening quote opts the occurrence out of embedding.
const PLAIN_PATTERN: &str = r#"['"]?templateUrl['"]?\s*:\s*(/\*!\*/)?\s*['"`]([^'"`]+)['"`]"#;

/// Typed flavor: `templateUrl: string = 'path.html'` class fields.
const TYPED_PATTERN: &str =
	r#"['"]?templateUrl['"]?\s*:\s*string\s*=\s*(/\*!\*/)?\s*['"`]([^'"`]+)['"`]"#;

const PLAIN_PREFIX: &str = "template:'";
const TYPED_PREFIX: &str = "template:string='";
const EMBED_SUFFIX: &str = "'";

/// Which declaration grammar and replacement wrapper are active for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFlavor {
	/// Plain object-literal declarations (`templateUrl: '…'`).
	#[default]
	#[serde(alias = "js")]
	Plain,
	/// Typed class-field declarations (`templateUrl: string = '…'`).
	#[serde(alias = "ts")]
	Typed,
}

impl SourceFlavor {
	/// File extension scanned by default for this flavor.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Plain => "js",
			Self::Typed => "ts",
		}
	}
}

/// One matched reference-declaration span within a document. Transient:
/// created by the scan, consumed within the same run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceOccurrence {
	/// Byte range of the full matched span.
	pub span: Range<usize>,
	/// The extracted relative path between the quotes.
	pub reference: String,
	/// True when the `/*!*/` opt-out marker precedes the opening quote.
	pub skip_marker: bool,
}

/// A compiled pattern/wrapper pair. The pattern and the replacement
/// wrapper always travel together so a run can never mix grammars.
#[derive(Debug, Clone)]
pub struct FlavorPattern {
	flavor: SourceFlavor,
	regex: Regex,
	prefix: &'static str,
}

impl FlavorPattern {
	pub fn compile(flavor: SourceFlavor) -> EmtResult<Self> {
		let (source, prefix) = match flavor {
			SourceFlavor::Plain => (PLAIN_PATTERN, PLAIN_PREFIX),
			SourceFlavor::Typed => (TYPED_PATTERN, TYPED_PREFIX),
		};
		let regex = Regex::new(source).map_err(|e| EmtError::Pattern(e.to_string()))?;

		Ok(Self {
			flavor,
			regex,
			prefix,
		})
	}

	pub fn flavor(&self) -> SourceFlavor {
		self.flavor
	}

	/// Find the next occurrence at or after byte offset `from`. Matches are
	/// discovered strictly left to right; the caller owns the scan position.
	pub fn find_at(&self, text: &str, from: usize) -> Option<ReferenceOccurrence> {
		let caps = self.regex.captures_at(text, from)?;
		let full = caps.get(0)?;
		let reference = caps.get(2)?.as_str().to_string();

		Some(ReferenceOccurrence {
			span: full.range(),
			reference,
			skip_marker: caps.get(1).is_some(),
		})
	}

	/// Wrap escaped template text with the flavor's fixed prefix and suffix.
	pub fn wrap(&self, escaped: &str) -> String {
		format!("{}{escaped}{EMBED_SUFFIX}", self.prefix)
	}
}
