use std::borrow::Cow;
use std::path::Path;
use std::path::PathBuf;

use rstest::rstest;
use similar_asserts::assert_eq;

use super::*;
use crate::escape::escape_single_quoted;
use crate::minify;
use crate::minify::MinifyOptions;

fn no_minify() -> MinifyOptions {
	MinifyOptions {
		enabled: false,
		..MinifyOptions::default()
	}
}

/// Engine resolving references against each document's own directory, with
/// minification disabled so embeds are byte-exact.
fn plain_engine() -> Engine {
	Engine::new(EngineOptions {
		minify: no_minify(),
		..EngineOptions::default()
	})
	.expect("engine options are valid")
}

fn document_in(dir: &Path, content: &str) -> SourceDocument {
	SourceDocument::new(dir.join("fake.js"), content.to_string())
}

#[tokio::test]
async fn passes_through_document_without_references() -> AnyEmptyResult {
	let engine = plain_engine();
	let input = "var component = { selector: 'app', template: '<b>inline</b>' };";
	let document = SourceDocument::new(PathBuf::from("fake.js"), input.to_string());

	let outcome = engine.process(&document).await?;
	assert!(matches!(outcome.content, Cow::Borrowed(_)));
	assert_eq!(outcome.content, input);
	assert_eq!(outcome.embedded, 0);
	assert!(outcome.diagnostics.is_empty());
	assert!(!outcome.changed());

	Ok(())
}

#[rstest]
#[case::single_quotes("templateUrl: 'template.html'")]
#[case::double_quotes("templateUrl: \"template.html\"")]
#[case::back_quotes("templateUrl: `template.html`")]
#[case::single_quoted_key("'templateUrl': 'template.html'")]
#[case::double_quoted_key("\"templateUrl\": 'template.html'")]
#[case::spread_whitespace("\"templateUrl\" \t\r\n:\r\n\t  'template.html'")]
#[tokio::test]
async fn embeds_quote_and_whitespace_variants(#[case] input: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("template.html"), "<strong>Hello World!</strong>")?;

	let engine = plain_engine();
	let document = document_in(tmp.path(), input);

	let outcome = engine.process(&document).await?;
	assert_eq!(outcome.content, "template:'<strong>Hello World!</strong>'");
	assert_eq!(outcome.embedded, 1);

	Ok(())
}

#[tokio::test]
async fn resolves_occurrences_left_to_right() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("t1.html"), "<h1>C1</h1>")?;
	std::fs::write(tmp.path().join("t2.html"), "<h2>C2</h2>")?;

	let engine = plain_engine();
	let document = document_in(
		tmp.path(),
		"{a:{templateUrl:'t1.html'},b:{templateUrl:'t2.html'}}",
	);

	let outcome = engine.process(&document).await?;
	assert_eq!(
		outcome.content,
		"{a:{template:'<h1>C1</h1>'},b:{template:'<h2>C2</h2>'}}"
	);
	assert_eq!(outcome.embedded, 2);

	Ok(())
}

#[tokio::test]
async fn embeds_with_the_default_minifier() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("template.html"), "<b>x</b><!-- build note -->")?;

	let engine = Engine::new(EngineOptions::default())?;
	let document = document_in(tmp.path(), "templateUrl: 'template.html'");

	let outcome = engine.process(&document).await?;
	assert_eq!(outcome.content, "template:'<b>x</b>'");

	Ok(())
}

#[tokio::test]
async fn escapes_template_content_for_single_quotes() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("template.html"), "a'b\nc\\d")?;

	let engine = plain_engine();
	let document = document_in(tmp.path(), "templateUrl: 'template.html'");

	let outcome = engine.process(&document).await?;
	assert_eq!(outcome.content, "template:'a\\'b\\nc\\\\d'");

	Ok(())
}

#[tokio::test]
async fn oversize_template_is_left_untouched_and_never_read() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	// Invalid UTF-8 sentinel: strict decoding would fail, so a clean run
	// proves the content was never read.
	let sentinel = b"\xff\xfe oversize sentinel bytes";
	std::fs::write(tmp.path().join("big.html"), sentinel)?;

	let engine = Engine::new(EngineOptions {
		max_size: Some(8),
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	let input = "templateUrl: 'big.html'";
	let document = document_in(tmp.path(), input);

	let outcome = engine.process(&document).await?;
	assert!(matches!(outcome.content, Cow::Borrowed(_)));
	assert_eq!(outcome.content, input);
	assert_eq!(outcome.embedded, 0);
	assert_eq!(outcome.diagnostics.len(), 1);
	assert!(matches!(
		&outcome.diagnostics[0].kind,
		DiagnosticKind::OversizeTemplate { size, limit, .. }
			if *size == sentinel.len() as u64 && *limit == 8
	));

	Ok(())
}

#[tokio::test]
async fn missing_template_aborts_the_run_by_default() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let engine = plain_engine();
	let document = document_in(tmp.path(), "templateUrl: 'not-existing-template.html'");

	let error = engine
		.process(&document)
		.await
		.expect_err("missing template is fatal");
	assert!(error.to_string().starts_with("Can't read template file"));

	Ok(())
}

#[tokio::test]
async fn skip_errors_keeps_scanning_past_failures() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("one.html"), "<h1>One</h1>")?;
	std::fs::write(tmp.path().join("three.html"), "<h3>Three</h3>")?;

	let engine = Engine::new(EngineOptions {
		skip_errors: true,
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	let document = document_in(
		tmp.path(),
		"a(templateUrl: 'one.html') b(templateUrl: 'missing.html') c(templateUrl: 'three.html')",
	);

	let outcome = engine.process(&document).await?;
	assert_eq!(
		outcome.content,
		"a(template:'<h1>One</h1>') b(templateUrl: 'missing.html') c(template:'<h3>Three</h3>')"
	);
	assert_eq!(outcome.embedded, 2);
	assert_eq!(outcome.diagnostics.len(), 1);
	assert!(matches!(
		&outcome.diagnostics[0].kind,
		DiagnosticKind::SkippedError { message } if message.starts_with("Can't read template file")
	));

	Ok(())
}

#[tokio::test]
async fn typed_declarations_require_the_typed_flavor() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("component.html"), "<p>T</p>")?;
	let input = "templateUrl: string = \"component.html\"";

	// Plain flavor leaves the typed declaration untouched.
	let plain = plain_engine();
	let plain_document = document_in(tmp.path(), input);
	let outcome = plain.process(&plain_document).await?;
	assert!(matches!(outcome.content, Cow::Borrowed(_)));
	assert_eq!(outcome.content, input);

	// Typed flavor embeds it with the typed wrapper.
	let typed = Engine::new(EngineOptions {
		flavor: SourceFlavor::Typed,
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	let typed_document = document_in(tmp.path(), input);
	let outcome = typed.process(&typed_document).await?;
	assert_eq!(outcome.content, "template:string='<p>T</p>'");

	Ok(())
}

#[tokio::test]
async fn explicit_base_path_overrides_the_document_directory() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir(tmp.path().join("sub"))?;
	std::fs::write(tmp.path().join("sub").join("t.html"), "<i>base</i>")?;

	let engine = Engine::new(EngineOptions {
		base_path: Some(tmp.path().to_path_buf()),
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	// The document lives somewhere else entirely; the leading separator
	// keeps the reference under the configured base.
	let document = SourceDocument::new(
		PathBuf::from("elsewhere/fake.js"),
		"templateUrl: '/sub/t.html'".to_string(),
	);

	let outcome = engine.process(&document).await?;
	assert_eq!(outcome.content, "template:'<i>base</i>'");

	Ok(())
}

#[tokio::test]
async fn skip_marker_opts_one_occurrence_out() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("one.html"), "<h1>One</h1>")?;
	std::fs::write(tmp.path().join("three.html"), "<h3>Three</h3>")?;
	// two.html deliberately does not exist: the marker must prevent any
	// read attempt, not just the replacement.

	let engine = plain_engine();
	let document = document_in(
		tmp.path(),
		"a(templateUrl: 'one.html') b(templateUrl: /*!*/'two.html') c(templateUrl: 'three.html')",
	);

	let outcome = engine.process(&document).await?;
	assert_eq!(
		outcome.content,
		"a(template:'<h1>One</h1>') b(templateUrl: /*!*/'two.html') c(template:'<h3>Three</h3>')"
	);
	assert_eq!(outcome.embedded, 2);
	assert!(outcome.diagnostics.is_empty());

	Ok(())
}

#[tokio::test]
async fn skip_templates_pattern_leaves_matching_references() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("small.html"), "<s>ok</s>")?;

	let engine = Engine::new(EngineOptions {
		skip_templates: Some(r"-large\.html$".to_string()),
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	let document = document_in(
		tmp.path(),
		"templateUrl: 'small.html'; templateUrl: 'listing-large.html'",
	);

	let outcome = engine.process(&document).await?;
	assert_eq!(
		outcome.content,
		"template:'<s>ok</s>'; templateUrl: 'listing-large.html'"
	);
	assert_eq!(outcome.diagnostics.len(), 1);
	assert!(matches!(
		&outcome.diagnostics[0].kind,
		DiagnosticKind::SkippedTemplate { reference } if reference == "listing-large.html"
	));

	Ok(())
}

#[test]
fn invalid_skip_templates_pattern_fails_construction() {
	let result = Engine::new(EngineOptions {
		skip_templates: Some("[".to_string()),
		..EngineOptions::default()
	});
	assert!(matches!(
		result,
		Err(EmtError::SkipTemplatesPattern { .. })
	));
}

#[tokio::test]
async fn diagnostics_carry_the_occurrence_position() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let engine = Engine::new(EngineOptions {
		skip_errors: true,
		minify: no_minify(),
		..EngineOptions::default()
	})?;
	let document = document_in(tmp.path(), "line one\n  templateUrl: 'missing.html'\n");

	let outcome = engine.process(&document).await?;
	assert_eq!(outcome.diagnostics.len(), 1);
	assert_eq!(outcome.diagnostics[0].line, 2);
	assert_eq!(outcome.diagnostics[0].column, 3);

	Ok(())
}

#[rstest]
#[case::single_quotes("templateUrl: 'a.html'", "a.html")]
#[case::double_quotes("templateUrl: \"a.html\"", "a.html")]
#[case::back_quotes("templateUrl: `a.html`", "a.html")]
#[case::quoted_key("'templateUrl': 'deep/nested.html'", "deep/nested.html")]
fn plain_pattern_extracts_the_reference(#[case] input: &str, #[case] expected: &str) {
	let pattern = FlavorPattern::compile(SourceFlavor::Plain).expect("pattern compiles");
	let occurrence = pattern.find_at(input, 0).expect("input matches");
	assert_eq!(occurrence.reference, expected);
	assert_eq!(occurrence.span, 0..input.len());
	assert!(!occurrence.skip_marker);
}

#[test]
fn pattern_scan_resumes_after_a_span() {
	let pattern = FlavorPattern::compile(SourceFlavor::Plain).expect("pattern compiles");
	let input = "templateUrl: 'a.html' templateUrl: 'b.html'";

	let first = pattern.find_at(input, 0).expect("first match");
	assert_eq!(first.reference, "a.html");

	let second = pattern.find_at(input, first.span.end).expect("second match");
	assert_eq!(second.reference, "b.html");
	assert!(second.span.start >= first.span.end);

	assert!(pattern.find_at(input, second.span.end).is_none());
}

#[test]
fn pattern_detects_the_skip_marker() {
	let pattern = FlavorPattern::compile(SourceFlavor::Plain).expect("pattern compiles");
	let occurrence = pattern
		.find_at("templateUrl: /*!*/'a.html'", 0)
		.expect("input matches");
	assert!(occurrence.skip_marker);
	assert_eq!(occurrence.reference, "a.html");
}

#[test]
fn typed_pattern_ignores_plain_declarations() {
	let typed = FlavorPattern::compile(SourceFlavor::Typed).expect("pattern compiles");
	assert!(typed.find_at("templateUrl: 'a.html'", 0).is_none());
	assert!(
		typed
			.find_at("templateUrl: string = 'a.html'", 0)
			.is_some()
	);
}

#[test]
fn wrappers_match_their_flavor() {
	let plain = FlavorPattern::compile(SourceFlavor::Plain).expect("pattern compiles");
	let typed = FlavorPattern::compile(SourceFlavor::Typed).expect("pattern compiles");
	assert_eq!(plain.wrap("<b>x</b>"), "template:'<b>x</b>'");
	assert_eq!(typed.wrap("<b>x</b>"), "template:string='<b>x</b>'");
}

#[rstest]
#[case::quote("it's", r"it\'s")]
#[case::backslash(r"a\b", r"a\\b")]
#[case::newlines("line1\nline2\r", r"line1\nline2\r")]
#[case::separators("a\u{2028}b\u{2029}", r"a\u2028b\u2029")]
#[case::untouched("<div class=\"x\">ok</div>", "<div class=\"x\">ok</div>")]
fn escapes_for_single_quoted_literals(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(escape_single_quoted(input), expected);
}

#[test]
fn minifier_strips_comments_by_default() {
	let minified =
		minify::minify("<b>x</b><!-- gone -->", &MinifyOptions::default()).expect("minifies");
	assert_eq!(minified, "<b>x</b>");
}

#[test]
fn minifier_keeps_comments_when_configured() {
	let options = MinifyOptions {
		keep_comments: true,
		..MinifyOptions::default()
	};
	let minified = minify::minify("<b>x</b><!-- kept -->", &options).expect("minifies");
	assert_eq!(minified, "<b>x</b><!-- kept -->");
}

#[test]
fn disabled_minifier_is_the_identity() {
	let input = "<div>\n\t<span>  spaced  </span>\n</div>\n<!-- comment -->";
	let minified = minify::minify(input, &no_minify()).expect("passes through");
	assert_eq!(minified, input);
}

#[test]
fn parses_a_full_config_file() -> AnyEmptyResult {
	let config: EmtConfig = toml::from_str(
		r#"
base_path = "src/app"
max_size = 100000
skip_errors = true
flavor = "typed"
js_encoding = "latin1"
template_encoding = "utf8-lossy"
skip_templates = '-large\.html$'

[minify]
keep_comments = true
minify_css = true

[exclude]
patterns = ["vendor/", "*.spec.js"]
"#,
	)?;

	assert_eq!(config.base_path, Some(PathBuf::from("src/app")));
	assert_eq!(config.max_size, Some(100_000));
	assert!(config.skip_errors);
	assert_eq!(config.flavor, SourceFlavor::Typed);
	assert_eq!(config.js_encoding, TextEncoding::Latin1);
	assert_eq!(config.template_encoding, TextEncoding::Utf8Lossy);
	assert_eq!(config.skip_templates.as_deref(), Some(r"-large\.html$"));
	assert!(config.minify.keep_comments);
	assert!(config.minify.minify_css);
	assert!(config.minify.enabled);
	assert_eq!(config.exclude.patterns, vec!["vendor/", "*.spec.js"]);

	Ok(())
}

#[test]
fn flavor_accepts_short_aliases() -> AnyEmptyResult {
	let config: EmtConfig = toml::from_str("flavor = \"ts\"")?;
	assert_eq!(config.flavor, SourceFlavor::Typed);

	let config: EmtConfig = toml::from_str("flavor = \"js\"")?;
	assert_eq!(config.flavor, SourceFlavor::Plain);

	Ok(())
}

#[test]
fn config_discovery_prefers_the_unhidden_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join(".emt.toml"), "skip_errors = true\n")?;
	std::fs::write(tmp.path().join("emt.toml"), "skip_errors = false\n")?;

	let resolved = EmtConfig::resolve_path(tmp.path()).expect("a config exists");
	assert_eq!(resolved, tmp.path().join("emt.toml"));

	Ok(())
}

#[test]
fn missing_config_loads_as_none() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	assert!(EmtConfig::load(tmp.path())?.is_none());

	Ok(())
}

#[test]
fn engine_options_resolve_base_path_against_the_root() {
	let config = EmtConfig {
		base_path: Some(PathBuf::from("src/app")),
		..EmtConfig::default()
	};
	let options = config.engine_options(Path::new("/project"));
	assert_eq!(options.base_path, Some(PathBuf::from("/project/src/app")));
}

#[rstest]
#[case::latin1(TextEncoding::Latin1, vec![0x63, 0xE9], "cé")]
#[case::utf8(TextEncoding::Utf8, "héllo".as_bytes().to_vec(), "héllo")]
#[case::lossy(TextEncoding::Utf8Lossy, vec![0x61, 0xFF], "a\u{FFFD}")]
fn decodes_bytes_per_encoding(
	#[case] encoding: TextEncoding,
	#[case] bytes: Vec<u8>,
	#[case] expected: &str,
) {
	let decoded = encoding.decode(bytes).expect("decodes");
	assert_eq!(decoded, expected);
}

#[test]
fn strict_utf8_rejects_invalid_bytes() {
	assert!(TextEncoding::Utf8.decode(vec![0xFF]).is_err());
}

#[test]
fn document_directory_falls_back_to_the_current_directory() {
	let bare = SourceDocument::new(PathBuf::from("fake.js"), String::new());
	assert_eq!(bare.dir(), Path::new("."));

	let nested = SourceDocument::new(PathBuf::from("src/app/fake.js"), String::new());
	assert_eq!(nested.dir(), Path::new("src/app"));
}
