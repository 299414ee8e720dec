use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use emt_cli::Commands;
use emt_cli::EmtCli;
use emt_core::AnyEmptyResult;
use emt_core::AnyResult;
use emt_core::EmtConfig;
use emt_core::EmtError;
use emt_core::Engine;
use emt_core::EngineOptions;
use emt_core::SourceDocument;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use owo_colors::OwoColorize;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = EmtCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Embed { dry_run, out_dir }) => run_embed(&args, *dry_run, out_dir.clone()),
		Some(Commands::Check) => run_check(&args),
		Some(Commands::Init) => run_init(&args),
		None => {
			eprintln!("No subcommand specified. Run `emt --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render through miette for rich diagnostics with help text and
		// error codes.
		match e.downcast::<EmtError>() {
			Ok(emt_err) => {
				let report: miette::Report = (*emt_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &EmtCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The outcome for one source file that would change.
struct FileOutcome {
	path: PathBuf,
	rel: String,
	embedded: usize,
	content: String,
}

struct ProjectReport {
	scanned: usize,
	changed: Vec<FileOutcome>,
}

/// Merge config-file options with command-line overrides. Flags win over
/// file values.
fn engine_options(args: &EmtCli, config: Option<&EmtConfig>, root: &Path) -> EngineOptions {
	let mut options = config
		.map(|config| config.engine_options(root))
		.unwrap_or_default();

	if let Some(base) = &args.base_path {
		options.base_path = Some(if base.is_absolute() {
			base.clone()
		} else {
			root.join(base)
		});
	}
	if let Some(max_size) = args.max_size {
		options.max_size = Some(max_size);
	}
	if args.skip_errors {
		options.skip_errors = true;
	}
	if let Some(flavor) = args.flavor {
		options.flavor = flavor.into();
	}

	options
}

/// Scan every source file of the active flavor and process it through the
/// engine, without writing anything. Non-fatal diagnostics are printed as
/// warnings; a fatal engine error aborts the whole run.
async fn process_project(args: &EmtCli, skip_dir: Option<&Path>) -> AnyResult<ProjectReport> {
	let root = resolve_root(args);
	let config = EmtConfig::load(&root)?;
	let options = engine_options(args, config.as_ref(), &root);
	let js_encoding = options.js_encoding;
	let engine = Engine::new(options)?;
	let exclude_patterns = config.map(|config| config.exclude.patterns).unwrap_or_default();

	let files = collect_source_files(
		&root,
		engine.options().flavor.extension(),
		&exclude_patterns,
		skip_dir,
	)?;

	if args.verbose {
		println!("Scanning {} file(s) under {}", files.len(), root.display());
	}

	let mut changed = Vec::new();
	for file in &files {
		let bytes = tokio::fs::read(file).await?;
		let content = js_encoding.decode(bytes).map_err(|_| {
			EmtError::Decode {
				path: file.display().to_string(),
				encoding: js_encoding.name(),
			}
		})?;
		let document = SourceDocument::new(file.clone(), content);
		let outcome = engine.process(&document).await?;
		let rel = make_relative(file, &root);

		for diagnostic in &outcome.diagnostics {
			eprintln!(
				"{} {rel}:{}:{} {}",
				colored!("warning:", yellow),
				diagnostic.line,
				diagnostic.column,
				diagnostic.message()
			);
		}

		if outcome.changed() {
			changed.push(FileOutcome {
				path: file.clone(),
				rel,
				embedded: outcome.embedded,
				content: outcome.content.into_owned(),
			});
		}
	}

	Ok(ProjectReport {
		scanned: files.len(),
		changed,
	})
}

fn run_embed(args: &EmtCli, dry_run: bool, out_dir: Option<PathBuf>) -> AnyEmptyResult {
	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(embed_project(args, dry_run, out_dir))
}

async fn embed_project(args: &EmtCli, dry_run: bool, out_dir: Option<PathBuf>) -> AnyEmptyResult {
	let report = process_project(args, out_dir.as_deref()).await?;

	if report.changed.is_empty() {
		println!(
			"No template references found in {} file(s).",
			report.scanned
		);
		return Ok(());
	}

	let embedded_total: usize = report.changed.iter().map(|file| file.embedded).sum();

	if dry_run {
		println!(
			"Dry run: would embed {embedded_total} template(s) in {} file(s):",
			report.changed.len()
		);
		for file in &report.changed {
			println!("  {}", file.rel);
		}
		return Ok(());
	}

	for file in &report.changed {
		let target = match &out_dir {
			Some(dir) => dir.join(&file.rel),
			None => file.path.clone(),
		};
		if let Some(parent) = target.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(&target, file.content.as_bytes()).await?;

		if args.verbose {
			println!("  {}", file.rel);
		}
	}

	println!(
		"Embedded {embedded_total} template(s) in {} file(s).",
		report.changed.len()
	);

	Ok(())
}

fn run_check(args: &EmtCli) -> AnyEmptyResult {
	let rt = tokio::runtime::Runtime::new()?;
	let report = rt.block_on(process_project(args, None))?;

	if report.changed.is_empty() {
		println!("Check passed: no embeddable template references remain.");
		return Ok(());
	}

	eprintln!(
		"Check failed: {} file(s) still reference external templates:",
		report.changed.len()
	);
	for file in &report.changed {
		eprintln!("  {} ({} reference(s))", file.rel, file.embedded);
	}
	eprintln!("Run `emt embed` to fix.");
	process::exit(1);
}

fn run_init(args: &EmtCli) -> AnyEmptyResult {
	let root = resolve_root(args);
	let config_path = root.join("emt.toml");

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
		return Ok(());
	}

	let sample_config = "# emt configuration\n\n# Resolve template references against this \
	                     directory instead of each source\n# file's own directory.\n# base_path = \
	                     \"src/app\"\n\n# Ignore templates larger than this many bytes.\n# \
	                     max_size = 100000\n\n# Log and skip unreadable templates instead of \
	                     failing the build.\n# skip_errors = false\n\n# Declaration grammar: \
	                     \"js\" for `templateUrl: '…'`, \"ts\" for\n# `templateUrl: string = \
	                     '…'`.\n# flavor = \"js\"\n\n# Leave references matching this pattern \
	                     untouched.\n# skip_templates = '-large\\.html$'\n\n# [minify]\n# enabled \
	                     = true\n# keep_comments = false\n\n# [exclude]\n# patterns = \
	                     [\"vendor/\", \"*.spec.js\"]\n";

	std::fs::write(&config_path, sample_config)?;
	println!("Created emt.toml");
	println!();
	println!("Next steps:");
	println!("  1. Point `base_path` at the directory your templateUrl values resolve against");
	println!("  2. Run `emt embed --dry-run` to preview the rewrite");
	println!("  3. Run `emt embed` to inline the templates");

	Ok(())
}

/// Collect every source file with the flavor's extension under `root`,
/// honoring `.gitignore` and `[exclude]` patterns. Deterministic (sorted)
/// order.
fn collect_source_files(
	root: &Path,
	extension: &str,
	exclude_patterns: &[String],
	skip_dir: Option<&Path>,
) -> AnyResult<Vec<PathBuf>> {
	let gitignore = build_gitignore(root);
	let custom_exclude = build_exclude_matcher(root, exclude_patterns)?;

	let mut files = Vec::new();
	walk_dir(
		root,
		extension,
		&gitignore,
		&custom_exclude,
		skip_dir,
		&mut files,
	)?;
	files.sort();
	Ok(files)
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if
/// any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Build a `Gitignore` matcher from `[exclude]` patterns in emt.toml.
/// These follow `.gitignore` syntax and are applied on top of any
/// `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> AnyResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder
			.add_line(None, pattern)
			.map_err(|e| format!("invalid exclude pattern `{pattern}`: {e}"))?;
	}
	let matcher = builder
		.build()
		.map_err(|e| format!("failed to build exclude rules: {e}"))?;
	Ok(matcher)
}

fn is_skipped_directory(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target" || name == "dist"
}

fn walk_dir(
	dir: &Path,
	extension: &str,
	gitignore: &Gitignore,
	custom_exclude: &Gitignore,
	skip_dir: Option<&Path>,
	files: &mut Vec<PathBuf>,
) -> AnyResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();
		let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
			continue;
		};
		let is_dir = path.is_dir();

		if is_dir && (is_skipped_directory(name) || skip_dir.is_some_and(|skip| path == skip)) {
			continue;
		}
		if gitignore.matched(&path, is_dir).is_ignore() {
			continue;
		}
		if custom_exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			walk_dir(&path, extension, gitignore, custom_exclude, skip_dir, files)?;
		} else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
			files.push(path);
		}
	}

	Ok(())
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
