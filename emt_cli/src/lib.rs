use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use emt_core::SourceFlavor;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inline external HTML templates into JS/TS sources as string literals.",
	long_about = "emt (embed templates) rewrites `templateUrl: 'hello.html'` declarations into \
	              `template:'…'` literals carrying the referenced file's minified content, so the \
	              shipped sources need no extra template requests at runtime.\n\nEverything \
	              outside a rewritten declaration is preserved byte for byte.\n\nQuick start:\n  \
	              emt init   Create a sample emt.toml\n  emt embed  Inline templates in place\n  \
	              emt check  Verify no external references remain"
)]
pub struct EmtCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Base directory for resolving template references. Defaults to each
	/// source file's own directory.
	#[arg(long, global = true)]
	pub base_path: Option<PathBuf>,

	/// Ignore templates larger than this many bytes.
	#[arg(long, global = true)]
	pub max_size: Option<u64>,

	/// Log and skip unreadable or unminifiable templates instead of failing.
	#[arg(long, global = true, default_value_t = false)]
	pub skip_errors: bool,

	/// Declaration grammar to scan for. Defaults to `js` unless the config
	/// file says otherwise.
	#[arg(long, value_enum, global = true)]
	pub flavor: Option<FlavorArg>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Rewrite template references in project sources.
	///
	/// Scans every source file of the active flavor under the project root,
	/// resolves each `templateUrl` declaration, and splices the minified
	/// template content in as a string literal. Files without references
	/// are never rewritten.
	Embed {
		/// Report which files would change without writing anything.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Write transformed files into this directory instead of in
		/// place, mirroring the layout relative to the project root.
		#[arg(long)]
		out_dir: Option<PathBuf>,
	},
	/// Verify that no source file still carries embeddable references.
	///
	/// Runs the same scan as `embed` without writing and exits with a
	/// non-zero status code if any file would change. Ideal for CI.
	Check,
	/// Create a sample emt.toml in the project root.
	///
	/// If the file already exists this command is a no-op and exits
	/// successfully.
	Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlavorArg {
	/// Plain object-literal declarations (`templateUrl: '…'`) in .js files.
	Js,
	/// Typed class-field declarations (`templateUrl: string = '…'`) in .ts
	/// files.
	Ts,
}

impl From<FlavorArg> for SourceFlavor {
	fn from(flavor: FlavorArg) -> Self {
		match flavor {
			FlavorArg::Js => Self::Plain,
			FlavorArg::Ts => Self::Typed,
		}
	}
}
