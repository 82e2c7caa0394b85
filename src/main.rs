mod adapters;
mod commands;
mod core;
mod graph;
mod testplan;
mod ui;
mod utils;

use crate::adapters::ParseOptions;
use crate::commands::SelectOptions;
use crate::core::config::SelectConfig;
use crate::core::context::WorkspaceContext;
use crate::core::error::{SelectError, SelectResult, print_error};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Run only the tests a change affects
#[derive(Parser)]
#[command(name = "selective-testing")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Workspace root to analyze (default: config `workspace.root`, else current directory)
  #[arg(long)]
  path: Option<PathBuf>,

  /// Compare the current branch against this branch instead of local changes
  #[arg(long)]
  base_branch: Option<String>,

  /// Test plan to rewrite
  #[arg(long, conflicts_with = "scheme")]
  test_plan: Option<PathBuf>,

  /// Rewrite the test plans referenced by this scheme
  #[arg(long)]
  scheme: Option<String>,

  /// Use these files instead of asking git (relative to the workspace root)
  #[arg(long, num_args = 1.., value_delimiter = ',')]
  changed_files: Option<Vec<PathBuf>>,

  /// Print the analysis as JSON; no test plan is rewritten
  #[arg(long)]
  json: bool,

  /// Print the dependency graph in DOT format, affected targets highlighted
  #[arg(long)]
  dependency_graph: bool,

  /// Show what would change without writing any test plan
  #[arg(long)]
  dry_run: bool,

  /// Debug logging on stderr
  #[arg(short, long)]
  verbose: bool,

  /// Only direct dependents of changed targets, not the full transitive closure
  #[arg(long)]
  turbo: bool,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  if let Err(e) = ui::logging::init_logging(cli.verbose) {
    eprintln!("Warning: {}", e);
  }

  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn run(cli: Cli) -> SelectResult<()> {
  let cwd = std::env::current_dir().map_err(|e| SelectError::message(format!("Failed to get current directory: {}", e)))?;

  // Config is looked up where the tool runs, then in an explicit --path
  let explicit = cli.path.as_ref().map(|p| utils::absolutize(&cwd, p));
  let config = SelectConfig::discover(std::iter::once(cwd.as_path()).chain(explicit.as_deref()))?;

  let root = cli
    .path
    .clone()
    .or_else(|| config.as_ref().and_then(|c| c.workspace.root.clone()))
    .map(|p| utils::absolutize(&cwd, &p))
    .unwrap_or_else(|| cwd.clone());
  // git reports resolved paths; the model must use the same spelling
  let root = std::fs::canonicalize(&root).map_err(|e| {
    SelectError::with_help(
      format!("Workspace root {} is not accessible: {}", root.display(), e),
      "Pass an existing directory with --path, or fix workspace.root in selective-testing.toml.",
    )
  })?;

  let parse_options = ParseOptions {
    progress: !cli.json && !cli.dependency_graph && std::io::stderr().is_terminal(),
  };
  let ctx = WorkspaceContext::build(&root, config, parse_options)?;

  let options = SelectOptions {
    base_branch: cli.base_branch,
    changed_files: cli.changed_files,
    test_plan: cli.test_plan.map(|p| utils::absolutize(&cwd, &p)),
    scheme: cli.scheme,
    json: cli.json,
    dependency_graph: cli.dependency_graph,
    dry_run: cli.dry_run,
    turbo: cli.turbo,
  };

  commands::run_select(&ctx, options)
}

fn handle_error(err: SelectError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
