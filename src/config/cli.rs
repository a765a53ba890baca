use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the docweave binary.
#[derive(Debug, Parser)]
#[command(
    name = "docweave",
    version,
    about = "Incremental documentation compiler"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "DOCWEAVE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render every page of a manifest into the output directory.
    Build(BuildArgs),
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    /// JSON manifest of comments, symbols and pages.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub overrides: BuildOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildOverrides {
    /// Override the output directory.
    #[arg(long = "output", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Override the symbol store directory.
    #[arg(long = "store-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub store_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Number h1-h5 headings on every page.
    #[arg(
        long = "number-headings",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub number_headings: Option<bool>,

    /// Reference the anchor scripts from every page.
    #[arg(
        long = "add-anchors",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub add_anchors: Option<bool>,

    /// Group page symbols under their parent symbol.
    #[arg(
        long = "order-by-parent",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub order_by_parent: Option<bool>,

    /// Escalate every warning to a fatal error.
    #[arg(
        long = "fatal-warnings",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub fatal_warnings: Option<bool>,

    /// Ignore a diagnostic code, by short name or `domain.name`.
    #[arg(long = "ignore-code", value_name = "CODE")]
    pub ignore_codes: Vec<String>,

    /// Directory with extra `js/` and `css/` theme files.
    #[arg(long = "extra-theme", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub extra_theme: Option<PathBuf>,

    /// Directory copied verbatim into the output root.
    #[arg(long = "extra-assets", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub extra_assets: Vec<PathBuf>,
}
