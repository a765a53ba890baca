//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::diagnostics::{DiagnosticCode, DiagnosticPolicy, Policy};

mod cli;

pub use cli::{BuildArgs, BuildOverrides, CliArgs, Command};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "docweave";
const DEFAULT_OUTPUT_DIR: &str = "html";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub output: OutputSettings,
    pub render: RenderSettings,
    pub diagnostics: DiagnosticsSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where the symbol store keeps its snapshot. Without a directory every run
/// starts from an empty in-memory store.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RenderSettings {
    pub number_headings: bool,
    pub add_anchors: bool,
    pub order_by_parent: bool,
    pub sanitize_docstrings: bool,
    pub extra_theme: Option<PathBuf>,
    pub extra_assets: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSettings {
    pub fatal_warnings: bool,
    pub ignored_codes: BTreeSet<String>,
    pub ignored_domains: BTreeSet<String>,
    /// Keyed by canonical `domain.name`.
    pub policies: BTreeMap<String, Policy>,
}

impl DiagnosticsSettings {
    pub fn policy(&self) -> DiagnosticPolicy {
        DiagnosticPolicy {
            fatal_warnings: self.fatal_warnings,
            ignored_codes: self.ignored_codes.clone(),
            ignored_domains: self.ignored_domains.clone(),
            overrides: self.policies.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("DOCWEAVE")
            .prefix_separator("__")
            .separator("__"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Build(args) => raw.apply_build_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    output: RawOutputSettings,
    render: RawRenderSettings,
    diagnostics: RawDiagnosticsSettings,
}

impl RawSettings {
    fn apply_build_overrides(&mut self, overrides: &BuildOverrides) {
        if let Some(dir) = overrides.output.as_ref() {
            self.output.dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.store_dir.as_ref() {
            self.store.dir = Some(dir.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(value) = overrides.number_headings {
            self.render.number_headings = Some(value);
        }
        if let Some(value) = overrides.add_anchors {
            self.render.add_anchors = Some(value);
        }
        if let Some(value) = overrides.order_by_parent {
            self.render.order_by_parent = Some(value);
        }
        if let Some(value) = overrides.fatal_warnings {
            self.diagnostics.fatal_warnings = Some(value);
        }
        if let Some(theme) = overrides.extra_theme.as_ref() {
            self.render.extra_theme = Some(theme.clone());
        }

        self.diagnostics
            .ignored_codes
            .extend(overrides.ignore_codes.iter().cloned());
        self.render
            .extra_assets
            .extend(overrides.extra_assets.iter().cloned());
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            store,
            output,
            render,
            diagnostics,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let store = build_store_settings(store);
        let output = build_output_settings(output)?;
        let render = build_render_settings(render);
        let diagnostics = build_diagnostics_settings(diagnostics)?;

        Ok(Self {
            logging,
            store,
            output,
            render,
            diagnostics,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> StoreSettings {
    StoreSettings {
        dir: store.dir.filter(|dir| !dir.as_os_str().is_empty()),
    }
}

fn build_output_settings(output: RawOutputSettings) -> Result<OutputSettings, LoadError> {
    let dir = output
        .dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if dir.as_os_str().is_empty() {
        return Err(LoadError::invalid("output.dir", "must not be empty"));
    }
    Ok(OutputSettings { dir })
}

fn build_render_settings(render: RawRenderSettings) -> RenderSettings {
    RenderSettings {
        number_headings: render.number_headings.unwrap_or(false),
        add_anchors: render.add_anchors.unwrap_or(false),
        order_by_parent: render.order_by_parent.unwrap_or(false),
        sanitize_docstrings: render.sanitize_docstrings.unwrap_or(false),
        extra_theme: render.extra_theme,
        extra_assets: render.extra_assets,
    }
}

fn build_diagnostics_settings(
    diagnostics: RawDiagnosticsSettings,
) -> Result<DiagnosticsSettings, LoadError> {
    let mut policies = BTreeMap::new();
    for (key, value) in diagnostics.policies {
        let code = DiagnosticCode::lookup(key.trim()).ok_or_else(|| {
            LoadError::invalid(
                "diagnostics.policies",
                format!("unknown diagnostic code `{key}`"),
            )
        })?;
        let policy = Policy::from_str(&value)
            .map_err(|reason| LoadError::invalid("diagnostics.policies", reason))?;
        policies.insert(code.to_string(), policy);
    }

    let trimmed = |values: Vec<String>| -> BTreeSet<String> {
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    };

    Ok(DiagnosticsSettings {
        fatal_warnings: diagnostics.fatal_warnings.unwrap_or(false),
        ignored_codes: trimmed(diagnostics.ignored_codes),
        ignored_domains: trimmed(diagnostics.ignored_domains),
        policies,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    number_headings: Option<bool>,
    add_anchors: Option<bool>,
    order_by_parent: Option<bool>,
    sanitize_docstrings: Option<bool>,
    extra_theme: Option<PathBuf>,
    extra_assets: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiagnosticsSettings {
    fatal_warnings: Option<bool>,
    ignored_codes: Vec<String>,
    ignored_domains: Vec<String>,
    policies: BTreeMap<String, String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
