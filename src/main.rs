use std::process;

use docweave::{
    application::{
        build::{BuildReport, DocBuild, Manifest},
        diagnostics::{Diagnostic, DiagnosticSink},
        error::AppError,
        links::LinkResolver,
        records::RecordStore,
        render::{
            AskamaTemplates, Formatter, FormatterConfig, MarkdownDocstrings, PostProcessOptions,
        },
        store::{StoreError, SymbolStore},
    },
    config::{self, Command, Settings},
    infra::{
        assets::discover_theme,
        error::InfraError,
        manifest::load_manifest,
        output::FsPageWriter,
        records::{JsonRecordStore, MemoryRecordStore},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let code = error.code().map(|code| code.to_string()).unwrap_or_default();
    let chain = error.messages().join(": ");

    if dispatcher::has_been_set() {
        error!(error = %chain, code = %code, "build failed");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, code = %code, "build failed");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Build(args) => {
            let manifest = load_manifest(&args.manifest)?;
            let report = run_build(&settings, manifest)?;
            info!(
                pages = report.pages.len(),
                diagnostics = report.diagnostics.len(),
                output = %settings.output.dir.display(),
                "documentation built"
            );
            Ok(())
        }
    }
}

fn run_build(settings: &Settings, manifest: Manifest) -> Result<BuildReport, AppError> {
    let mut diagnostics = DiagnosticSink::new(settings.diagnostics.policy());

    let backend: Box<dyn RecordStore> = match settings.store.dir.as_ref() {
        Some(dir) => Box::new(JsonRecordStore::new(dir.clone())),
        None => Box::new(MemoryRecordStore::new()),
    };
    let store = match SymbolStore::setup(backend, Vec::new()) {
        Ok(store) => store,
        Err(err) => return Err(store_unavailable(&mut diagnostics, err)),
    };

    let theme =
        discover_theme(settings.render.extra_theme.as_deref()).map_err(InfraError::from)?;
    let formatter = Formatter::new(
        FormatterConfig {
            add_anchors: settings.render.add_anchors,
            order_by_parent: settings.render.order_by_parent,
            scripts: theme.scripts,
            stylesheets: theme.stylesheets,
        },
        Box::new(AskamaTemplates),
        Box::new(MarkdownDocstrings::new(settings.render.sanitize_docstrings)),
    );

    let writer = FsPageWriter::new(settings.output.dir.clone())
        .with_theme(settings.render.extra_theme.clone())
        .with_assets(settings.render.extra_assets.clone());

    let mut build = DocBuild::new(
        store,
        LinkResolver::new(),
        formatter,
        diagnostics,
        Box::new(writer),
    )
    .with_post_processing(PostProcessOptions {
        number_headings: settings.render.number_headings,
    });

    Ok(build.run(manifest)?)
}

/// Route a store setup failure through the diagnostic sink so it is logged
/// with its code, then propagate it.
fn store_unavailable(diagnostics: &mut DiagnosticSink, err: StoreError) -> AppError {
    if let Some(code) = err.code() {
        let _escalated = diagnostics.report(Diagnostic::new(code, err.to_string()));
    }
    AppError::Store(err)
}
