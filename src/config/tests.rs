use std::path::Path;

use super::*;

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(args).expect("valid arguments")
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.output.dir = Some(PathBuf::from("site"));
    raw.logging.level = Some("info".to_string());

    let overrides = BuildOverrides {
        output: Some(PathBuf::from("public")),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_build_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.output.dir, PathBuf::from("public"));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_render_a_fresh_build_into_html() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.output.dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    assert!(settings.store.dir.is_none());
    assert!(!settings.render.number_headings);
    assert!(!settings.render.add_anchors);
    assert!(!settings.diagnostics.fatal_warnings);
    assert_eq!(settings.logging.format, LogFormat::Compact);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = BuildOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_build_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn unknown_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn empty_output_dir_is_rejected() {
    let mut raw = RawSettings::default();
    raw.output.dir = Some(PathBuf::new());

    let err = Settings::from_raw(raw).expect_err("empty output");
    assert!(matches!(err, LoadError::Invalid { key: "output.dir", .. }));
}

#[test]
fn policies_are_keyed_by_canonical_code() {
    let mut raw = RawSettings::default();
    raw.diagnostics
        .policies
        .insert("bad-image-src".to_string(), "fatal".to_string());
    raw.diagnostics
        .policies
        .insert("page.unknown-symbol".to_string(), "ignore".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    let policy = settings.diagnostics.policy();

    assert_eq!(
        policy.resolve(DiagnosticCode::BAD_IMAGE_SRC),
        Policy::Fatal
    );
    assert_eq!(
        policy.resolve(DiagnosticCode::UNKNOWN_SYMBOL),
        Policy::Ignore
    );
}

#[test]
fn unknown_policy_names_are_rejected() {
    let mut raw = RawSettings::default();
    raw.diagnostics
        .policies
        .insert("bad-image-src".to_string(), "loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid policy");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "diagnostics.policies",
            ..
        }
    ));
}

#[test]
fn unknown_policy_codes_are_rejected() {
    let mut raw = RawSettings::default();
    raw.diagnostics
        .policies
        .insert("no-such-code".to_string(), "warn".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn parse_build_arguments() {
    let cli = parse(&[
        "docweave",
        "build",
        "--manifest",
        "docs/manifest.json",
        "--output",
        "out",
        "--store-dir",
        ".store",
        "--number-headings",
        "--add-anchors",
        "--ignore-code",
        "bad-local-link",
        "--ignore-code",
        "html-formatter.no-image-src",
        "--extra-assets",
        "images",
    ]);

    let Command::Build(args) = cli.command;
    assert_eq!(args.manifest, Path::new("docs/manifest.json"));
    assert_eq!(args.overrides.output.as_deref(), Some(Path::new("out")));
    assert_eq!(args.overrides.store_dir.as_deref(), Some(Path::new(".store")));
    assert_eq!(args.overrides.number_headings, Some(true));
    assert_eq!(args.overrides.add_anchors, Some(true));
    assert_eq!(args.overrides.order_by_parent, None);
    assert_eq!(args.overrides.ignore_codes.len(), 2);
    assert_eq!(args.overrides.extra_assets, vec![PathBuf::from("images")]);
}

#[test]
fn build_flags_feed_render_and_diagnostic_settings() {
    let cli = parse(&[
        "docweave",
        "build",
        "--manifest",
        "m.json",
        "--order-by-parent",
        "false",
        "--fatal-warnings",
        "--ignore-code",
        "bad-local-link",
    ]);
    let Command::Build(args) = cli.command;

    let mut raw = RawSettings::default();
    raw.render.order_by_parent = Some(true);
    raw.apply_build_overrides(&args.overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.render.order_by_parent);
    assert!(settings.diagnostics.fatal_warnings);
    assert!(settings.diagnostics.ignored_codes.contains("bad-local-link"));
    assert_eq!(
        settings
            .diagnostics
            .policy()
            .resolve(DiagnosticCode::UNKNOWN_SYMBOL),
        Policy::Fatal
    );
}

#[test]
fn build_requires_a_manifest() {
    assert!(CliArgs::try_parse_from(["docweave", "build"]).is_err());
}
