use std::path::Path;

use docweave::application::{
    diagnostics::{DiagnosticCode, DiagnosticPolicy, DiagnosticSink},
    render::{PostProcessOptions, RenderError, post_process, validate_images},
};

const PAGE: &str = r##"<html><body>
<h1>Widgets</h1>
<h2>Overview</h2>
<p>See <a href="#drawing"></a> and <a href="#nowhere"></a>.</p>
<h2 id="drawing">Drawing</h2>
<h3>Snapshots</h3>
<h3>Measuring</h3>
<h2>Overview</h2>
<img src="diagram.png" alt="Widget tree">
<img alt="no source">
</body></html>"##;

#[test]
fn hand_written_page_is_numbered_anchored_and_repaired() {
    let mut sink = DiagnosticSink::default();
    let processed = post_process(
        PAGE,
        "widgets.md",
        PostProcessOptions {
            number_headings: true,
        },
        &mut sink,
    )
    .expect("processed");

    let html = &processed.html;
    assert!(html.contains(r#"<h1 id="widgets">Widgets</h1>"#));
    assert!(html.contains(r#"<h2 id="overview">1 Overview</h2>"#));
    assert!(html.contains(r#"<h2 id="drawing">Drawing</h2>"#));
    assert!(html.contains(r#"<h3 id="snapshots">2.1 Snapshots</h3>"#));
    assert!(html.contains(r#"<h3 id="measuring">2.2 Measuring</h3>"#));
    assert!(html.contains(r#"<h2 id="overview1">3 Overview</h2>"#));
    assert!(html.contains(r##"<a href="#drawing">Drawing</a>"##));
    assert!(html.contains(r##"<a href="#nowhere">FIXME broken link to #nowhere</a>"##));
    assert!(html.contains(r#"id="widget-tree""#));

    assert_eq!(sink.count(DiagnosticCode::BAD_LOCAL_LINK), 1);
    assert_eq!(processed.images.len(), 2);
    assert_eq!(processed.images[0].src.as_deref(), Some("diagram.png"));
    assert_eq!(processed.images[1].src, None);
}

#[test]
fn image_checks_run_against_the_written_page() {
    let dir = tempfile::tempdir().expect("out");
    std::fs::write(dir.path().join("diagram.png"), b"png").expect("image");

    let mut sink = DiagnosticSink::default();
    let processed = post_process(PAGE, "widgets.md", PostProcessOptions::default(), &mut sink)
        .expect("processed");
    validate_images(
        &processed.images,
        &dir.path().join("widgets.html"),
        "widgets.md",
        &mut sink,
    )
    .expect("warnings only");

    assert_eq!(sink.count(DiagnosticCode::NO_IMAGE_SRC), 1);
    assert_eq!(sink.count(DiagnosticCode::BAD_IMAGE_SRC), 0);

    validate_images(
        &processed.images,
        Path::new("/nonexistent/widgets.html"),
        "widgets.md",
        &mut sink,
    )
    .expect("warnings only");
    assert_eq!(sink.count(DiagnosticCode::BAD_IMAGE_SRC), 1);
}

#[test]
fn broken_local_links_can_be_fatal() {
    let mut sink = DiagnosticSink::new(DiagnosticPolicy {
        fatal_warnings: true,
        ..DiagnosticPolicy::default()
    });

    let err = post_process(PAGE, "widgets.md", PostProcessOptions::default(), &mut sink)
        .expect_err("fatal");

    assert!(matches!(err, RenderError::Diagnostic(_)));
}
