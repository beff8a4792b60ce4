//! Templated file-naming tests across prefix variants.

use serde_json::json;

use run_exporter::{
    export, ArtifactLabel, DocumentKind, ExportError, LayoutMode, Serializer, SerializerOptions,
    TemplateError,
};

use super::test_utils::{descriptor_doc, event_doc, ones, start_doc, stop_doc, RUN_UID};

fn two_event_run() -> Vec<(DocumentKind, serde_json::Value)> {
    vec![
        start_doc(),
        descriptor_doc("desc-primary", "primary", &[("img", "array", json!([4, 4]))]),
        event_doc("desc-primary", 1, &[("img", ones(4, 4))]),
        event_doc("desc-primary", 2, &[("img", ones(4, 4))]),
        stop_doc(),
    ]
}

fn options(prefix: &str, layout: LayoutMode) -> SerializerOptions {
    SerializerOptions {
        file_prefix: prefix.to_string(),
        layout,
        ..SerializerOptions::default()
    }
}

fn collect_names(artifacts: &run_exporter::Artifacts) -> Vec<String> {
    let mut names: Vec<String> = artifacts
        .get(&ArtifactLabel::StreamData)
        .map(|paths| {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Run-wide prefixes go through the full export, sidecar included.
fn stream_file_names(prefix: &str, layout: LayoutMode) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = export(two_event_run(), dir.path(), options(prefix, layout)).unwrap();
    collect_names(&artifacts)
}

/// Per-stream/per-event prefixes cannot name the run-wide sidecar, so
/// these sequences end without a stop document.
fn stream_file_names_without_stop(prefix: &str, layout: LayoutMode) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = Serializer::new(dir.path(), options(prefix, layout)).unwrap();

    let mut documents = two_event_run();
    documents.pop();
    for (kind, doc) in documents {
        serializer.process(kind, &doc).unwrap();
    }
    serializer.close().unwrap();
    collect_names(&serializer.artifacts())
}

#[test]
fn test_literal_prefix() {
    assert_eq!(
        stream_file_names("test-", LayoutMode::Stacked),
        vec!["test-primary-img.tiff"]
    );
}

#[test]
fn test_start_uid_prefix() {
    assert_eq!(
        stream_file_names("scan_{start[uid]}-", LayoutMode::Stacked),
        vec![format!("scan_{RUN_UID}-primary-img.tiff")]
    );
}

#[test]
fn test_start_metadata_prefix() {
    assert_eq!(
        stream_file_names("{start[plan_name]}_{start[scan_id]}-", LayoutMode::Stacked),
        vec!["count_7-primary-img.tiff"]
    );
}

#[test]
fn test_descriptor_uid_prefix() {
    assert_eq!(
        stream_file_names_without_stop("scan_{descriptor[uid]}-", LayoutMode::Stacked),
        vec!["scan_desc-primary-primary-img.tiff"]
    );
}

#[test]
fn test_stream_and_field_prefix() {
    assert_eq!(
        stream_file_names_without_stop("{stream_name}_{field}-", LayoutMode::Stacked),
        vec!["primary_img-primary-img.tiff"]
    );
}

#[test]
fn test_event_prefix_in_series_layout() {
    // The event in scope when each artifact is opened names the file, so
    // in series layout each frame carries its own event's seq_num.
    assert_eq!(
        stream_file_names_without_stop("{event[seq_num]}-", LayoutMode::Series),
        vec![
            "1-primary-img-00000.tiff".to_string(),
            "2-primary-img-00001.tiff".to_string(),
        ]
    );
}

#[test]
fn test_series_names_are_zero_padded() {
    assert_eq!(
        stream_file_names("{start[uid]}-", LayoutMode::Series),
        vec![
            format!("{RUN_UID}-primary-img-00000.tiff"),
            format!("{RUN_UID}-primary-img-00001.tiff"),
        ]
    );
}

#[test]
fn test_unknown_placeholder_fails_at_construction() {
    let dir = tempfile::tempdir().unwrap();

    let err = export(
        two_event_run(),
        dir.path(),
        options("{plan_name}-", LayoutMode::Stacked),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Template(TemplateError::UnknownPlaceholder { .. })
    ));
    // Nothing may be written when construction fails.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_start_field_fails_at_first_use() {
    let dir = tempfile::tempdir().unwrap();

    let err = export(
        two_event_run(),
        dir.path(),
        options("{start[sample_name]}-", LayoutMode::Stacked),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Template(TemplateError::MissingField { .. })
    ));
}

#[test]
fn test_per_stream_prefix_fails_for_run_wide_sidecar() {
    // {stream_name} has no referent when the run-wide meta.json is
    // named at stop time.
    let dir = tempfile::tempdir().unwrap();

    let err = export(
        two_event_run(),
        dir.path(),
        options("{stream_name}-", LayoutMode::Stacked),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Template(TemplateError::OutOfScope { .. })
    ));
}
