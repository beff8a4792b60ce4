//! Run lifecycle and resource management tests.

use serde_json::json;

use run_exporter::{
    export, ArtifactLabel, DocumentError, DocumentKind, ExportError, Serializer,
    SerializerOptions, StorageError,
};

use super::test_utils::{
    descriptor_doc, event_doc, ones, read_u16_frames, simple_run, start_doc, stop_doc, RUN_UID,
};

fn serializer(dir: &std::path::Path) -> Serializer {
    Serializer::new(dir, SerializerOptions::default()).unwrap()
}

#[test]
fn test_second_start_is_fatal_and_leaves_artifacts_intact() {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = serializer(dir.path());

    serializer
        .process(DocumentKind::Start, &start_doc().1)
        .unwrap();
    serializer
        .process(
            DocumentKind::Descriptor,
            &descriptor_doc("d1", "primary", &[("img", "array", json!([2, 2]))]).1,
        )
        .unwrap();
    serializer
        .process(
            DocumentKind::Event,
            &event_doc("d1", 1, &[("img", ones(2, 2))]).1,
        )
        .unwrap();

    let err = serializer
        .process(DocumentKind::Start, &start_doc().1)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::MultipleRuns)
    ));

    // The frame written before the failure is still readable once the
    // serializer releases its handles.
    serializer.close().unwrap();
    let path = dir.path().join(format!("{RUN_UID}-primary-img.tiff"));
    assert_eq!(read_u16_frames(&path).len(), 1);
}

#[test]
fn test_descriptor_before_start_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = serializer(dir.path());

    let err = serializer
        .process(
            DocumentKind::Descriptor,
            &descriptor_doc("d1", "primary", &[("img", "array", json!([2, 2]))]).1,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::RunNotStarted { .. })
    ));
}

#[test]
fn test_stop_before_start_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = serializer(dir.path());

    let err = serializer
        .process(DocumentKind::Stop, &stop_doc().1)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::RunNotStarted { .. })
    ));
}

#[test]
fn test_documents_after_stop_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = serializer(dir.path());

    for (kind, doc) in simple_run(1) {
        serializer.process(kind, &doc).unwrap();
    }

    let err = serializer
        .process(
            DocumentKind::Event,
            &event_doc("desc-primary", 2, &[("img", ones(10, 10))]).1,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::RunClosed { .. })
    ));

    let err = serializer
        .process(DocumentKind::Stop, &stop_doc().1)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::RunClosed { .. })
    ));
}

#[test]
fn test_close_twice_does_not_duplicate_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut serializer = serializer(dir.path());

    for (kind, doc) in simple_run(2) {
        serializer.process(kind, &doc).unwrap();
    }

    // stop() already closed once.
    serializer.close().unwrap();
    serializer.close().unwrap();

    let artifacts = serializer.artifacts();
    assert_eq!(artifacts[&ArtifactLabel::StreamData].len(), 1);
    assert_eq!(artifacts[&ArtifactLabel::RunMetadata].len(), 1);
}

#[test]
fn test_artifact_name_collision_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // Stream/field pairs chosen so the resolved names coincide:
    // "a-b" + "c" and "a" + "b-c" both yield "x-a-b-c.tiff".
    let documents = vec![
        start_doc(),
        descriptor_doc("d1", "a-b", &[("c", "array", json!([2, 2]))]),
        descriptor_doc("d2", "a", &[("b-c", "array", json!([2, 2]))]),
        event_doc("d1", 1, &[("c", ones(2, 2))]),
        event_doc("d2", 1, &[("b-c", ones(2, 2))]),
        stop_doc(),
    ];
    let options = SerializerOptions {
        file_prefix: "x-".to_string(),
        ..SerializerOptions::default()
    };

    let err = export(documents, dir.path(), options).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Storage(StorageError::DuplicateArtifact(_))
    ));
}

#[test]
fn test_export_closes_files_on_error() {
    let dir = tempfile::tempdir().unwrap();
    // Malformed event in the middle: export fails but must not leak or
    // corrupt the already-written file.
    let documents = vec![
        start_doc(),
        descriptor_doc("d1", "primary", &[("img", "array", json!([2, 2]))]),
        event_doc("d1", 1, &[("img", ones(2, 2))]),
        (DocumentKind::Event, json!({"bogus": true})),
    ];

    let err = export(documents, dir.path(), SerializerOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Document(DocumentError::Malformed { .. })
    ));

    let path = dir.path().join(format!("{RUN_UID}-primary-img.tiff"));
    assert_eq!(read_u16_frames(&path).len(), 1);
}

#[test]
fn test_empty_sequence_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = export(Vec::new(), dir.path(), SerializerOptions::default()).unwrap();
    assert!(artifacts.is_empty());
}
