mod common;

use keyhop_exec::{ExecError, UploadEntry, upload_file, upload_tree};

use common::{Call, MockTransport};

fn ok(entries: Vec<UploadEntry>) -> Vec<Result<UploadEntry, ExecError>> {
    entries.into_iter().map(Ok).collect()
}

fn site_archive() -> Vec<UploadEntry> {
    vec![
        UploadEntry::directory("site/"),
        UploadEntry::file("site/index.html", "<h1>hi</h1>"),
        UploadEntry::directory("site/css/"),
        UploadEntry::file("site/css/app.css", "body {}"),
        UploadEntry::file("site/css/print.css", "@media print {}"),
        UploadEntry::file("site/js/app.js", "main()"),
    ]
}

#[tokio::test]
async fn test_tree_upload_transfers_every_file_once() {
    let transport = MockTransport::new();

    let summary = upload_tree(&transport, ok(site_archive()), "/var/www", None)
        .await
        .unwrap();

    let writes = transport.writes();
    assert_eq!(
        writes,
        vec![
            "/var/www/index.html",
            "/var/www/css/app.css",
            "/var/www/css/print.css",
            "/var/www/js/app.js",
        ]
    );
    assert_eq!(summary.files, writes);

    let mkdirs = transport.mkdirs();
    assert_eq!(mkdirs, vec!["/var/www", "/var/www/css", "/var/www/js"]);
    assert!(mkdirs.len() <= writes.len());
    assert!(
        writes
            .iter()
            .chain(mkdirs.iter())
            .all(|p| p.starts_with("/var/www"))
    );
}

#[tokio::test]
async fn test_parent_is_ensured_before_each_new_directory_write() {
    let transport = MockTransport::new();

    upload_tree(&transport, ok(site_archive()), "/var/www/", None)
        .await
        .unwrap();

    let calls = transport.calls();
    let mkdir_css = calls
        .iter()
        .position(|c| c == &Call::Mkdir("/var/www/css".to_string()))
        .unwrap();
    let write_css = calls
        .iter()
        .position(|c| matches!(c, Call::Write(p, _) if p == "/var/www/css/app.css"))
        .unwrap();
    assert!(mkdir_css < write_css);
}

#[tokio::test]
async fn test_file_contents_transferred_verbatim() {
    let transport = MockTransport::new();
    let entries = vec![UploadEntry::file("pkg/bin/tool", vec![0u8, 159, 146, 150])];

    upload_tree(&transport, ok(entries), "/opt", None)
        .await
        .unwrap();

    assert!(
        transport
            .calls()
            .contains(&Call::Write("/opt/bin/tool".to_string(), vec![0, 159, 146, 150]))
    );
}

#[tokio::test]
async fn test_relative_destination_root_rejected_before_transport() {
    let transport = MockTransport::new();

    let err = upload_tree(&transport, ok(site_archive()), "var/www", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Config(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_single_file_to_relative_path_rejected() {
    let transport = MockTransport::new();

    let err = upload_file(&transport, b"# readme", "readme.md", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Config(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_single_file_to_directory_path_rejected() {
    let transport = MockTransport::new();

    let err = upload_file(&transport, b"# readme", "/srv/docs/", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Config(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_single_file_skips_directory_creation() {
    let transport = MockTransport::new();

    upload_file(&transport, b"# readme", "/srv/docs/readme.md", None)
        .await
        .unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Write(
            "/srv/docs/readme.md".to_string(),
            b"# readme".to_vec()
        )]
    );
}

#[tokio::test]
async fn test_mkdir_failure_aborts_remaining_entries() {
    let transport = MockTransport::new().fail_mkdir("/var/www/css");

    let err = upload_tree(&transport, ok(site_archive()), "/var/www", None)
        .await
        .unwrap_err();

    match err {
        ExecError::RemoteFs { path, .. } => assert_eq!(path, "/var/www/css"),
        other => panic!("expected RemoteFs, got {other:?}"),
    }
    // Written before the failure, and nothing after it
    assert_eq!(transport.writes(), vec!["/var/www/index.html"]);
}

#[tokio::test]
async fn test_transfer_failure_names_path() {
    let transport = MockTransport::new().fail_write("/var/www/css/app.css");

    let err = upload_tree(&transport, ok(site_archive()), "/var/www", None)
        .await
        .unwrap_err();

    match err {
        ExecError::Transfer { path, cause } => {
            assert_eq!(path, "/var/www/css/app.css");
            assert!(cause.contains("no space"));
        }
        other => panic!("expected Transfer, got {other:?}"),
    }
    assert!(!transport.writes().contains(&"/var/www/js/app.js".to_string()));
}

#[tokio::test]
async fn test_entry_outside_common_root_rejected() {
    let transport = MockTransport::new();
    let entries = vec![
        UploadEntry::file("site/index.html", "a"),
        UploadEntry::file("other/secret.txt", "b"),
    ];

    let err = upload_tree(&transport, ok(entries), "/var/www", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::ArchiveFormat(_)));
    assert_eq!(transport.writes(), vec!["/var/www/index.html"]);
}

#[tokio::test]
async fn test_flat_archive_keeps_paths() {
    let transport = MockTransport::new();
    let entries = vec![
        UploadEntry::file("readme.md", "a"),
        UploadEntry::file("docs/guide.md", "b"),
    ];

    upload_tree(&transport, ok(entries), "/srv", None)
        .await
        .unwrap();

    assert_eq!(transport.writes(), vec!["/srv/readme.md", "/srv/docs/guide.md"]);
}

#[tokio::test]
async fn test_enumerator_error_passed_through() {
    let transport = MockTransport::new();
    let entries: Vec<Result<UploadEntry, ExecError>> = vec![
        Ok(UploadEntry::file("site/a.txt", "a")),
        Err(ExecError::ArchiveFormat("corrupt entry 2".to_string())),
        Ok(UploadEntry::file("site/b.txt", "b")),
    ];

    let err = upload_tree(&transport, entries, "/srv", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::ArchiveFormat(ref m) if m.contains("corrupt")));
    assert_eq!(transport.writes(), vec!["/srv/a.txt"]);
}
