use std::io::{Cursor, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use zip::write::SimpleFileOptions;

use keyhop_content::ZipEntries;
use keyhop_exec::{ExecChannel, ExecError, Transport, upload_tree};

/// Records directory and file writes, refuses command execution
#[derive(Default)]
struct RecordingTransport {
    mkdirs: Mutex<Vec<String>>,
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn open_exec(&self, command: &str) -> Result<Box<dyn ExecChannel>, ExecError> {
        Err(ExecError::ExecutionRejected {
            command: command.to_string(),
            reason: "exec not supported".to_string(),
        })
    }

    async fn create_dir_all(&self, path: &str) -> Result<(), ExecError> {
        self.mkdirs.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), ExecError> {
        self.files
            .lock()
            .unwrap()
            .push((path.to_string(), contents.to_vec()));
        Ok(())
    }

    async fn close(&self) -> Result<(), ExecError> {
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "recording"
    }
}

fn zip_of(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        match content {
            Some(bytes) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
            None => writer.add_directory(*name, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_zip_tree_lands_under_destination() {
    let bytes = zip_of(&[
        ("dist/", None),
        ("dist/index.html", Some(b"<html></html>".as_slice())),
        ("dist/assets/", None),
        ("dist/assets/logo.png", Some([137u8, 80, 78, 71].as_slice())),
    ]);
    let transport = RecordingTransport::default();

    let summary = upload_tree(&transport, ZipEntries::new(bytes).unwrap(), "/srv/app", None)
        .await
        .unwrap();

    assert_eq!(
        summary.files,
        vec!["/srv/app/index.html", "/srv/app/assets/logo.png"]
    );
    assert_eq!(
        *transport.mkdirs.lock().unwrap(),
        vec!["/srv/app", "/srv/app/assets"]
    );
    let files = transport.files.lock().unwrap();
    assert_eq!(files[1].1, vec![137, 80, 78, 71]);
}

#[tokio::test]
async fn test_zip_with_escaping_entry_is_rejected() {
    let bytes = zip_of(&[
        ("dist/index.html", Some(b"ok".as_slice())),
        ("elsewhere/passwd", Some(b"nope".as_slice())),
    ]);
    let transport = RecordingTransport::default();

    let err = upload_tree(&transport, ZipEntries::new(bytes).unwrap(), "/srv/app", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::ArchiveFormat(_)));
    assert_eq!(transport.files.lock().unwrap().len(), 1);
}
