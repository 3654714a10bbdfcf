//! The `execute` and `upload` operations

use keyhop_content::{ByteFetcher, DefaultFetcher, ZipEntries};
use keyhop_exec::{
    CommandResult, Connector, ExecError, ProgressSink, SshConnector, execute_all, upload_file,
    upload_tree, with_session_using,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::params::{ExecuteParams, UploadParams};

/// What an upload wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UploadResponse {
    /// Content written to one remote file
    File {
        source: String,
        destination: String,
    },
    /// Archive tree recreated under a remote directory
    Archive {
        destination: String,
        files: Vec<String>,
        directories: Vec<String>,
    },
}

/// Run a command batch over SSH
///
/// # Errors
/// See [`execute_with`].
pub async fn execute(
    params: ExecuteParams,
    events: Option<&ProgressSink>,
) -> Result<Vec<CommandResult>, ExecError> {
    execute_with(&SshConnector::default(), params, events).await
}

/// Run a command batch through `connector`
///
/// Results come back in command order, one per command unless the batch policy stops
/// early.
///
/// # Errors
/// `ExecError::Config` for invalid parameters (no connection is attempted) or session
/// errors from the connector. A command the server refuses is reported in its result.
#[instrument(skip_all)]
pub async fn execute_with<C: Connector>(
    connector: &C,
    params: ExecuteParams,
    events: Option<&ProgressSink>,
) -> Result<Vec<CommandResult>, ExecError> {
    let request = params.prepare()?;
    info!(
        remote = %request.spec.target(),
        commands = request.commands.len(),
        "executing command batch"
    );

    with_session_using(connector, &request.spec, events, async |transport| {
        execute_all(transport, &request.commands, request.policy, events).await
    })
    .await
}

/// Upload content over SSH/SFTP
///
/// # Errors
/// See [`upload_with`].
pub async fn upload(
    params: UploadParams,
    events: Option<&ProgressSink>,
) -> Result<UploadResponse, ExecError> {
    upload_with(&SshConnector::default(), &DefaultFetcher::new(), params, events).await
}

/// Upload content through `connector`, resolving it with `fetcher`
///
/// Parameters are validated and the content fetched (and opened as an archive when
/// extracting) before any connection is made.
///
/// # Errors
/// `ExecError::Config` for invalid parameters, `ExecError::ResourceFetch` or
/// `ExecError::ArchiveFormat` for unusable content, `ExecError::ResourceUnavailable` if
/// the content host is down, session errors from the connector,
/// and `ExecError::RemoteFs` / `ExecError::Transfer` for the first failing path.
#[instrument(skip_all)]
pub async fn upload_with<C, F>(
    connector: &C,
    fetcher: &F,
    params: UploadParams,
    events: Option<&ProgressSink>,
) -> Result<UploadResponse, ExecError>
where
    C: Connector,
    F: ByteFetcher + ?Sized,
{
    let request = params.prepare()?;
    let source = request.content.describe();
    let bytes = fetcher.fetch(&request.content).await?;

    info!(
        remote = %request.spec.target(),
        source = %source,
        path = %request.path,
        extract = request.extract,
        "uploading content"
    );

    if request.extract {
        let entries = ZipEntries::new(bytes)?;
        let summary = with_session_using(connector, &request.spec, events, async |transport| {
            upload_tree(transport, entries, &request.path, events).await
        })
        .await?;

        Ok(UploadResponse::Archive {
            destination: request.path,
            files: summary.files,
            directories: summary.directories,
        })
    } else {
        with_session_using(connector, &request.spec, events, async |transport| {
            upload_file(transport, &bytes, &request.path, events).await
        })
        .await?;

        Ok(UploadResponse::File {
            source,
            destination: request.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_shape() {
        let response = UploadResponse::File {
            source: "https://example.org/readme.md".to_string(),
            destination: "/srv/readme.md".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["mode"], "file");
        assert_eq!(json["destination"], "/srv/readme.md");
    }
}
