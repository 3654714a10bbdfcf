//! Scoped session lifecycle
//!
//! A session stages the key, connects, runs the caller's body once, then closes the
//! transport and erases the key on every exit path. Release failures are logged and
//! never replace the body's result.

use tracing::{info, warn};

use crate::error::ExecError;
use crate::events::{ProgressEvent, ProgressSink, emit};
use crate::keys::{KeyError, StagedKey};
use crate::result::ConnectionSpec;
use crate::ssh::{SshConnector, SshTransport};
use crate::traits::{Connector, Transport};

/// Run `body` inside an SSH session for `spec`
///
/// # Errors
/// Returns `ExecError::Config` for an invalid spec, `ExecError::Authentication` or
/// `ExecError::Connection` if the session cannot be opened, or whatever `body` returns.
pub async fn with_session<T, E, F>(
    spec: &ConnectionSpec,
    events: Option<&ProgressSink>,
    body: F,
) -> Result<T, E>
where
    F: AsyncFnOnce(&SshTransport) -> Result<T, E>,
    E: From<ExecError>,
{
    with_session_using(&SshConnector::default(), spec, events, body).await
}

/// [`with_session`] over any [`Connector`]
///
/// # Errors
/// See [`with_session`].
pub async fn with_session_using<C, T, E, F>(
    connector: &C,
    spec: &ConnectionSpec,
    events: Option<&ProgressSink>,
    body: F,
) -> Result<T, E>
where
    C: Connector,
    F: AsyncFnOnce(&C::Transport) -> Result<T, E>,
    E: From<ExecError>,
{
    spec.validate()?;

    let mut key = StagedKey::stage(&spec.private_key).map_err(|e| match e {
        KeyError::Empty => ExecError::config("private key is required"),
        KeyError::Io(e) => ExecError::Io(format!("failed to set up private key: {e}")),
    })?;
    emit(events, ProgressEvent::KeyStaged);

    let transport = match connector.connect(spec, key.path()).await {
        Ok(transport) => transport,
        Err(e) => {
            release_key(&mut key);
            return Err(e.into());
        }
    };
    emit(
        events,
        ProgressEvent::Connected {
            target: spec.target(),
        },
    );

    let result = body(&transport).await;

    info!(target_host = %spec.target(), "cleaning up session");
    emit(events, ProgressEvent::CleaningUp);
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close transport");
    }
    release_key(&mut key);

    result
}

fn release_key(key: &mut StagedKey) {
    if let Err(e) = key.erase() {
        warn!(
            path = %key.path().display(),
            error = %e,
            "failed to clean up private key, continuing"
        );
    }
}
