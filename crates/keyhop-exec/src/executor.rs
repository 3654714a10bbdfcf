//! Remote command execution over a [`Transport`]

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::events::{OutputStream, ProgressEvent, ProgressSink, emit};
use crate::result::{CommandResult, signal_number};
use crate::text::{normalize, normalize_lines};
use crate::traits::{ChannelEvent, Transport};

/// What a batch does after a command exits unsuccessfully
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Run every command regardless of exit status
    #[default]
    RunAll,
    /// Stop after the first command that does not exit 0
    StopOnFailure,
}

/// Run one command and collect its output
///
/// Stdout, stderr and exit notices are drained from the channel in whatever order the
/// server sends them until the channel closes. Non-zero exits and signals are returned
/// as data.
///
/// # Errors
/// Returns `ExecError::ExecutionRejected` if the channel cannot be opened or the server
/// refuses the exec request.
#[instrument(skip(transport, events), fields(transport = transport.transport_type()))]
pub async fn execute<T>(
    transport: &T,
    command: &str,
    events: Option<&ProgressSink>,
) -> Result<CommandResult, ExecError>
where
    T: Transport + ?Sized,
{
    debug!(command = %command, "executing remote command");
    emit(
        events,
        ProgressEvent::Executing {
            command: command.to_string(),
        },
    );

    let mut channel = transport.open_exec(command).await?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut signal_name = None;

    while let Some(event) = channel.next_event().await {
        match event {
            ChannelEvent::Stdout(data) => {
                emit_chunk(events, command, OutputStream::Stdout, &data);
                stdout.extend_from_slice(&data);
            }
            ChannelEvent::Stderr(data) => {
                emit_chunk(events, command, OutputStream::Stderr, &data);
                stderr.extend_from_slice(&data);
            }
            ChannelEvent::ExitStatus(status) => {
                exit_code = Some(status.cast_signed());
            }
            ChannelEvent::ExitSignal { name, core_dumped } => {
                debug!(command = %command, signal = %name, core_dumped, "killed by signal");
                signal_name = Some(name);
            }
            ChannelEvent::Rejected => {
                return Err(ExecError::ExecutionRejected {
                    command: command.to_string(),
                    reason: "request refused by server".to_string(),
                });
            }
            // Exit status may still follow
            ChannelEvent::Eof => {}
        }
    }

    let result = CommandResult {
        command: command.to_string(),
        stdout: normalize_lines(&stdout),
        stderr: normalize_lines(&stderr),
        exit_code,
        exit_signal: signal_name.as_deref().and_then(signal_number),
        signal_name,
        rejected: None,
    };

    if result.is_complete() {
        debug!(
            command = %command,
            exit_code = ?result.exit_code,
            signal = ?result.signal_name,
            "remote command completed"
        );
        emit(
            events,
            ProgressEvent::Exited {
                command: command.to_string(),
                exit_code: result.exit_code,
                signal: result.signal_name.clone(),
            },
        );
    } else {
        warn!(command = %command, "channel closed without exit status");
        emit(
            events,
            ProgressEvent::IncompleteResult {
                command: command.to_string(),
            },
        );
    }

    Ok(result)
}

/// Run `commands` one at a time, in order, on the same transport
///
/// Each command's channel is fully closed before the next one opens. A command the
/// server refuses to start is recorded as a [`CommandResult::rejected`] entry and counts
/// as a failed command. With [`BatchPolicy::RunAll`] the result has one entry per command.
///
/// # Errors
/// Returns any error other than `ExecError::ExecutionRejected` raised while starting a
/// command.
pub async fn execute_all<T, S>(
    transport: &T,
    commands: &[S],
    policy: BatchPolicy,
    events: Option<&ProgressSink>,
) -> Result<Vec<CommandResult>, ExecError>
where
    T: Transport + ?Sized,
    S: AsRef<str>,
{
    let mut results = Vec::with_capacity(commands.len());

    for command in commands {
        let result = match execute(transport, command.as_ref(), events).await {
            Ok(result) => result,
            Err(ExecError::ExecutionRejected { command, reason }) => {
                warn!(command = %command, reason = %reason, "command rejected by server");
                emit(
                    events,
                    ProgressEvent::Rejected {
                        command: command.clone(),
                        reason: reason.clone(),
                    },
                );
                CommandResult::rejected(command, reason)
            }
            Err(e) => return Err(e),
        };
        let failed = !result.success();
        results.push(result);

        if failed && policy == BatchPolicy::StopOnFailure {
            debug!(command = %command.as_ref(), "stopping batch after failed command");
            break;
        }
    }

    Ok(results)
}

fn emit_chunk(events: Option<&ProgressSink>, command: &str, stream: OutputStream, data: &[u8]) {
    if events.is_some() {
        emit(
            events,
            ProgressEvent::Output {
                command: command.to_string(),
                stream,
                chunk: normalize(data),
            },
        );
    }
}
