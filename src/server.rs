use std::{fs, io::ErrorKind, os::unix::fs::FileTypeExt, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    collaborators::Collaborators,
    config::Config,
    cycle::ResolutionCycle,
    dispatch::StrategyDispatcher,
    feedback::FeedbackHandler,
    intake::IntakeHandler,
    ledger::SharedLedger,
    protocol::{ClientMessage, ServerMessage, encode_server_message, parse_client_message},
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

#[derive(Clone)]
struct ClientContext {
    intake: IntakeHandler,
    feedback: FeedbackHandler,
    exit_tx: mpsc::UnboundedSender<()>,
}

pub async fn run(config: Config, collaborators: Collaborators) -> Result<()> {
    let socket_path = config.server.socket_path.clone();
    prepare_socket_path(&socket_path)?;
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("unable to bind socket {}", socket_path.display()))?;

    let ledger = SharedLedger::new();
    let dispatcher = Arc::new(StrategyDispatcher::new(
        &collaborators,
        config.dispatch.clone(),
    ));
    let cycle = ResolutionCycle::new(
        ledger.clone(),
        dispatcher,
        Arc::clone(&collaborators.notifications),
        config.resolution.clone(),
    );
    let shutdown = CancellationToken::new();
    let cycle_task = tokio::spawn(cycle.run(shutdown.child_token()));

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<()>();
    let context = ClientContext {
        intake: IntakeHandler::new(ledger.clone()),
        feedback: FeedbackHandler::new(ledger),
        exit_tx,
    };

    tracing::info!(
        target: "server",
        socket_path = %socket_path.display(),
        interval_ms = config.resolution.interval_ms,
        "server_listening"
    );
    eprintln!(
        "uspace-em listening on unix socket (NDJSON): {}",
        socket_path.display()
    );

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = exit_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let context = context.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_client(stream, context).await {
                                tracing::warn!(target: "server", error = %format!("{err:#}"), "client_handling_failed");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(target: "server", error = %err, "accept_failed");
                    }
                }
            }
        }
    };

    shutdown.cancel();
    cycle_task
        .await
        .context("resolution cycle task join failed")?;

    cleanup_socket_path(&socket_path)?;
    let reason = match exit_reason {
        ExitReason::SocketMessage => "exit message",
        ExitReason::Signal(signal_name) => signal_name,
    };
    tracing::info!(target: "server", reason = reason, "server_stopped");
    eprintln!("uspace-em stopped: received {reason}");

    Ok(())
}

async fn handle_client(stream: UnixStream, context: ClientContext) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_client_message(line) {
            Ok(ClientMessage::Exit) => {
                let _ = context.exit_tx.send(());
                break;
            }
            Ok(ClientMessage::SubmitThreats(threats)) => {
                ServerMessage::from(context.intake.submit_batch(threats).await)
            }
            Ok(ClientMessage::SubmitPilotAnswers(answers)) => {
                ServerMessage::from(context.feedback.submit_answers(answers).await)
            }
            Ok(ClientMessage::RemoveThreats(threat_ids)) => {
                ServerMessage::from(context.intake.remove_batch(threat_ids).await)
            }
            Err(err) => {
                tracing::debug!(target: "server", error = %err, "invalid_protocol_message");
                ServerMessage::Error {
                    message: format!("invalid protocol message: {err}"),
                }
            }
        };

        let encoded = encode_server_message(&reply).context("failed to encode reply")?;
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
    }

    Ok(())
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}
