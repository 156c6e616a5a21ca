use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::UnixStream,
};

const USAGE: &str = "usage: uspace-em-cli --socket-path <path> \
(submit <threats.json> | answer <threat_id> <accepted|rejected> | remove <threat_id>... | exit)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Submit { threats_path: PathBuf },
    Answer { threat_id: u64, answer: String },
    Remove { threat_ids: Vec<u64> },
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    socket_path: PathBuf,
    command: Command,
}

fn cli_options_from_args() -> Result<CliOptions> {
    parse_cli_options(env::args().skip(1))
}

fn parse_cli_options<I>(mut args: I) -> Result<CliOptions>
where
    I: Iterator<Item = String>,
{
    let mut socket_path = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--socket-path" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --socket-path"))?;
                socket_path = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => {
                return Err(anyhow!("unknown argument: {flag}. {USAGE}"));
            }
            _ => positional.push(arg),
        }
    }

    let socket_path =
        socket_path.ok_or_else(|| anyhow!("missing required argument --socket-path. {USAGE}"))?;
    let command = match positional
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .as_slice()
    {
        ["submit", path] => Command::Submit {
            threats_path: PathBuf::from(path),
        },
        ["answer", threat_id, answer @ ("accepted" | "rejected")] => Command::Answer {
            threat_id: threat_id
                .parse()
                .with_context(|| format!("threat id '{threat_id}' is not a number"))?,
            answer: answer.to_string(),
        },
        ["remove", threat_ids @ ..] if !threat_ids.is_empty() => Command::Remove {
            threat_ids: threat_ids
                .iter()
                .map(|threat_id| {
                    threat_id
                        .parse()
                        .with_context(|| format!("threat id '{threat_id}' is not a number"))
                })
                .collect::<Result<_>>()?,
        },
        ["exit"] => Command::Exit,
        _ => return Err(anyhow!("unrecognized command. {USAGE}")),
    };

    Ok(CliOptions {
        socket_path,
        command,
    })
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    SubmitThreats { threats: Vec<Value> },
    SubmitPilotAnswers { answers: Vec<AnswerItem> },
    RemoveThreats { threat_ids: Vec<u64> },
    Exit,
}

#[derive(Debug, Serialize)]
struct AnswerItem {
    threat_id: u64,
    answer: String,
}

async fn build_message(command: &Command) -> Result<ClientMessage> {
    let message = match command {
        Command::Submit { threats_path } => {
            let content = tokio::fs::read_to_string(threats_path)
                .await
                .with_context(|| format!("failed to read {}", threats_path.display()))?;
            let threats = match serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", threats_path.display()))?
            {
                Value::Array(threats) => threats,
                single @ Value::Object(_) => vec![single],
                _ => return Err(anyhow!("threat file must hold an object or an array")),
            };
            ClientMessage::SubmitThreats { threats }
        }
        Command::Answer { threat_id, answer } => ClientMessage::SubmitPilotAnswers {
            answers: vec![AnswerItem {
                threat_id: *threat_id,
                answer: answer.clone(),
            }],
        },
        Command::Remove { threat_ids } => ClientMessage::RemoveThreats {
            threat_ids: threat_ids.clone(),
        },
        Command::Exit => ClientMessage::Exit,
    };
    Ok(message)
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = cli_options_from_args()?;
    let message = build_message(&options.command).await?;
    let stream = UnixStream::connect(&options.socket_path)
        .await
        .with_context(|| {
            format!(
                "failed to connect to uspace-em socket {}",
                options.socket_path.display()
            )
        })?;

    let (read_half, mut write_half) = stream.into_split();
    send_message(&mut write_half, &message).await?;
    if options.command == Command::Exit {
        return Ok(());
    }

    let mut socket_lines = BufReader::new(read_half).lines();
    let reply = socket_lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow!("server closed the connection without replying"))?;
    println!("{}", reply.trim());
    Ok(())
}

async fn send_message<W>(writer: &mut W, message: &ClientMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = serde_json::to_string(message)?;
    writer.write_all(encoded.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
