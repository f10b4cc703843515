use epimem_core::{DONT_KNOW, TaskMode};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub const HELP: &str = "commands: start <subject> [recall|rappel_immediat] | respond <token> (r) | \
dontknow | jump <index> | stop | status | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start { subject: String, mode: TaskMode },
    Respond(String),
    Jump(usize),
    Stop,
    Status,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let arg = words.next();

        match verb.to_ascii_lowercase().as_str() {
            "start" => {
                let mode = match words.next() {
                    Some(mode) => mode.parse()?,
                    None => TaskMode::default(),
                };
                Ok(ConsoleCommand::Start {
                    subject: arg.unwrap_or_default().to_string(),
                    mode,
                })
            }
            "respond" | "r" => arg
                .map(|token| ConsoleCommand::Respond(token.to_string()))
                .ok_or_else(|| "respond needs a choice token".to_string()),
            "dontknow" | "dk" => Ok(ConsoleCommand::Respond(DONT_KNOW.to_string())),
            "jump" => arg
                .and_then(|n| n.parse().ok())
                .map(ConsoleCommand::Jump)
                .ok_or_else(|| "jump needs a task index".to_string()),
            "stop" => Ok(ConsoleCommand::Stop),
            "status" => Ok(ConsoleCommand::Status),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("unknown command '{other}'; {HELP}")),
        }
    }
}

/// Reads operator commands from stdin; end of input becomes `Quit`
pub fn spawn_reader(commands: mpsc::Sender<ConsoleCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        if commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                },
                Ok(None) => {
                    let _ = commands.send(ConsoleCommand::Quit).await;
                    break;
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    let _ = commands.send(ConsoleCommand::Quit).await;
                    break;
                }
            }
        }
    })
}
