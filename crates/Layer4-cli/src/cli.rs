//! Non-interactive CLI mode - 한 번의 턴과 `--shell` 후속 선택

use crate::terminal::{run_command, Input};
use serde_json::Value;
use shellforge_agent::{AgentEvent, ChatTarget, SessionController, TurnRequest, TurnResult};
use shellforge_core::DESCRIBE_SHELL_ROLE;
use shellforge_foundation::{FunctionCall, Result};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How turn events are shown
#[derive(Debug, Clone, Copy, Default)]
pub struct Display {
    pub show_functions_output: bool,
}

/// Run one turn, printing the response as it streams
///
/// Ctrl+C cancels the turn; nothing is recorded.
pub async fn run_turn(
    controller: &SessionController,
    request: TurnRequest,
    display: Display,
) -> Result<TurnResult> {
    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_handler(cancel.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, display));

    let result = controller.run(request, &cancel, Some(&tx)).await;

    drop(tx);
    let _ = printer.await;
    interrupt.abort();
    result
}

fn spawn_interrupt_handler(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<AgentEvent>, display: Display) {
    let mut stdout = io::stdout();
    let mut at_line_start = true;

    while let Some(event) = rx.recv().await {
        let text = match event {
            AgentEvent::Text(text) => text,
            AgentEvent::FunctionCall(call) => {
                let prefix = if at_line_start { "" } else { "\n" };
                format!("{}{}\n\n", prefix, format_function_call(&call))
            }
            AgentEvent::FunctionOutput { output, .. } if display.show_functions_output => {
                format!("```text\n{}\n```\n", output.trim_end())
            }
            AgentEvent::FunctionOutput { .. } | AgentEvent::CacheHit => continue,
            AgentEvent::ChatResolved { chat_id, resumed } => {
                if resumed {
                    eprintln!("[ Resuming chat session: {} ]", chat_id);
                } else {
                    eprintln!("[ No previous chat session found. Starting new default session. ]");
                }
                continue;
            }
            AgentEvent::ChatRenamed { to, .. } => {
                if !at_line_start {
                    let _ = writeln!(stdout);
                    at_line_start = true;
                }
                eprintln!("[ Chat session created: {} ]", to);
                continue;
            }
        };

        if text.is_empty() {
            continue;
        }
        at_line_start = text.ends_with('\n');
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
    }

    if !at_line_start {
        let _ = writeln!(stdout);
    }
}

/// `> @FunctionCall `name(key="value")``
pub fn format_function_call(call: &FunctionCall) -> String {
    let arguments = match call.parsed_arguments() {
        Ok(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}=\"{}\"", key, s),
                other => format!("{}=\"{}\"", key, other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => call.arguments.clone(),
    };
    format!("> @FunctionCall `{}({})`", call.name, arguments)
}

// ============================================================================
// Shell interaction
// ============================================================================

/// Choice after a generated shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Execute,
    Modify,
    Describe,
    Abort,
}

impl ShellAction {
    /// Parse an answer; empty input takes `default`, unknown input is `None`
    pub fn parse(answer: &str, default: ShellAction) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "" => Some(default),
            // "y" is kept for muscle memory
            "e" | "y" => Some(ShellAction::Execute),
            "m" => Some(ShellAction::Modify),
            "d" => Some(ShellAction::Describe),
            "a" => Some(ShellAction::Abort),
            _ => None,
        }
    }
}

/// `[E]xecute, [M]odify, [D]escribe, [A]bort` loop
pub async fn interact_with_command(
    controller: &SessionController,
    mut command: String,
    template: &TurnRequest,
    input: &mut Input,
    default: ShellAction,
    display: Display,
) -> Result<()> {
    loop {
        let Some(answer) = input.read_line("[E]xecute, [M]odify, [D]escribe, [A]bort: ")? else {
            return Ok(());
        };
        let Some(action) = ShellAction::parse(&answer, default) else {
            eprintln!("Error: '{}' is not one of e, m, d, a.", answer.trim());
            continue;
        };

        match action {
            ShellAction::Execute => {
                let status = run_command(&command)?;
                if !status.success() {
                    warn!("Command exited with {}", status);
                }
                return Ok(());
            }
            ShellAction::Modify => {
                eprintln!("{}", command);
                if let Some(edited) = input.read_line("> ")? {
                    if !edited.trim().is_empty() {
                        command = edited;
                    }
                }
            }
            ShellAction::Describe => {
                let request = TurnRequest {
                    prompt: command.clone(),
                    role: DESCRIBE_SHELL_ROLE.to_string(),
                    chat: ChatTarget::Implicit,
                    ..template.clone()
                };
                run_turn(controller, request, display).await?;
            }
            ShellAction::Abort => return Ok(()),
        }
    }
}
