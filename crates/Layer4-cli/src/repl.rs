//! REPL mode - 하나의 chat 세션에서 여러 턴

use crate::cli::{run_turn, Display};
use crate::terminal::Input;
use shellforge_agent::{ChatTarget, SessionController, TurnRequest, TurnResult};
use shellforge_foundation::Result;
use tracing::debug;

const PROMPT: &str = ">>> ";
const MULTILINE: &str = "\"\"\"";
const EXIT: &str = "exit()";

/// One parsed REPL entry
#[derive(Debug, PartialEq, Eq)]
pub enum Entry {
    Prompt(String),
    Skip,
    Exit,
}

/// Read the next entry; `"""` opens a block that runs until the closing `"""`
pub fn read_entry(input: &mut Input) -> std::io::Result<Entry> {
    let Some(line) = input.read_line(PROMPT)? else {
        return Ok(Entry::Exit);
    };
    let trimmed = line.trim();

    if trimmed == EXIT {
        return Ok(Entry::Exit);
    }
    if trimmed != MULTILINE {
        return Ok(if trimmed.is_empty() {
            Entry::Skip
        } else {
            Entry::Prompt(line)
        });
    }

    let mut lines = Vec::new();
    loop {
        match input.read_line("... ")? {
            Some(l) if l.trim() == MULTILINE => break,
            Some(l) => lines.push(l),
            None => return Ok(Entry::Exit),
        }
    }
    let block = lines.join("\n");
    Ok(if block.trim().is_empty() {
        Entry::Skip
    } else {
        Entry::Prompt(block)
    })
}

/// Chat the REPL writes to
///
/// `auto` and `last` are resolved by the first turn; later lines stay in the
/// session that turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplSession {
    chat: ChatTarget,
}

impl ReplSession {
    pub fn new(chat_id: &str) -> Self {
        Self {
            chat: ChatTarget::named(chat_id),
        }
    }

    pub fn chat(&self) -> &ChatTarget {
        &self.chat
    }

    /// Run one line as a turn in this session
    pub async fn submit(
        &mut self,
        controller: &SessionController,
        prompt: String,
        template: &TurnRequest,
        display: Display,
    ) -> Result<TurnResult> {
        let request = TurnRequest {
            prompt,
            chat: self.chat.clone(),
            ..template.clone()
        };
        let result = run_turn(controller, request, display).await?;
        if let Some(id) = &result.chat_id {
            self.chat = ChatTarget::named(id.clone());
        }
        Ok(result)
    }
}

/// Run the REPL on `chat_id` until `exit()` or EOF
///
/// `init_prompt` (positional prompt or stdin) runs as the first turn. Turn
/// errors are printed and the loop continues.
pub async fn run(
    controller: &SessionController,
    chat_id: &str,
    init_prompt: Option<String>,
    template: TurnRequest,
    input: &mut Input,
    display: Display,
) {
    eprintln!(
        "Entering REPL mode, press Ctrl+C to cancel a response. Type \"exit()\" to quit, \"{}\" for multi-line input.",
        MULTILINE
    );

    let mut session = ReplSession::new(chat_id);
    if let Some(prompt) = init_prompt.filter(|p| !p.trim().is_empty()) {
        report(session.submit(controller, prompt, &template, display).await);
    }

    loop {
        match read_entry(input) {
            Ok(Entry::Prompt(prompt)) => {
                report(session.submit(controller, prompt, &template, display).await)
            }
            Ok(Entry::Skip) => continue,
            Ok(Entry::Exit) => break,
            Err(e) => {
                debug!("REPL input closed: {}", e);
                break;
            }
        }
    }
}

fn report(result: Result<TurnResult>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}
