//! Terminal I/O - stdin 프롬프트, $EDITOR, 사용자 입력, 명령 실행

use shellforge_core::user_shell;
use shellforge_foundation::{Error, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Read, Write};
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Piped stdin content, `None` when stdin is a terminal
pub fn read_piped_stdin() -> io::Result<Option<String>> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut content = String::new();
    stdin.read_to_string(&mut content)?;
    Ok(Some(content))
}

/// `<stdin>\n\n<prompt>`, or just the stdin text when there is no prompt
pub fn combine_prompt(stdin: &str, prompt: &str) -> String {
    if prompt.is_empty() {
        stdin.to_string()
    } else {
        format!("{}\n\n{}", stdin, prompt)
    }
}

/// Let the user write the prompt in `$EDITOR`
pub fn edited_prompt() -> Result<String> {
    let file = tempfile::Builder::new()
        .prefix("sforge-")
        .suffix(".txt")
        .tempfile()?;
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vim".to_string());

    // EDITOR may carry flags ("code --wait")
    let mut parts = shlex::split(&editor)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid $EDITOR: {}", editor)))?;
    let program = parts.remove(0);

    let status = Command::new(&program).args(&parts).arg(file.path()).status()?;
    if !status.success() {
        return Err(Error::InvalidInput(format!("{} exited with {}", program, status)));
    }

    let content = std::fs::read_to_string(file.path())?;
    if content.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Couldn't get valid PROMPT from $EDITOR".to_string(),
        ));
    }
    Ok(content)
}

/// Line-based input for interactive prompts
///
/// When stdin carried the prompt, answers are read from the controlling
/// terminal instead.
pub struct Input {
    reader: Box<dyn BufRead + Send>,
}

impl Input {
    pub fn open(stdin_consumed: bool) -> Option<Self> {
        if !stdin_consumed {
            return Some(Self {
                reader: Box::new(BufReader::new(io::stdin())),
            });
        }
        match File::open(tty_path()) {
            Ok(tty) => Some(Self {
                reader: Box::new(BufReader::new(tty)),
            }),
            Err(e) => {
                debug!("No terminal for interactive input: {}", e);
                None
            }
        }
    }

    #[cfg(test)]
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Print `prompt` to stderr and read one line; `None` on EOF
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

fn tty_path() -> &'static str {
    if cfg!(windows) {
        "CON"
    } else {
        "/dev/tty"
    }
}

/// Run a generated command in the user's shell, attached to this terminal
pub fn run_command(command: &str) -> io::Result<ExitStatus> {
    let (shell, flag) = user_shell();
    debug!(
        "Running: {} {} {}",
        shell,
        flag,
        shlex::try_quote(command).unwrap_or_else(|_| command.into())
    );
    Command::new(&shell).arg(flag).arg(command).status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_combine_prompt() {
        assert_eq!(combine_prompt("log line", "explain"), "log line\n\nexplain");
        assert_eq!(combine_prompt("log line", ""), "log line");
    }

    #[test]
    fn test_input_read_line() {
        let mut input = Input::from_reader(Cursor::new("e\r\nsecond\n"));
        assert_eq!(input.read_line("").unwrap().as_deref(), Some("e"));
        assert_eq!(input.read_line("").unwrap().as_deref(), Some("second"));
        assert_eq!(input.read_line("").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command() {
        let status = run_command("exit 3").unwrap();
        assert_eq!(status.code(), Some(3));
    }
}
