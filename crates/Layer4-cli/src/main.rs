//! ShellForge CLI - Main entry point

mod chats;
mod cli;
mod repl;
mod roles;
mod terminal;

use anyhow::Context;
use clap::Parser;
use cli::{interact_with_command, run_turn, Display, ShellAction};
use shellforge_agent::{ChatTarget, SessionController, TurnRequest};
use shellforge_core::{RoleResolver, CODE_ROLE, DEFAULT_ROLE, DESCRIBE_SHELL_ROLE, SHELL_ROLE};
use shellforge_foundation::{Error, SessionStore, ShellforgeConfig};
use shellforge_provider::OpenAiProvider;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use terminal::{combine_prompt, edited_prompt, read_piped_stdin, Input};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ShellForge - a command-line productivity tool powered by LLMs
#[derive(Parser, Debug)]
#[command(name = "sforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The prompt to generate completions for
    #[arg(default_value = "")]
    prompt: String,

    /// Large language model to use
    #[arg(long)]
    model: Option<String>,

    /// Randomness of generated output
    #[arg(long, value_parser = parse_temperature)]
    temperature: Option<f64>,

    /// Limits highest probable tokens (words)
    #[arg(long, value_parser = parse_top_p)]
    top_p: Option<f64>,

    /// Maximum number of tokens to generate
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=128_000))]
    max_tokens: Option<u32>,

    /// Generate and execute shell commands
    #[arg(short, long, help_heading = "Assistance Options")]
    shell: bool,

    /// Describe a shell command
    #[arg(short, long, help_heading = "Assistance Options")]
    describe_shell: bool,

    /// Generate only code
    #[arg(short, long, help_heading = "Assistance Options")]
    code: bool,

    /// Allow function calls
    #[arg(long, conflicts_with = "no_functions", help_heading = "Assistance Options")]
    functions: bool,

    /// Disallow function calls
    #[arg(long, help_heading = "Assistance Options")]
    no_functions: bool,

    /// Open $EDITOR to provide a prompt
    #[arg(long, help_heading = "Assistance Options")]
    editor: bool,

    /// Do not cache completion results
    #[arg(long, help_heading = "Assistance Options")]
    no_cache: bool,

    /// Do not ask what to do with a generated shell command
    #[arg(long, help_heading = "Assistance Options")]
    no_interaction: bool,

    /// Follow conversation with id, use "temp" for quick session
    #[arg(long, help_heading = "Chat Options")]
    chat: Option<String>,

    /// Resume the most recent chat session
    #[arg(short, long, help_heading = "Chat Options")]
    resume: bool,

    /// Start a REPL (Read-eval-print loop) session
    #[arg(long, value_name = "CHAT", help_heading = "Chat Options")]
    repl: Option<String>,

    /// Show all messages from provided chat id
    #[arg(long, value_name = "CHAT", help_heading = "Chat Options")]
    show_chat: Option<String>,

    /// List all existing chat ids
    #[arg(short, long, help_heading = "Chat Options")]
    list_chats: bool,

    /// Chat id candidates for shell completion
    #[arg(long, value_name = "PREFIX", num_args = 0..=1, default_missing_value = "", hide = true)]
    complete_chat_id: Option<String>,

    /// System role for GPT model
    #[arg(long, help_heading = "Role Options")]
    role: Option<String>,

    /// Create role
    #[arg(long, value_name = "NAME", help_heading = "Role Options")]
    create_role: Option<String>,

    /// Show role
    #[arg(long, value_name = "NAME", help_heading = "Role Options")]
    show_role: Option<String>,

    /// List roles
    #[arg(long, help_heading = "Role Options")]
    list_roles: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_temperature(value: &str) -> Result<f64, String> {
    parse_bounded(value, 0.0, 2.0)
}

fn parse_top_p(value: &str) -> Result<f64, String> {
    parse_bounded(value, 0.0, 1.0)
}

fn parse_bounded(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("{} is not a number", value))?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{} is not in the range {}..={}", parsed, min, max))
    }
}

impl Args {
    /// Mutually exclusive option checks clap cannot express
    fn validate(&self, stdin_passed: bool) -> shellforge_foundation::Result<()> {
        let modes = [self.shell, self.describe_shell, self.code];
        if modes.iter().filter(|m| **m).count() > 1 {
            return Err(Error::InvalidInput(
                "Only one of --shell, --describe-shell, and --code options can be used at a time."
                    .to_string(),
            ));
        }
        if self.chat.is_some() && self.repl.is_some() {
            return Err(Error::InvalidInput(
                "--chat and --repl options cannot be used together.".to_string(),
            ));
        }
        if self.chat.is_some() && self.resume {
            return Err(Error::InvalidInput(
                "--chat and --resume options cannot be used together.".to_string(),
            ));
        }
        if self.editor && stdin_passed {
            return Err(Error::InvalidInput(
                "--editor option cannot be used with stdin input.".to_string(),
            ));
        }
        Ok(())
    }

    /// `--role` wins over the mode flags
    fn role_name(&self) -> &str {
        if let Some(role) = &self.role {
            return role;
        }
        if self.shell {
            SHELL_ROLE
        } else if self.describe_shell {
            DESCRIBE_SHELL_ROLE
        } else if self.code {
            CODE_ROLE
        } else {
            DEFAULT_ROLE
        }
    }

    fn chat_target(&self) -> ChatTarget {
        match (&self.chat, self.resume) {
            (Some(id), _) => ChatTarget::named(id),
            (None, true) => ChatTarget::Resume,
            (None, false) => ChatTarget::Implicit,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let user_facing = e
                .downcast_ref::<Error>()
                .is_some_and(Error::is_user_facing);
            if user_facing {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ShellforgeConfig::load()?;
    tracing::debug!("Config loaded (model: {})", config.default_model);

    // ------------------------------------------------------------------
    // Meta commands (no model call)
    // ------------------------------------------------------------------
    if let Some(prefix) = &args.complete_chat_id {
        let store = SessionStore::new(config.chat_cache_path.clone(), config.chat_cache_length);
        chats::complete_chat_id(&store, prefix);
        return Ok(());
    }
    if args.list_chats {
        let store = SessionStore::new(config.chat_cache_path.clone(), config.chat_cache_length);
        chats::list_chats(&store)?;
        return Ok(());
    }
    if let Some(token) = &args.show_chat {
        let store = SessionStore::new(config.chat_cache_path.clone(), config.chat_cache_length);
        chats::show_chat(&store, token)?;
        return Ok(());
    }
    if let Some(name) = &args.create_role {
        let description = match read_piped_stdin()? {
            Some(piped) => piped,
            None => Input::open(false)
                .and_then(|mut input| input.read_line("Enter role description: ").ok().flatten())
                .unwrap_or_default(),
        };
        roles::create_role(&config.roles_path, name, &description)?;
        return Ok(());
    }
    if let Some(name) = &args.show_role {
        roles::show_role(&RoleResolver::load(&config.roles_path)?, name)?;
        return Ok(());
    }
    if args.list_roles {
        roles::list_roles(&RoleResolver::load(&config.roles_path)?);
        return Ok(());
    }

    // ------------------------------------------------------------------
    // Prompt assembly
    // ------------------------------------------------------------------
    let stdin = read_piped_stdin()?;
    args.validate(stdin.is_some())?;

    let mut prompt = match &stdin {
        Some(piped) => combine_prompt(piped, &args.prompt),
        None => args.prompt.clone(),
    };
    if args.editor {
        prompt = edited_prompt()?;
    }

    // ------------------------------------------------------------------
    // Controller
    // ------------------------------------------------------------------
    let provider = OpenAiProvider::new(config.api_key.clone().unwrap_or_default())
        .map_err(Error::from)?
        .with_base_url(config.api_base_url.clone())
        .with_timeout(Duration::from_secs(config.request_timeout))
        .map_err(Error::from)?;
    let controller = SessionController::from_config(&config, Arc::new(provider))?;

    let mut options = config.generation_options();
    if let Some(model) = &args.model {
        options = options.model(model.clone());
    }
    if let Some(temperature) = args.temperature {
        options = options.temperature(temperature);
    }
    if let Some(top_p) = args.top_p {
        options = options.top_p(top_p);
    }
    if let Some(max_tokens) = args.max_tokens {
        options = options.max_tokens(max_tokens);
    }

    let role = args.role_name().to_string();
    let template = TurnRequest::new(prompt.clone(), role.clone())
        .options(options)
        .use_cache(!args.no_cache)
        .use_functions(!args.no_functions && (args.functions || config.use_functions))
        .streaming(!config.disable_streaming);
    let display = Display {
        show_functions_output: config.show_functions_output,
    };

    if let Some(chat_id) = &args.repl {
        let mut input = Input::open(stdin.is_some())
            .context("REPL mode needs an interactive terminal")?;
        let init = (!prompt.trim().is_empty()).then_some(prompt);
        repl::run(&controller, chat_id, init, template, &mut input, display).await;
        return Ok(());
    }

    let request = template.clone().chat(args.chat_target());
    let result = run_turn(&controller, request, display).await?;

    let interactive = result.role == SHELL_ROLE
        && config.shell_interaction
        && !args.no_interaction;
    if interactive {
        if let Some(mut input) = Input::open(stdin.is_some()) {
            let default = if config.default_execute_shell_cmd {
                ShellAction::Execute
            } else {
                ShellAction::Abort
            };
            interact_with_command(
                &controller,
                result.response,
                &template,
                &mut input,
                default,
                display,
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_prompt_and_modes() {
        let args = parse(&["sforge", "-s", "list files"]);
        assert!(args.shell);
        assert_eq!(args.prompt, "list files");
        assert_eq!(args.role_name(), SHELL_ROLE);

        let args = parse(&["sforge", "--role", "pirate", "-c", "hello"]);
        assert_eq!(args.role_name(), "pirate");

        assert_eq!(parse(&["sforge"]).role_name(), DEFAULT_ROLE);
        assert_eq!(parse(&["sforge", "-d", "ls"]).role_name(), DESCRIBE_SHELL_ROLE);
    }

    #[test]
    fn test_parse_ranges() {
        assert!(Args::try_parse_from(["sforge", "--temperature", "2.5"]).is_err());
        assert!(Args::try_parse_from(["sforge", "--top-p", "1.1"]).is_err());
        assert!(Args::try_parse_from(["sforge", "--max-tokens", "0"]).is_err());
        let args = parse(&["sforge", "--temperature", "0.7", "--top-p", "0.9"]);
        assert_eq!(args.temperature, Some(0.7));
        assert_eq!(args.top_p, Some(0.9));
        assert!(Args::try_parse_from(["sforge", "--functions", "--no-functions"]).is_err());
    }

    #[test]
    fn test_validate() {
        let args = parse(&["sforge", "-s", "-c", "x"]);
        assert!(matches!(args.validate(false), Err(Error::InvalidInput(_))));

        let args = parse(&["sforge", "--chat", "a", "--repl", "b"]);
        assert!(args.validate(false).is_err());

        let args = parse(&["sforge", "--chat", "a", "--resume"]);
        assert!(args.validate(false).is_err());

        let args = parse(&["sforge", "--editor"]);
        assert!(args.validate(true).is_err());
        assert!(args.validate(false).is_ok());
    }

    #[test]
    fn test_chat_target() {
        assert_eq!(parse(&["sforge", "--chat", "work"]).chat_target(), ChatTarget::named("work"));
        assert_eq!(parse(&["sforge", "-r"]).chat_target(), ChatTarget::Resume);
        assert_eq!(parse(&["sforge"]).chat_target(), ChatTarget::Implicit);
    }

    #[test]
    fn test_complete_chat_id_flag() {
        let args = parse(&["sforge", "--complete-chat-id"]);
        assert_eq!(args.complete_chat_id.as_deref(), Some(""));
        let args = parse(&["sforge", "--complete-chat-id", "wo"]);
        assert_eq!(args.complete_chat_id.as_deref(), Some("wo"));
    }
}
