//! Role definitions - 역할 데이터 테이블
//!
//! 역할은 동작이 아니라 설정입니다.
//! `name → {template, functions, one_shot, ...}` 테이블로 표현합니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role used when the caller does not ask for one
pub const DEFAULT_ROLE: &str = "default";
pub const SHELL_ROLE: &str = "shell";
pub const CODE_ROLE: &str = "code";
pub const DESCRIBE_SHELL_ROLE: &str = "describe-shell";

const SYSTEM_PROMPT_PREFIX: &str = "You are ";

const DEFAULT_TEMPLATE: &str = "\
You are programming and system administration assistant.
You are managing {os} operating system with {shell} shell.
Provide short responses in about 100 words, unless you are specifically asked for more details.
If you need to store any data, assume it will be stored in the conversation.
APPLY MARKDOWN formatting when possible.";

const SHELL_TEMPLATE: &str = "\
Provide only {shell} commands for {os} without any description.
If there is a lack of details, provide most logical solution.
Ensure the output is a valid shell command.
If multiple steps required try to combine them together using &&.
Provide only plain text without Markdown formatting.
Do not provide markdown formatting such as ```.";

const DESCRIBE_SHELL_TEMPLATE: &str = "\
Provide a terse, single sentence description of the given shell command.
Describe each argument and option of the command.
Provide short responses in about 80 words.
APPLY MARKDOWN formatting when possible.";

const CODE_TEMPLATE: &str = "\
Provide only code as output without any description.
Provide only code in plain text format without Markdown formatting.
Do not include symbols such as ``` or ```python.
If there is a lack of details, provide most logical solution.
You are not allowed to ask for more details.
For example if the prompt is \"Hello world Python\", you should return \"print('Hello world')\".";

/// Which functions a role may call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionScope {
    /// Every registered function
    #[default]
    All,

    /// No function calls at all
    None,

    /// Only the named functions
    Only(BTreeSet<String>),
}

impl FunctionScope {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            FunctionScope::All => true,
            FunctionScope::None => false,
            FunctionScope::Only(names) => names.contains(name),
        }
    }
}

/// A role: system prompt template plus behaviour flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Lookup key (`default`, `shell`, or a custom role name)
    pub name: String,

    /// Name written into the system prompt (`You are <display_name>`)
    pub display_name: String,

    /// Prompt body; `{os}` and `{shell}` are substituted at render time
    pub template: String,

    pub allowed_functions: FunctionScope,

    /// Without an explicit chat id, the turn is not persisted
    pub one_shot: bool,

    /// Output is expected to be bare code or a bare command
    pub code_only: bool,

    /// Output may be rendered as markdown
    pub markdown: bool,

    pub builtin: bool,
}

impl RoleDefinition {
    /// Custom role loaded from the roles directory
    pub fn custom(name: impl Into<String>, template: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            template: template.into(),
            allowed_functions: FunctionScope::All,
            one_shot: false,
            code_only: false,
            markdown: true,
            builtin: false,
        }
    }

    /// `default`, `shell`, `code`, `describe-shell`
    pub fn builtins() -> Vec<RoleDefinition> {
        vec![
            RoleDefinition {
                name: DEFAULT_ROLE.to_string(),
                display_name: "ShellForge".to_string(),
                template: DEFAULT_TEMPLATE.to_string(),
                allowed_functions: FunctionScope::All,
                one_shot: false,
                code_only: false,
                markdown: true,
                builtin: true,
            },
            RoleDefinition {
                name: SHELL_ROLE.to_string(),
                display_name: "Shell Command Generator".to_string(),
                template: SHELL_TEMPLATE.to_string(),
                allowed_functions: FunctionScope::None,
                one_shot: true,
                code_only: true,
                markdown: false,
                builtin: true,
            },
            RoleDefinition {
                name: DESCRIBE_SHELL_ROLE.to_string(),
                display_name: "Shell Command Descriptor".to_string(),
                template: DESCRIBE_SHELL_TEMPLATE.to_string(),
                allowed_functions: FunctionScope::None,
                one_shot: true,
                code_only: false,
                markdown: true,
                builtin: true,
            },
            RoleDefinition {
                name: CODE_ROLE.to_string(),
                display_name: "Code Generator".to_string(),
                template: CODE_TEMPLATE.to_string(),
                allowed_functions: FunctionScope::None,
                one_shot: true,
                code_only: true,
                markdown: false,
                builtin: true,
            },
        ]
    }

    /// Render the system prompt for the current machine
    pub fn system_prompt(&self) -> String {
        self.system_prompt_for(&os_name(), &shell_name())
    }

    pub fn system_prompt_for(&self, os: &str, shell: &str) -> String {
        let body = self.template.replace("{os}", os).replace("{shell}", shell);
        format!("{}{}\n{}", SYSTEM_PROMPT_PREFIX, self.display_name, body)
    }
}

/// Recover the display name written by [`RoleDefinition::system_prompt`]
pub fn display_name_of(system_prompt: &str) -> Option<&str> {
    let rest = system_prompt.strip_prefix(SYSTEM_PROMPT_PREFIX)?;
    let name = rest.split_once('\n').map(|(name, _)| name).unwrap_or(rest);
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

fn os_name() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "macOS".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}

fn shell_name() -> String {
    if cfg!(windows) {
        return "powershell.exe".to_string();
    }
    std::env::var("SHELL")
        .ok()
        .and_then(|path| {
            std::path::Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "sh".to_string())
}
