//! Shell 프로세스 실행
//!
//! 함수 호출 결과는 모델에게 텍스트로 돌아가므로, 실패한 명령도 에러가 아니라
//! 종료 코드와 출력을 담은 결과로 취급합니다. 프로세스를 띄우지 못한 경우만 에러.

use shellforge_foundation::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// 기본 타임아웃 (2분)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// 최대 출력 크기 (30KB)
const MAX_OUTPUT_SIZE: usize = 30_000;

/// Result of one shell invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// `None` when the process was killed by a signal or timed out
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
    pub timed_out: bool,
}

impl ShellOutput {
    /// Text handed back to the model
    pub fn to_function_result(&self) -> String {
        if self.timed_out {
            return format!("Command timed out, Output:\n{}", self.output);
        }
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("Exit code: {}, Output:\n{}", code, self.output)
    }
}

/// User's shell and the flag that makes it run one command string
pub fn user_shell() -> (String, &'static str) {
    if cfg!(windows) {
        return ("cmd.exe".to_string(), "/C");
    }
    let shell = std::env::var("SHELL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string());
    (shell, "-c")
}

/// Run `command` through the user's shell, capturing output
pub async fn run_shell(
    command: &str,
    env: &[(String, String)],
    limit: Duration,
) -> Result<ShellOutput> {
    let (shell, flag) = user_shell();

    let mut cmd = Command::new(&shell);
    cmd.arg(flag).arg(command);
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| Error::function_execution(command, format!("Failed to spawn {}: {}", shell, e)))?;

    // stdout/stderr를 동시에 읽어야 한쪽 파이프가 가득 차도 멈추지 않음
    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(out)) => Ok(ShellOutput {
            exit_code: out.status.code(),
            output: combine(&out.stdout, &out.stderr),
            timed_out: false,
        }),
        Ok(Err(e)) => Err(Error::function_execution(
            command,
            format!("Failed to read output: {}", e),
        )),
        // child is killed when the future is dropped (kill_on_drop)
        Err(_) => Ok(ShellOutput {
            exit_code: None,
            output: format!("[timed out after {}s]", limit.as_secs()),
            timed_out: true,
        }),
    }
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&stderr);
    }

    if output.len() > MAX_OUTPUT_SIZE {
        let mut cut = MAX_OUTPUT_SIZE;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n... [output truncated]");
    }
    output
}
