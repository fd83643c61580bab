use std::process::{Child, Command, ExitStatus};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use fastapi_output::RichOutput;
use serde::Serialize;
use sqlmodel_console::OutputMode as SqlModelOutputMode;
use wait_timeout::ChildExt;

use crate::error::{CycleError, Result};

/// Exit code reported for a child killed after exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported when a child could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

#[must_use]
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn require_command(command: &str) -> Result<()> {
    which::which(command)
        .map(|_| ())
        .map_err(|_| CycleError::MissingCommand {
            command: command.to_string(),
        })
}

/// How the surrounding environment wants results rendered.
#[derive(Debug, Clone, Serialize)]
pub struct OutputIntegration {
    pub mode: String,
    pub agent: bool,
    pub ci: bool,
    pub tty: bool,
}

impl OutputIntegration {
    #[must_use]
    pub fn detect() -> Self {
        let environment = fastapi_output::detect_environment();
        Self {
            mode: SqlModelOutputMode::detect().as_str().to_string(),
            agent: environment.is_agent || SqlModelOutputMode::is_agent_environment(),
            ci: environment.is_ci,
            tty: environment.is_tty,
        }
    }

    #[must_use]
    pub fn should_emit_json(&self) -> bool {
        self.mode == "json"
    }
}

/// Human-facing progress output; silent when results go out as JSON.
#[derive(Debug, Clone)]
pub struct CliOutput {
    console: Option<RichOutput>,
}

impl CliOutput {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            console: enabled.then(RichOutput::auto),
        }
    }

    #[must_use]
    pub fn for_integration(integration: &OutputIntegration) -> Self {
        Self::new(!integration.should_emit_json())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.console.is_some()
    }

    pub fn rule(&self, title: Option<&str>) {
        if let Some(console) = &self.console {
            console.rule(title);
        }
    }

    pub fn info(&self, message: &str) {
        if let Some(console) = &self.console {
            console.info(message);
        }
    }

    pub fn success(&self, message: &str) {
        if let Some(console) = &self.console {
            console.success(message);
        }
    }

    pub fn warning(&self, message: &str) {
        if let Some(console) = &self.console {
            console.warning(message);
        }
    }
}

/// Parses `3`, `3s` or `250ms`. A bare number means seconds.
pub fn parse_duration_value(raw: &str) -> Result<Duration> {
    let value = raw.trim();
    let unit_start = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(unit_start);
    let amount = digits.parse::<u64>().map_err(|_| {
        CycleError::invalid(format!(
            "invalid duration {raw:?}: expected a number such as 3, 3s or 250ms"
        ))
    })?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(amount)),
        "ms" => Ok(Duration::from_millis(amount)),
        other => Err(CycleError::invalid(format!(
            "invalid duration {raw:?}: unknown unit {other:?}"
        ))),
    }
}

/// How a bounded child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub exit_code: i32,
    pub timed_out: bool,
}

impl CommandStatus {
    pub const SPAWN_FAILED: Self = Self {
        exit_code: SPAWN_FAILURE_EXIT_CODE,
        timed_out: false,
    };

    #[must_use]
    pub fn success(self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    fn from_exit(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code().unwrap_or(1),
            timed_out: false,
        }
    }
}

/// Runs `command` to completion, killing it once `timeout` elapses.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> std::io::Result<CommandStatus> {
    let mut child = command.spawn()?;
    match child.wait_timeout(timeout)? {
        Some(status) => Ok(CommandStatus::from_exit(status)),
        None => Ok(stop_timed_out(&mut child)),
    }
}

/// Kills a child that outlived its timeout. A child that exited on its own in
/// the meantime is still reported as timed out.
fn stop_timed_out(child: &mut Child) -> CommandStatus {
    if let Err(error) = child.kill() {
        tracing::debug!(%error, "timed-out child could not be killed");
    }
    let _ = child.wait();
    CommandStatus {
        exit_code: TIMEOUT_EXIT_CODE,
        timed_out: true,
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;
    use std::time::Duration;

    use super::{
        CliOutput, CommandStatus, OutputIntegration, TIMEOUT_EXIT_CODE, parse_duration_value,
        require_command, run_with_timeout, stop_timed_out,
    };

    #[test]
    fn durations_accept_bare_seconds_and_units() {
        assert_eq!(parse_duration_value("3").expect("bare"), Duration::from_secs(3));
        assert_eq!(parse_duration_value(" 7s ").expect("seconds"), Duration::from_secs(7));
        assert_eq!(
            parse_duration_value("250ms").expect("millis"),
            Duration::from_millis(250)
        );
        assert_eq!(parse_duration_value("0").expect("zero"), Duration::ZERO);
    }

    #[test]
    fn durations_reject_empty_negative_and_unknown_units() {
        for raw in ["", "-1", "s", "1.5", "3m"] {
            let error = parse_duration_value(raw).expect_err("should fail");
            assert!(
                error.to_string().contains("invalid duration"),
                "unexpected message for {raw:?}: {error}"
            );
        }
    }

    #[test]
    fn json_mode_silences_human_output() {
        let json = OutputIntegration {
            mode: "json".to_string(),
            agent: true,
            ci: false,
            tty: false,
        };
        let plain = OutputIntegration {
            mode: "plain".to_string(),
            ..json.clone()
        };

        assert!(json.should_emit_json());
        assert!(!CliOutput::for_integration(&json).is_enabled());
        assert!(CliOutput::for_integration(&plain).is_enabled());
    }

    #[test]
    fn require_command_names_the_missing_program() {
        let error = require_command("xrandr-cycle-definitely-missing").expect_err("missing");
        assert!(error.to_string().contains("xrandr-cycle-definitely-missing"));
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_reports_exit_code() {
        let status = run_with_timeout(
            Command::new("sh").arg("-c").arg("exit 3"),
            Duration::from_secs(10),
        )
        .expect("run sh");
        assert_eq!(
            status,
            CommandStatus {
                exit_code: 3,
                timed_out: false
            }
        );
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_kills_hung_child() {
        let status = run_with_timeout(
            Command::new("sh").arg("-c").arg("sleep 5"),
            Duration::from_millis(100),
        )
        .expect("run sh");
        assert!(status.timed_out);
        assert_eq!(status.exit_code, TIMEOUT_EXIT_CODE);
    }

    #[cfg(unix)]
    #[test]
    fn child_that_exits_before_kill_still_reports_timeout() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("exit 0")
            .spawn()
            .expect("spawn sh");
        std::thread::sleep(Duration::from_millis(200));

        let status = stop_timed_out(&mut child);
        assert_eq!(
            status,
            CommandStatus {
                exit_code: TIMEOUT_EXIT_CODE,
                timed_out: true
            }
        );

        let status = stop_timed_out(&mut child);
        assert!(status.timed_out);
    }
}
