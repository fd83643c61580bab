use std::ffi::OsString;
use std::process::Command;
use std::time::Duration;

use crate::error::{CycleError, Result};
use crate::report::Mode;
use crate::util::{CommandStatus, run_with_timeout};

pub const XRANDR: &str = "xrandr";

/// Thin wrapper around the `xrandr` command line.
#[derive(Debug, Clone)]
pub struct DisplayTool {
    program: OsString,
    timeout: Duration,
}

impl DisplayTool {
    #[must_use]
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Captures `xrandr -q --verbose`. Waits for the child without a bound.
    pub fn query_report(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-q")
            .arg("--verbose")
            .output()
            .map_err(|source| CycleError::ReportQuery {
                command: format!("{} -q --verbose", self.program.to_string_lossy()),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                exit_code = output.status.code().unwrap_or(1),
                stderr = %stderr.trim(),
                "display report query exited non-zero; parsing whatever it printed"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    #[must_use]
    pub fn set_mode_command(&self, mode: &Mode) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--output")
            .arg(&mode.output)
            .arg("--mode")
            .arg(&mode.label);
        command
    }

    /// Applies `mode`. A child that cannot be spawned reports [`CommandStatus::SPAWN_FAILED`].
    pub fn set_mode(&self, mode: &Mode) -> CommandStatus {
        let mut command = self.set_mode_command(mode);
        match run_with_timeout(&mut command, self.timeout) {
            Ok(status) => {
                if status.timed_out {
                    tracing::warn!(%mode, seconds = self.timeout.as_secs(), "mode set timed out");
                }
                status
            }
            Err(error) => {
                tracing::warn!(%mode, %error, "failed to spawn display tool");
                CommandStatus::SPAWN_FAILED
            }
        }
    }

    /// Replays `modes` in order, ignoring failures. Returns the modes that applied.
    pub fn restore(&self, modes: &[Mode]) -> Vec<Mode> {
        let mut restored = Vec::with_capacity(modes.len());
        for mode in modes {
            let status = self.set_mode(mode);
            if status.success() {
                restored.push(mode.clone());
            } else {
                tracing::debug!(%mode, exit_code = status.exit_code, "restore failed");
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use tempfile::tempdir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    use crate::report::Mode;

    use super::DisplayTool;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write script");

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&path).expect("metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("set permissions");
        }

        path
    }

    #[test]
    fn set_mode_command_uses_output_and_mode_flags() {
        let tool = DisplayTool::new("xrandr", Duration::from_secs(1));
        let command = tool.set_mode_command(&Mode::new("HDMI-1", "1920x1080"));
        let values = command
            .get_args()
            .map(OsStr::to_string_lossy)
            .map(|value| value.into_owned())
            .collect::<Vec<_>>();
        assert_eq!(command.get_program(), "xrandr");
        assert_eq!(values, vec!["--output", "HDMI-1", "--mode", "1920x1080"]);
    }

    #[cfg(unix)]
    #[test]
    fn query_report_returns_stdout() {
        let temp = tempdir().expect("tempdir");
        let script = write_script(
            temp.path(),
            "fake-xrandr",
            "#!/bin/sh\n[ \"$1\" = \"-q\" ] && [ \"$2\" = \"--verbose\" ] || exit 2\necho 'VGA1 connected'\necho '  1024x768 (0x1) 65.000MHz *current'\n",
        );

        let report = DisplayTool::new(&script, Duration::from_secs(5))
            .query_report()
            .expect("query report");
        assert!(report.contains("VGA1 connected"));
        assert!(report.contains("*current"));
    }

    #[test]
    fn query_report_fails_when_program_is_missing() {
        let error = DisplayTool::new("/definitely/not/xrandr", Duration::from_secs(1))
            .query_report()
            .expect_err("missing program should fail");
        assert!(error.to_string().contains("-q --verbose"));
    }

    #[cfg(unix)]
    #[test]
    fn set_mode_and_restore_report_per_mode_status() {
        let temp = tempdir().expect("tempdir");
        let log = temp.path().join("calls.log");
        let script = write_script(
            temp.path(),
            "fake-xrandr",
            &format!(
                "#!/bin/sh\necho \"$*\" >> '{}'\n[ \"$4\" = \"800x600\" ] && exit 1\nexit 0\n",
                log.display()
            ),
        );
        let tool = DisplayTool::new(&script, Duration::from_secs(5));

        assert!(tool.set_mode(&Mode::new("VGA1", "1024x768")).success());
        let failed = tool.set_mode(&Mode::new("VGA1", "800x600"));
        assert_eq!(failed.exit_code, 1);

        let restored = tool.restore(&[Mode::new("VGA1", "800x600"), Mode::new("HDMI1", "1280x720")]);
        assert_eq!(restored, vec![Mode::new("HDMI1", "1280x720")]);

        let calls = fs::read_to_string(&log).expect("read log");
        assert_eq!(
            calls.lines().collect::<Vec<_>>(),
            vec![
                "--output VGA1 --mode 1024x768",
                "--output VGA1 --mode 800x600",
                "--output VGA1 --mode 800x600",
                "--output HDMI1 --mode 1280x720",
            ]
        );
    }

    #[test]
    fn set_mode_with_missing_program_reports_failure() {
        let tool = DisplayTool::new("/definitely/not/xrandr", Duration::from_secs(1));
        let status = tool.set_mode(&Mode::new("VGA1", "1024x768"));
        assert!(!status.success());
        assert_eq!(status.exit_code, 127);
    }
}
