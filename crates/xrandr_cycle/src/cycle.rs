use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::Args;
use serde_json::json;

use crate::archive::{archive_dir, archive_path_for};
use crate::display::{DisplayTool, XRANDR};
use crate::error::{CycleError, Result};
use crate::report::{Mode, ModeReport, parse_report};
use crate::selector::{Selection, select_best_modes};
use crate::shutter::{SHUTTER, ScreenshotProfile, ScreenshotTool, template_from_env};
use crate::summary::{CycleSummary, SUMMARY_FILE};
use crate::util::{
    CliOutput, OutputIntegration, now_utc_iso, parse_duration_value, require_command,
};

pub const SCREENSHOT_DIR_NAME: &str = "xrandr_screens";
pub const DEFAULT_SETTLE: &str = "3";
pub const DEFAULT_COMMAND_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, Args)]
pub struct CycleArgs {
    /// A keyword to distinguish the screenshots taken in this run.
    #[arg(long, default_value = "")]
    pub keyword: String,

    /// Directory to store screenshots in [default: $HOME].
    #[arg(long = "screenshot-dir")]
    pub screenshot_dir: Option<PathBuf>,

    /// Pause after each mode change, e.g. `3`, `3s` or `500ms`.
    #[arg(long)]
    pub settle: Option<String>,

    #[arg(long = "command-timeout-seconds")]
    pub command_timeout_seconds: Option<u64>,

    /// Only discover and print the modes that would be cycled.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
struct ResolvedCycleConfig {
    home: PathBuf,
    keyword: String,
    screenshot_root: PathBuf,
    settle: String,
    command_timeout_seconds: u64,
    dry_run: bool,
}

impl ResolvedCycleConfig {
    fn defaults(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            keyword: String::new(),
            screenshot_root: home.to_path_buf(),
            settle: DEFAULT_SETTLE.to_string(),
            command_timeout_seconds: DEFAULT_COMMAND_TIMEOUT_SECONDS,
            dry_run: false,
        }
    }

    fn apply_args(&mut self, args: &CycleArgs) {
        self.keyword = args.keyword.clone();
        if let Some(value) = &args.screenshot_dir {
            self.screenshot_root = value.clone();
        }
        if let Some(value) = &args.settle {
            self.settle = value.clone();
        }
        if let Some(value) = args.command_timeout_seconds {
            self.command_timeout_seconds = value;
        }
        if args.dry_run {
            self.dry_run = true;
        }
    }

    fn profile_dir(&self) -> PathBuf {
        self.home.join(".shutter").join("profiles")
    }

    fn screenshot_dir(&self) -> PathBuf {
        self.screenshot_root.join(screenshot_dir_name(&self.keyword))
    }
}

#[must_use]
pub fn screenshot_dir_name(keyword: &str) -> String {
    if keyword.is_empty() {
        SCREENSHOT_DIR_NAME.to_string()
    } else {
        format!("{SCREENSHOT_DIR_NAME}_{keyword}")
    }
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| CycleError::MissingEnv {
            name: "HOME".to_string(),
        })
}

fn create_required_dirs(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|source| CycleError::CreateDirs {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// What happened to each selected mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub succeeded: Vec<Mode>,
    pub failed: Vec<Mode>,
    /// Modes that were set but whose screenshot could not be taken.
    pub screenshot_failures: Vec<Mode>,
    pub success_messages: Vec<String>,
    pub failure_messages: Vec<String>,
}

impl CycleOutcome {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.failed.is_empty())
    }

    fn record_success(&mut self, mode: &Mode) {
        self.success_messages.push(format!(
            "Set mode {} for output {}",
            mode.label, mode.output
        ));
        self.succeeded.push(mode.clone());
    }

    fn record_failure(&mut self, mode: &Mode) {
        self.failure_messages.push(format!(
            "Failed to set mode {} for output {}",
            mode.label, mode.output
        ));
        self.failed.push(mode.clone());
    }
}

pub struct CycleTools<'a> {
    pub display: &'a DisplayTool,
    pub profile: &'a ScreenshotProfile,
    pub screenshot: &'a ScreenshotTool,
    pub settle: Duration,
}

/// Applies each mode in turn and captures a screenshot of every one that took.
///
/// Failures never stop the loop; they are collected in the outcome.
pub fn cycle_modes(modes: &[Mode], tools: &CycleTools<'_>, ui: &CliOutput) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();

    for mode in modes {
        ui.info(&format!("setting {} to {}", mode.output, mode.label));
        let status = tools.display.set_mode(mode);
        if !status.success() {
            tracing::debug!(%mode, exit_code = status.exit_code, "mode set failed");
            outcome.record_failure(mode);
            thread::sleep(tools.settle);
            continue;
        }

        match tools.profile.set_filename(&mode.screenshot_stem()) {
            Ok(()) => {
                let capture = tools.screenshot.capture();
                if !capture.success() {
                    tracing::warn!(%mode, exit_code = capture.exit_code, "screenshot failed");
                    outcome.screenshot_failures.push(mode.clone());
                    ui.warning(
                        "Could not capture screenshot - you may need to install the package 'shutter'.",
                    );
                }
            }
            Err(error) => {
                tracing::warn!(%mode, %error, "screenshot profile update failed");
                outcome.screenshot_failures.push(mode.clone());
                ui.warning(&format!(
                    "Could not configure screenshot tool - you may need to install the package \
                     'shutter', or check that {} exists and is writable.",
                    tools.profile.path().display()
                ));
            }
        }

        outcome.record_success(mode);
        thread::sleep(tools.settle);
    }

    outcome
}

fn report_discovery(report: &ModeReport, selection: &Selection, ui: &CliOutput) {
    ui.rule(Some("xrandr_cycle discovery"));
    ui.info(&format!(
        "connected outputs: {}",
        if report.connected_outputs.is_empty() {
            "none".to_string()
        } else {
            report.connected_outputs.join(", ")
        }
    ));
    for mode in &report.current_modes {
        ui.info(&format!("current mode: {mode}"));
    }
    for rejected in &selection.rejected {
        ui.warning(&rejected.reason);
    }
    ui.info(&format!(
        "{} mode(s) discovered, {} aspect group(s), {} selected",
        report.modes.len(),
        selection.table.group_count(),
        selection.modes.len()
    ));
}

fn print_plan(
    report: &ModeReport,
    selection: &Selection,
    screenshot_dir: &Path,
    integration: &OutputIntegration,
) {
    if integration.should_emit_json() {
        println!(
            "{}",
            json!({
                "command": "cycle",
                "status": "dry_run_ok",
                "connected_outputs": report.connected_outputs,
                "current_modes": report.current_modes,
                "selected_modes": selection.modes,
                "rejected": selection.rejected,
                "screenshot_dir": screenshot_dir.display().to_string(),
                "integration": integration,
            })
        );
        return;
    }

    for mode in &selection.modes {
        println!("Would set mode {} for output {}", mode.label, mode.output);
    }
}

pub fn run_cycle(args: CycleArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let ui = CliOutput::for_integration(&integration);

    let home = home_dir()?;
    let mut cfg = ResolvedCycleConfig::defaults(&home);
    cfg.apply_args(&args);
    let settle = parse_duration_value(&cfg.settle)?;
    let timeout = Duration::from_secs(cfg.command_timeout_seconds);
    let screenshot_dir = cfg.screenshot_dir();
    let profile_dir = cfg.profile_dir();

    let display = DisplayTool::new(XRANDR, timeout);

    let started_at = now_utc_iso();
    let raw_report = match require_command(XRANDR).and_then(|()| display.query_report()) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(%error, "no display report available; continuing with no modes");
            String::new()
        }
    };
    let report = parse_report(&raw_report);
    let selection = select_best_modes(&report.modes);
    report_discovery(&report, &selection, &ui);

    if cfg.dry_run {
        print_plan(&report, &selection, &screenshot_dir, &integration);
        return Ok(());
    }

    create_required_dirs(&[profile_dir.as_path(), screenshot_dir.as_path()])?;
    let template = template_from_env()?;
    let profile = ScreenshotProfile::install(&template, &profile_dir)?;
    profile.set_folder(&screenshot_dir)?;
    tracing::debug!(profile = %profile.path().display(), "screenshot profile installed");

    ui.rule(Some("cycling modes"));
    let screenshot = ScreenshotTool::new(SHUTTER, timeout);
    let outcome = cycle_modes(
        &selection.modes,
        &CycleTools {
            display: &display,
            profile: &profile,
            screenshot: &screenshot,
            settle,
        },
        &ui,
    );

    let restored = display.restore(&report.current_modes);
    if restored.len() != report.current_modes.len() {
        tracing::debug!(
            restored = restored.len(),
            expected = report.current_modes.len(),
            "some original modes could not be restored"
        );
    }

    let exit_code = outcome.exit_code();
    let status = if exit_code == 0 { "ok" } else { "failed" };
    let archive = archive_path_for(&screenshot_dir);
    let summary = CycleSummary {
        status: status.to_string(),
        started_at,
        finished_at: Some(now_utc_iso()),
        keyword: cfg.keyword.clone(),
        screenshot_dir: screenshot_dir.display().to_string(),
        profile: profile.path().display().to_string(),
        archive: archive.display().to_string(),
        connected_outputs: report.connected_outputs.clone(),
        original_modes: report.current_modes.clone(),
        selected_modes: selection.modes.clone(),
        succeeded: outcome.succeeded.clone(),
        failed: outcome.failed.clone(),
        screenshot_failures: outcome.screenshot_failures.clone(),
        restored,
        rejected_labels: selection
            .rejected
            .iter()
            .map(|rejected| rejected.mode.label.clone())
            .collect(),
        exit_code,
    };
    if let Err(error) = summary.write_to_path(&screenshot_dir.join(SUMMARY_FILE)) {
        tracing::warn!(%error, "could not write run summary");
    }

    match archive_dir(&screenshot_dir, &archive) {
        Ok(()) => ui.success(&format!("screenshots archived to {}", archive.display())),
        Err(error) => {
            tracing::debug!(%error, archive = %archive.display(), "archiving screenshots failed");
        }
    }

    for message in &outcome.failure_messages {
        eprintln!("{message}");
    }

    if integration.should_emit_json() {
        println!(
            "{}",
            json!({
                "command": "cycle",
                "status": status,
                "exit_code": exit_code,
                "screenshot_dir": summary.screenshot_dir,
                "archive": summary.archive,
                "succeeded": summary.succeeded,
                "failed": summary.failed,
                "screenshot_failures": summary.screenshot_failures,
                "integration": integration,
            })
        );
    } else {
        for message in &outcome.success_messages {
            println!("{message}");
        }
    }

    if exit_code != 0 {
        return Err(CycleError::exit(
            exit_code,
            format!(
                "{} of {} mode(s) could not be set",
                outcome.failed.len(),
                selection.modes.len()
            ),
        ));
    }

    Ok(())
}
