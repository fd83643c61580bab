//! The screenshot collaborator: a `shutter` profile rewritten before each capture.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use regex_lite::{NoExpand, Regex};

use crate::error::{CycleError, Result};
use crate::util::{CommandStatus, run_with_timeout};

pub const SHUTTER: &str = "shutter";
pub const PROFILE_NAME: &str = "shutter";
pub const PROFILE_FILE: &str = "shutter.xml";
pub const PROVIDER_DATA_ENV: &str = "PLAINBOX_PROVIDER_DATA";

static FOLDER_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"folder="[^"\r\n]*""#).expect("folder attribute regex"));
static FILENAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="[^"\r\n]*""#).expect("filename attribute regex"));

/// Where the `shutter.xml` template lives.
///
/// `provider_data` wins when set; otherwise the template is looked up in
/// `data/settings` next to the directory holding the executable.
#[must_use]
pub fn locate_template(provider_data: Option<&Path>, exe: &Path) -> PathBuf {
    match provider_data {
        Some(data) => data.join("settings").join(PROFILE_FILE),
        None => {
            let install_root = exe
                .parent()
                .and_then(Path::parent)
                .unwrap_or_else(|| Path::new("."));
            install_root.join("data").join("settings").join(PROFILE_FILE)
        }
    }
}

pub fn template_from_env() -> Result<PathBuf> {
    let provider_data = std::env::var_os(PROVIDER_DATA_ENV).map(PathBuf::from);
    let exe = std::env::current_exe()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    Ok(locate_template(provider_data.as_deref(), &exe))
}

#[must_use]
pub fn replace_folder(content: &str, folder: &Path) -> String {
    let replacement = format!("folder=\"{}\"", folder.display());
    FOLDER_ATTR
        .replace_all(content, NoExpand(&replacement))
        .into_owned()
}

#[must_use]
pub fn replace_filename(content: &str, filename: &str) -> String {
    let replacement = format!("filename=\"{filename}\"");
    FILENAME_ATTR
        .replace_all(content, NoExpand(&replacement))
        .into_owned()
}

/// The installed copy of the profile that `shutter --profile=shutter` reads.
#[derive(Debug, Clone)]
pub struct ScreenshotProfile {
    path: PathBuf,
}

impl ScreenshotProfile {
    /// Copies `template` into `profile_dir`, replacing any previous profile.
    pub fn install(template: &Path, profile_dir: &Path) -> Result<Self> {
        let path = profile_dir.join(PROFILE_FILE);
        fs::copy(template, &path).map_err(|source| CycleError::TemplateCopy {
            template: template.to_path_buf(),
            target: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_folder(&self, folder: &Path) -> Result<()> {
        self.rewrite(|content| replace_folder(content, folder))
            .map_err(|source| CycleError::ProfileUpdate {
                path: self.path.clone(),
                source,
            })
    }

    pub fn set_filename(&self, filename: &str) -> io::Result<()> {
        self.rewrite(|content| replace_filename(content, filename))
    }

    fn rewrite(&self, edit: impl FnOnce(&str) -> String) -> io::Result<()> {
        let content = fs::read_to_string(&self.path)?;
        fs::write(&self.path, edit(&content))
    }
}

#[derive(Debug, Clone)]
pub struct ScreenshotTool {
    program: OsString,
    timeout: Duration,
}

impl ScreenshotTool {
    #[must_use]
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn capture_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(format!("--profile={PROFILE_NAME}"))
            .arg("--full")
            .arg("-e");
        command
    }

    /// Takes one full-screen capture. A missing program reports [`CommandStatus::SPAWN_FAILED`].
    pub fn capture(&self) -> CommandStatus {
        match run_with_timeout(&mut self.capture_command(), self.timeout) {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(%error, "failed to spawn screenshot tool");
                CommandStatus::SPAWN_FAILED
            }
        }
    }
}
