use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CycleError>;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing environment variable: {name}")]
    MissingEnv { name: String },

    #[error("missing dependency command: {command}")]
    MissingCommand { command: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("ERROR: Unable to create required directories: {path}: {source}")]
    CreateDirs {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}", template_copy_message(.template, .target, .source))]
    TemplateCopy {
        template: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },

    #[error("ERROR: While updating folder name in shutter profile {path}: {source}")]
    ProfileUpdate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to query display report via `{command}`: {source}")]
    ReportQuery {
        command: String,
        source: std::io::Error,
    },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

fn template_copy_message(
    template: &std::path::Path,
    target: &std::path::Path,
    source: &std::io::Error,
) -> String {
    let mut message = format!(
        "ERROR: Unable to copy {} to {}: {source}",
        template.display(),
        target.display()
    );
    if source.kind() == std::io::ErrorKind::NotFound {
        message.push_str(
            "\nTry setting PLAINBOX_PROVIDER_DATA to the data path of a provider shipping the \
             'shutter.xml' template file, usually found under /usr/share.",
        );
    }
    message
}

impl CycleError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
