//! Parser for the `xrandr -q --verbose` report.
//!
//! xrandr groups modes under the output they belong to purely through line
//! order: a header line names the output and its connection state, and every
//! following line up to the next header belongs to it. The parser carries that
//! context across lines as a single piece of state.

use std::fmt;

use serde::{Deserialize, Serialize};

const CONNECTED: &str = "connected";
const DISCONNECTED: &str = "disconnected";
const DOUBLE_SCAN: &str = "DoubleScan";
const CURRENT_MARKER: char = '*';

/// A resolution supported by one output, labelled `<width>x<height>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode {
    pub output: String,
    pub label: String,
}

impl Mode {
    #[must_use]
    pub fn new(output: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            label: label.into(),
        }
    }

    /// Base name used for the screenshot of this mode.
    #[must_use]
    pub fn screenshot_stem(&self) -> String {
        format!("{}_{}", self.output, self.label)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.output, self.label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeReport {
    /// Every settable mode on every connected output, in report order.
    pub modes: Vec<Mode>,
    /// Modes active when the report was taken, used to restore the display.
    pub current_modes: Vec<Mode>,
    pub connected_outputs: Vec<String>,
}

#[must_use]
pub fn parse_report(report: &str) -> ModeReport {
    let mut parsed = ModeReport::default();
    let mut context: Option<&str> = None;

    for line in report.lines() {
        if line.is_empty() {
            break;
        }

        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let Some(first) = tokens.first().copied() else {
            continue;
        };

        match tokens.get(1).copied() {
            Some(DISCONNECTED) => {
                context = None;
                continue;
            }
            Some(CONNECTED) => {
                context = Some(first);
                parsed.connected_outputs.push(first.to_string());
                continue;
            }
            _ => {}
        }

        let Some(output) = context else {
            continue;
        };
        let Some(label) = mode_label(first) else {
            continue;
        };
        if tokens.contains(&DOUBLE_SCAN) {
            continue;
        }

        let mode = Mode::new(output, label);
        if tokens.iter().any(|token| token.contains(CURRENT_MARKER)) {
            parsed.current_modes.push(mode.clone());
        }
        parsed.modes.push(mode);
    }

    parsed
}

/// Returns the mode label carried by `token`, if it looks like one.
///
/// Only the first `x` is checked: it must have a digit on both sides. Marker
/// characters glued to the end (`1024x768*`, `1920x1080+`) are not part of the
/// label.
fn mode_label(token: &str) -> Option<&str> {
    let label = token.trim_end_matches(['*', '+']);
    let bytes = label.as_bytes();
    let x_pos = label.find('x')?;
    if x_pos == 0 || x_pos + 1 >= bytes.len() {
        return None;
    }
    if bytes[x_pos - 1].is_ascii_digit() && bytes[x_pos + 1].is_ascii_digit() {
        Some(label)
    } else {
        None
    }
}
