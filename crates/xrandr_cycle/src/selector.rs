//! Reduces every discovered mode to the widest one per aspect ratio per output.

use std::fmt;

use serde::Serialize;

use crate::report::Mode;

/// Smallest width offered by the desktop's display settings panel.
pub const MIN_WIDTH: u64 = 675;
/// Smallest height offered by the desktop's display settings panel.
pub const MIN_HEIGHT: u64 = 530;

/// Exact `width / height` ratio in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    num: u64,
    den: u64,
}

impl AspectRatio {
    /// Returns `None` when either side is zero.
    #[must_use]
    pub fn new(width: u64, height: u64) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let divisor = gcd(width, height);
        Some(Self {
            num: width / divisor,
            den: height / divisor,
        })
    }

    #[must_use]
    pub fn numerator(self) -> u64 {
        self.num
    }

    #[must_use]
    pub fn denominator(self) -> u64 {
        self.den
    }

    /// Height matching `width` at this ratio, if it is a whole number.
    #[must_use]
    pub fn height_for(self, width: u64) -> Option<u64> {
        let scaled = width.checked_mul(self.den)?;
        (scaled % self.num == 0).then_some(scaled / self.num)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

fn gcd(mut left: u64, mut right: u64) -> u64 {
    while right != 0 {
        let rem = left % right;
        left = right;
        right = rem;
    }
    left
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    MissingSeparator,
    InvalidWidth(String),
    InvalidHeight(String),
    ZeroDimension,
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "expected exactly one 'x' separator"),
            Self::InvalidWidth(raw) => write!(f, "invalid width {raw:?}"),
            Self::InvalidHeight(raw) => write!(f, "invalid height {raw:?}"),
            Self::ZeroDimension => write!(f, "width and height must be non-zero"),
        }
    }
}

impl std::error::Error for LabelError {}

/// Splits a `<width>x<height>` label into its dimensions.
pub fn parse_dimensions(label: &str) -> Result<(u64, u64), LabelError> {
    let mut parts = label.split('x');
    let (Some(width_raw), Some(height_raw), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(LabelError::MissingSeparator);
    };

    let width = width_raw
        .parse::<u64>()
        .map_err(|_| LabelError::InvalidWidth(width_raw.to_string()))?;
    let height = height_raw
        .parse::<u64>()
        .map_err(|_| LabelError::InvalidHeight(height_raw.to_string()))?;
    if width == 0 || height == 0 {
        return Err(LabelError::ZeroDimension);
    }
    Ok((width, height))
}

/// Widest width seen per aspect ratio, per output, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct OutputModeTable {
    outputs: Vec<(String, Vec<(AspectRatio, u64)>)>,
}

impl OutputModeTable {
    fn record(&mut self, output: &str, aspect: AspectRatio, width: u64) {
        let index = match self.outputs.iter().position(|(name, _)| name == output) {
            Some(index) => index,
            None => {
                self.outputs.push((output.to_string(), Vec::new()));
                self.outputs.len() - 1
            }
        };
        let groups = &mut self.outputs[index].1;
        match groups.iter_mut().find(|(existing, _)| *existing == aspect) {
            Some((_, widest)) => *widest = (*widest).max(width),
            None => groups.push((aspect, width)),
        }
    }

    #[must_use]
    pub fn widest(&self, output: &str, aspect: AspectRatio) -> Option<u64> {
        self.outputs
            .iter()
            .find(|(name, _)| name == output)
            .and_then(|(_, groups)| groups.iter().find(|(candidate, _)| *candidate == aspect))
            .map(|(_, width)| *width)
    }

    /// Iterates `(output, aspect, widest width)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, AspectRatio, u64)> + '_ {
        self.outputs.iter().flat_map(|(output, groups)| {
            groups
                .iter()
                .map(move |(aspect, width)| (output.as_str(), *aspect, *width))
        })
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.outputs.iter().map(|(_, groups)| groups.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedMode {
    pub mode: Mode,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub table: OutputModeTable,
    /// Modes to cycle through, one per surviving `(output, aspect)` group.
    pub modes: Vec<Mode>,
    pub rejected: Vec<RejectedMode>,
}

#[must_use]
pub fn build_table(modes: &[Mode]) -> (OutputModeTable, Vec<RejectedMode>) {
    let mut table = OutputModeTable::default();
    let mut rejected = Vec::new();

    for mode in modes {
        let parsed = parse_dimensions(&mode.label).and_then(|(width, height)| {
            AspectRatio::new(width, height)
                .map(|aspect| (width, aspect))
                .ok_or(LabelError::ZeroDimension)
        });
        match parsed {
            Ok((width, aspect)) => table.record(&mode.output, aspect, width),
            Err(error) => {
                tracing::warn!(output = %mode.output, label = %mode.label, %error, "skipping unparsable mode");
                rejected.push(RejectedMode {
                    mode: mode.clone(),
                    reason: format!("Error parsing {}: {error}", mode.label),
                });
            }
        }
    }

    (table, rejected)
}

#[must_use]
pub fn select_best_modes(modes: &[Mode]) -> Selection {
    let (table, rejected) = build_table(modes);

    let selected = table
        .iter()
        .filter_map(|(output, aspect, width)| {
            let height = aspect.height_for(width)?;
            if width < MIN_WIDTH || height < MIN_HEIGHT {
                tracing::debug!(output, %aspect, width, height, "mode below minimum size");
                return None;
            }
            Some(Mode::new(output, format!("{width}x{height}")))
        })
        .collect();

    Selection {
        table,
        modes: selected,
        rejected,
    }
}
