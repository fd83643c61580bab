//! Property-based invariant tests for best-mode selection.
//!
//! 1. At most one selected mode per (output, aspect ratio).
//! 2. Every selected mode meets the minimum width and height.
//! 3. Every selected mode is the widest of its group.
//! 4. Selected modes keep the ratio of their group exactly.
//! 5. Selection is deterministic for the same input.

use std::collections::HashSet;

use proptest::prelude::*;
use xrandr_cycle::report::Mode;
use xrandr_cycle::selector::{AspectRatio, MIN_HEIGHT, MIN_WIDTH, parse_dimensions, select_best_modes};

// ── Helpers ─────────────────────────────────────────────────────────────

fn mode_strategy() -> impl Strategy<Value = Mode> {
    (
        prop::sample::select(vec!["eDP-1", "HDMI-1", "VGA1"]),
        1u64..=4096,
        1u64..=2160,
    )
        .prop_map(|(output, width, height)| Mode::new(output, format!("{width}x{height}")))
}

fn mode_list(max_len: usize) -> impl Strategy<Value = Vec<Mode>> {
    proptest::collection::vec(mode_strategy(), 0..=max_len)
}

fn aspect_of(mode: &Mode) -> (u64, AspectRatio) {
    let (width, height) = parse_dimensions(&mode.label).expect("generated label parses");
    (width, AspectRatio::new(width, height).expect("non-zero dimensions"))
}

// ═════════════════════════════════════════════════════════════════════════
// 1. One mode per group
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn at_most_one_mode_per_group(modes in mode_list(60)) {
        let selection = select_best_modes(&modes);
        let mut seen = HashSet::new();
        for mode in &selection.modes {
            let (_, aspect) = aspect_of(mode);
            prop_assert!(
                seen.insert((mode.output.clone(), aspect)),
                "duplicate group for {}", mode
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Minimum size
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selected_modes_meet_minimum_size(modes in mode_list(60)) {
        for mode in select_best_modes(&modes).modes {
            let (width, height) = parse_dimensions(&mode.label).expect("selected label parses");
            prop_assert!(width >= MIN_WIDTH, "{} too narrow", mode);
            prop_assert!(height >= MIN_HEIGHT, "{} too short", mode);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 & 4. Widest of its group, exact ratio
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selected_mode_is_widest_of_its_group(modes in mode_list(60)) {
        for selected in select_best_modes(&modes).modes {
            let (width, aspect) = aspect_of(&selected);
            let widest = modes
                .iter()
                .filter(|candidate| candidate.output == selected.output)
                .map(aspect_of)
                .filter(|(_, candidate)| *candidate == aspect)
                .map(|(candidate_width, _)| candidate_width)
                .max();
            prop_assert_eq!(widest, Some(width));
        }
    }

    #[test]
    fn selected_label_is_an_input_label(modes in mode_list(60)) {
        let inputs: HashSet<&Mode> = modes.iter().collect();
        for selected in select_best_modes(&modes).modes {
            prop_assert!(inputs.contains(&selected), "{} was not discovered", selected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selection_is_deterministic(modes in mode_list(40)) {
        prop_assert_eq!(select_best_modes(&modes).modes, select_best_modes(&modes).modes);
    }
}
