//! Palette allocation for new top-level branches

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::entities::{Forest, ACCENT_COLOR};

/// Compiled-in palette, used when the configured one is empty.
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#008080", "#9a6324", "#800000",
];

/// Hands out palette colors, avoiding ones already in use while any remain.
#[derive(Debug)]
pub struct ColorAssigner {
    palette: Vec<String>,
    used: HashSet<String>,
    rng: StdRng,
}

impl ColorAssigner {
    pub fn new(palette: Vec<String>) -> Self {
        Self::with_rng(palette, StdRng::from_os_rng())
    }

    /// Deterministic assigner for tests and reproducible sessions.
    pub fn seeded(palette: Vec<String>, seed: u64) -> Self {
        Self::with_rng(palette, StdRng::seed_from_u64(seed))
    }

    fn with_rng(palette: Vec<String>, rng: StdRng) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            palette,
            used: HashSet::new(),
            rng,
        }
    }

    /// Record every palette color already present in `forest`.
    pub fn observe(&mut self, forest: &Forest) {
        forest.walk(|node| {
            if node.color != ACCENT_COLOR && self.palette.contains(&node.color) {
                self.used.insert(node.color.clone());
            }
        });
        debug!(used = self.used.len(), "palette seeded from forest");
    }

    /// Pick a color not in `used` (nor previously handed out).
    ///
    /// Once every entry is taken the draw is uniform over the full palette;
    /// `used` no longer narrows it.
    pub fn next(&mut self, used: &HashSet<String>) -> String {
        let free: Vec<&String> = self
            .palette
            .iter()
            .filter(|c| !used.contains(*c) && !self.used.contains(*c))
            .collect();

        let color = if free.is_empty() {
            self.palette[self.rng.random_range(0..self.palette.len())].clone()
        } else {
            free[self.rng.random_range(0..free.len())].clone()
        };

        self.used.insert(color.clone());
        color
    }
}
