//! Classic Game of Life patterns
//!
//! Patterns are stamped through [`SimulationBackend::set_cell`], so any
//! backend (or the switcher) accepts them. Cells that fall outside a small
//! grid are dropped.

use super::traits::SimulationBackend;
use crate::error::BackendError;

const GLIDER: [(u32, u32); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

const BLOCK: [(u32, u32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

const GOSPER_GUN: [(u32, u32); 36] = [
    (24, 0),
    (22, 1),
    (24, 1),
    (12, 2),
    (13, 2),
    (20, 2),
    (21, 2),
    (34, 2),
    (35, 2),
    (11, 3),
    (15, 3),
    (20, 3),
    (21, 3),
    (34, 3),
    (35, 3),
    (0, 4),
    (1, 4),
    (10, 4),
    (16, 4),
    (20, 4),
    (21, 4),
    (0, 5),
    (1, 5),
    (10, 5),
    (14, 5),
    (16, 5),
    (17, 5),
    (22, 5),
    (24, 5),
    (10, 6),
    (16, 6),
    (24, 6),
    (11, 7),
    (15, 7),
    (12, 8),
    (13, 8),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LifePattern {
    Clear,
    Random,
    Glider,
    Blinker,
    Block,
    GosperGun,
}

impl LifePattern {
    pub const ALL: [LifePattern; 6] = [
        LifePattern::Clear,
        LifePattern::Random,
        LifePattern::Glider,
        LifePattern::Blinker,
        LifePattern::Block,
        LifePattern::GosperGun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifePattern::Clear => "Clear",
            LifePattern::Random => "Random",
            LifePattern::Glider => "Glider",
            LifePattern::Blinker => "Blinker",
            LifePattern::Block => "Block",
            LifePattern::GosperGun => "Gosper Gun",
        }
    }

    /// Live cells as `(col, row)` for a `rows x cols` grid
    ///
    /// Small patterns sit at the center, the gun at the upper left corner.
    /// `Clear` and `Random` have no fixed cells.
    pub fn cells(&self, rows: u32, cols: u32) -> Vec<(u32, u32)> {
        let (cx, cy) = (cols / 2, rows / 2);
        let offset = |cells: &[(u32, u32)], x: u32, y: u32| -> Vec<(u32, u32)> {
            cells.iter().map(|(dx, dy)| (x + dx, y + dy)).collect()
        };

        match self {
            LifePattern::Clear | LifePattern::Random => Vec::new(),
            LifePattern::Glider => offset(&GLIDER, cx, cy),
            // Vertical bar through the center
            LifePattern::Blinker => (0..3).map(|dy| (cx, (cy + dy).saturating_sub(1))).collect(),
            LifePattern::Block => offset(&BLOCK, cx, cy),
            LifePattern::GosperGun => GOSPER_GUN.to_vec(),
        }
    }

    /// Clear `backend` and draw the pattern into it
    ///
    /// `seed` only matters for [`LifePattern::Random`].
    pub fn stamp<B>(&self, backend: &mut B, seed: u64) -> Result<(), BackendError>
    where
        B: SimulationBackend + ?Sized,
    {
        if *self == LifePattern::Random {
            return backend.initialize_random(seed);
        }

        backend.initialize()?;
        let shape = backend.shape();
        for (i, j) in self.cells(shape.rows, shape.cols) {
            backend.set_cell(i, j, 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for LifePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
