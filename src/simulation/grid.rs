//! Toroidal grid storage
//!
//! Cells are bytes (0 = dead, 1 = alive) stored row-major. Neighbour lookups
//! wrap on both axes so the grid has no edges.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: u32,
    pub cols: u32,
}

impl GridShape {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Flat index of column `i`, row `j`, or `None` when out of range
    pub fn index(&self, i: u32, j: u32) -> Option<usize> {
        (i < self.cols && j < self.rows).then(|| j as usize * self.cols as usize + i as usize)
    }

    /// Cell count rounded up to whole 32-bit words, as stored on the device
    pub fn padded_len(&self) -> usize {
        self.cell_count().div_ceil(4) * 4
    }
}

/// Owned grid contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    shape: GridShape,
    cells: Vec<u8>,
}

impl GridState {
    /// All-dead grid
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            cells: vec![0; shape.cell_count()],
        }
    }

    /// Adopt an existing flat buffer, normalising every byte to 0 or 1
    pub fn from_cells(shape: GridShape, cells: &[u8]) -> Option<Self> {
        (cells.len() == shape.cell_count()).then(|| Self {
            shape,
            cells: cells.iter().map(|&c| u8::from(c != 0)).collect(),
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    pub fn get(&self, i: u32, j: u32) -> Option<u8> {
        self.shape.index(i, j).map(|idx| self.cells[idx])
    }

    /// Number of alive cells
    pub fn population(&self) -> usize {
        population(&self.cells)
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols = self.shape.cols as usize;
        for row in self.cells.chunks(cols) {
            f.write_str("[ ")?;
            for (x, cell) in row.iter().enumerate() {
                write!(f, "{}", cell)?;
                if x + 1 < cols {
                    f.write_str(", ")?;
                }
            }
            f.write_str(" ]\n")?;
        }
        Ok(())
    }
}

pub fn population(cells: &[u8]) -> usize {
    cells.iter().filter(|&&c| c != 0).count()
}

/// Fill `cells` with a reproducible coin flip per cell
pub fn fill_random(cells: &mut [u8], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for cell in cells.iter_mut() {
        *cell = u8::from(rng.random_bool(0.5));
    }
}

/// Copy `src` into `dst` as 0/1 bytes
pub(crate) fn copy_normalized(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = u8::from(s != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_bounds() {
        let shape = GridShape::new(3, 4);
        assert_eq!(shape.index(0, 0), Some(0));
        assert_eq!(shape.index(3, 2), Some(11));
        assert_eq!(shape.index(4, 0), None);
        assert_eq!(shape.index(0, 3), None);
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(GridShape::new(3, 3).padded_len(), 12);
        assert_eq!(GridShape::new(2, 2).padded_len(), 4);
        assert_eq!(GridShape::new(1, 1).padded_len(), 4);
    }

    #[test]
    fn test_random_fill_is_seeded() {
        let mut a = vec![0u8; 256];
        let mut b = vec![0u8; 256];
        fill_random(&mut a, 42);
        fill_random(&mut b, 42);
        assert_eq!(a, b);
        assert!(a.iter().all(|&c| c <= 1));

        let alive = population(&a);
        assert!(alive > 64 && alive < 192, "implausible coin flips: {}", alive);

        fill_random(&mut b, 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_cells_normalises() {
        let shape = GridShape::new(1, 3);
        let grid = GridState::from_cells(shape, &[0, 7, 1]).unwrap();
        assert_eq!(grid.cells(), &[0, 1, 1]);
        assert!(GridState::from_cells(shape, &[0, 1]).is_none());
    }

    #[test]
    fn test_display_rows() {
        let shape = GridShape::new(2, 2);
        let grid = GridState::from_cells(shape, &[1, 0, 0, 1]).unwrap();
        assert_eq!(grid.to_string(), "[ 1, 0 ]\n[ 0, 1 ]\n");
        assert_eq!(grid.population(), 2);
    }
}
