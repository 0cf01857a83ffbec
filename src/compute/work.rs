//! Work distribution for the life kernel
//!
//! The grid is cut into blocks of `GROUP_SIZE * CELLS_PER_THREAD` cells. One
//! workgroup handles one block and the block count is rounded up, so the
//! global size is always a whole number of groups.

/// Invocations per workgroup, matches `@workgroup_size` in the kernel
pub const GROUP_SIZE: u32 = 256;

/// Consecutive cells handled by one invocation (sqrt of the group size)
///
/// Must stay a multiple of 4: an invocation owns whole packed words.
pub const CELLS_PER_THREAD: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSizes {
    /// Invocations per group
    pub local: u32,
    /// Workgroups dispatched
    pub groups: u32,
    /// Total invocations, `groups * local`
    pub global: u64,
    pub cells_per_thread: u32,
}

impl WorkSizes {
    pub fn for_cells(cell_count: usize) -> Self {
        let cells_per_group = (GROUP_SIZE * CELLS_PER_THREAD) as usize;
        let groups = cell_count.div_ceil(cells_per_group).max(1);
        let groups = u32::try_from(groups).unwrap_or(u32::MAX);
        Self {
            local: GROUP_SIZE,
            groups,
            global: groups as u64 * GROUP_SIZE as u64,
            cells_per_thread: CELLS_PER_THREAD,
        }
    }

    /// Number of cells the dispatch can cover
    pub fn capacity(&self) -> u64 {
        self.global * self.cells_per_thread as u64
    }

    /// Largest grid a device with the given dispatch limit can step
    pub fn max_cells(max_groups_per_dimension: u32) -> usize {
        max_groups_per_dimension as usize * (GROUP_SIZE * CELLS_PER_THREAD) as usize
    }
}
