use std::collections::TryReserveError;

/// Per-cell atom bookkeeping: one counter and a bounded index list for
/// every cell of the local region, cell-major.
///
/// The counters are incremented concurrently during the mapping pass; a
/// cell whose counter would pass `capacity` keeps its counter at capacity
/// and fails the pass instead of dropping particles silently.
pub struct CellAtomLists {
    num_cells: usize,
    capacity: u32,
    counts: Vec<u32>,
    atoms: Vec<u32>,
}

impl CellAtomLists {
    pub fn new(num_cells: usize, capacity: u32) -> Result<Self, TryReserveError> {
        let mut cells = Self {
            num_cells: 0,
            capacity: 0,
            counts: Vec::new(),
            atoms: Vec::new(),
        };
        cells.resize(num_cells, capacity)?;
        Ok(cells)
    }

    /// Adopts new extents or capacity. Storage only ever grows; a failed
    /// growth leaves the previous buffers and extents intact.
    pub fn resize(&mut self, num_cells: usize, capacity: u32) -> Result<(), TryReserveError> {
        if self.counts.len() < num_cells {
            self.counts.try_reserve(num_cells - self.counts.len())?;
        }
        let slots = num_cells * capacity as usize;
        if self.atoms.len() < slots {
            self.atoms.try_reserve(slots - self.atoms.len())?;
        }

        self.counts.resize(self.counts.len().max(num_cells), 0);
        self.atoms.resize(self.atoms.len().max(slots), 0);
        self.num_cells = num_cells;
        self.capacity = capacity;
        Ok(())
    }

    /// Zeroes every counter. Called at the start of each pass.
    pub fn reset(&mut self) {
        self.counts[..self.num_cells].fill(0);
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts[..self.num_cells]
    }

    /// Mutable counter and slot storage, borrowed together for a pass.
    pub(crate) fn views_mut(&mut self) -> (&mut [u32], &mut [u32]) {
        let slots = self.num_cells * self.capacity as usize;
        (
            &mut self.counts[..self.num_cells],
            &mut self.atoms[..slots],
        )
    }

    pub fn count_of(&self, cell: usize) -> u32 {
        self.counts[cell]
    }

    /// Indices of the atoms assigned to one cell, in unspecified order.
    pub fn atoms_of(&self, cell: usize) -> &[u32] {
        let start = cell * self.capacity as usize;
        let count = self.counts[cell].min(self.capacity) as usize;
        &self.atoms[start..start + count]
    }

    pub fn host_memory_usage(&self) -> usize {
        (self.counts.capacity() + self.atoms.capacity()) * std::mem::size_of::<u32>()
    }
}
