/// Selects how charge deposition is partitioned across workers.
///
/// All variants produce grids equal within floating tolerance; they differ
/// only in throughput under contention.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpreadStrategy {
    /// One worker per particle, atomic accumulation into the brick.
    Scatter,
    /// Worker groups own brick slabs and gather from the cell lists; no
    /// atomics, at the cost of a per-column halo carry.
    TiledGather,
    /// `Scatter` with the stride-based worker permutation applied, so
    /// adjacent workers land on distant cells.
    ResequencedScatter,
}

/// Tuning knobs of a spreading pass.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpreadParameters {
    /// Deposition strategy.
    pub strategy: SpreadStrategy,
    /// Atom-list capacity of each cell. Exceeding it fails the pass with a
    /// `CellOverflow`; re-run with a larger capacity to recover.
    pub cell_capacity: u32,
    /// Stride of the worker-to-particle permutation used by the mapper and
    /// the resequenced scatter. Purely a contention heuristic.
    pub resequence_skip: u32,
}

impl Default for SpreadParameters {
    fn default() -> Self {
        Self {
            strategy: SpreadStrategy::Scatter,
            cell_capacity: 64,
            resequence_skip: 16,
        }
    }
}
