use serde::{Deserialize, Serialize};

/// Order in which the cells of a rectangular grid are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Traversal {
    RowMajor,
    /// Boustrophedon: even rows left to right, odd rows right to left
    #[default]
    Serpentine,
}

/// One visited grid cell. `index` is the position in the visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub index: usize,
    pub row: usize,
    pub col: usize,
}

/// Visit every cell of a `cols` x `rows` grid, top row first.
///
/// This is the one scan order used for stage positions, cleave regions and sub-cells;
/// indices handed downstream are positional, so every caller must go through here.
pub fn traverse(traversal: Traversal, cols: usize, rows: usize) -> impl Iterator<Item = GridCell> {
    (0..rows)
        .flat_map(move |row| (0..cols).map(move |step| (row, step)))
        .enumerate()
        .map(move |(index, (row, step))| {
            let col = match traversal {
                Traversal::Serpentine if row % 2 == 1 => cols - 1 - step,
                _ => step,
            };
            GridCell { index, row, col }
        })
}
