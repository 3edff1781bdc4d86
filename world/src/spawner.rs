//! Converts a stuck worm's cells into merged rectangular blocks.

use tracing::{debug, warn};
use worm_bricks_core::{
    BlockId, CellCoord, CellRect, CellRectSize, Direction, Event, Occupant, PoolKind, WormColor,
    WormId,
};

use crate::{
    grid::GridMap,
    pool::{Pool, Poolable},
};

/// Rectangle of cells left behind by a worm.
#[derive(Clone, Debug)]
pub(crate) struct Block {
    region: CellRect,
    color: WormColor,
}

impl Block {
    pub(crate) fn new() -> Self {
        Self {
            region: CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(0, 0)),
            color: WormColor::PALETTE[0],
        }
    }

    pub(crate) fn region(&self) -> CellRect {
        self.region
    }

    pub(crate) fn color(&self) -> WormColor {
        self.color
    }
}

impl Poolable for Block {}

/// Greedy rectangle merger with reusable scratch buffers.
#[derive(Debug, Default)]
pub(crate) struct BlockSpawner {
    pending: Vec<CellCoord>,
    absorbed: Vec<(BlockId, CellRect)>,
    marks: Vec<bool>,
    rects: Vec<CellRect>,
}

impl BlockSpawner {
    /// Replaces `cells` with blocks of `color`, absorbing adjacent blocks of
    /// the same colour first. Returns the number of blocks placed.
    ///
    /// Absorption only happens when the block pool can hold every merged
    /// rectangle; otherwise the neighbours stay untouched and only `cells`
    /// are placed. The cells must already be free of the worm's own
    /// registration.
    pub(crate) fn blockify(
        &mut self,
        owner: WormId,
        cells: &[CellCoord],
        color: WormColor,
        grid: &mut GridMap,
        blocks: &mut Pool<BlockId, Block>,
        out: &mut Vec<Event>,
    ) -> u32 {
        self.find_neighbors(cells, color, grid, blocks);
        self.pending.clear();
        self.pending.extend_from_slice(cells);
        self.pending
            .extend(self.absorbed.iter().flat_map(|(_, region)| region.cells()));
        self.merge();

        if !self.absorbed.is_empty() {
            let needed = self.rects.len().saturating_sub(self.absorbed.len());
            if blocks.has_available(needed) {
                self.absorb(owner, grid, blocks, out);
            } else {
                debug!(
                    owner = owner.get(),
                    neighbors = self.absorbed.len(),
                    "block pool too full to absorb neighbours"
                );
                self.absorbed.clear();
                self.pending.clear();
                self.pending.extend_from_slice(cells);
                self.merge();
            }
        }

        let mut placed = 0;
        for rect in &self.rects {
            let Some(block) = blocks.enable() else {
                warn!(owner = owner.get(), placed, "block pool exhausted");
                out.push(Event::PoolExhausted {
                    pool: PoolKind::Blocks,
                });
                break;
            };
            if let Some(entry) = blocks.get_mut(block) {
                entry.region = *rect;
                entry.color = color;
            }
            for cell in rect.cells() {
                if let Err(error) = grid.set(cell, Some(Occupant::Block(block))) {
                    warn!(%error, "block cell outside grid");
                }
            }
            out.push(Event::BlockSpawned {
                block,
                region: *rect,
                color,
            });
            placed += 1;
        }
        placed
    }

    /// Collects the distinct same-coloured blocks touching `cells`.
    fn find_neighbors(
        &mut self,
        cells: &[CellCoord],
        color: WormColor,
        grid: &GridMap,
        blocks: &Pool<BlockId, Block>,
    ) {
        self.absorbed.clear();
        for cell in cells {
            for direction in Direction::ALL {
                let Some(neighbor) = cell.neighbor(direction) else {
                    continue;
                };
                let Some(Occupant::Block(block)) = grid.occupant(neighbor) else {
                    continue;
                };
                if self.absorbed.iter().any(|(seen, _)| *seen == block) {
                    continue;
                }
                if let Some(entry) = blocks.get(block).filter(|entry| entry.color == color) {
                    self.absorbed.push((block, entry.region));
                }
            }
        }
    }

    fn absorb(
        &mut self,
        owner: WormId,
        grid: &mut GridMap,
        blocks: &mut Pool<BlockId, Block>,
        out: &mut Vec<Event>,
    ) {
        for (block, region) in self.absorbed.drain(..) {
            let _ = blocks.disable(block);
            for covered in region.cells() {
                let _ = grid.release(covered, Occupant::Block(block));
            }
            out.push(Event::BlockAbsorbed { block, into: owner });
        }
    }

    /// Covers `pending` with rectangles, widening before heightening and
    /// alternating until neither axis can grow.
    fn merge(&mut self) {
        self.rects.clear();
        let Some((min, max)) = bounds(&self.pending) else {
            return;
        };
        let width = (max.column() - min.column() + 1) as usize;
        let height = (max.row() - min.row() + 1) as usize;

        self.marks.clear();
        self.marks.resize(width * height, false);
        for cell in &self.pending {
            let x = (cell.column() - min.column()) as usize;
            let y = (cell.row() - min.row()) as usize;
            self.marks[y * width + x] = true;
        }

        for y in 0..height {
            for x in 0..width {
                if !self.marks[y * width + x] {
                    continue;
                }

                let mut w = 1;
                let mut h = 1;
                loop {
                    let wider = x + w < width
                        && (y..y + h).all(|row| self.marks[row * width + x + w]);
                    if wider {
                        w += 1;
                    }
                    let taller = y + h < height
                        && (x..x + w).all(|column| self.marks[(y + h) * width + column]);
                    if taller {
                        h += 1;
                    }
                    if !wider && !taller {
                        break;
                    }
                }

                for row in y..y + h {
                    self.marks[row * width + x..row * width + x + w].fill(false);
                }
                self.rects.push(CellRect::from_origin_and_size(
                    CellCoord::new(min.column() + x as u32, min.row() + y as u32),
                    CellRectSize::new(w as u32, h as u32),
                ));
            }
        }
    }
}

fn bounds(cells: &[CellCoord]) -> Option<(CellCoord, CellCoord)> {
    let first = *cells.first()?;
    let (min, max) = cells.iter().fold((first, first), |(min, max), cell| {
        (
            CellCoord::new(min.column().min(cell.column()), min.row().min(cell.row())),
            CellCoord::new(max.column().max(cell.column()), max.row().max(cell.row())),
        )
    });
    Some((min, max))
}
