//! Worm heads and the segment chains they drag across the grid.
//!
//! A worm owns a singly linked run of [`Module`]s drawn from the shared module
//! pool. Movement is a shift register: the head takes the cell it steps into
//! and every following segment takes the cell its predecessor just left.
//! Freshly spawned worms stack all of their segments on the starting cell and
//! uncoil as the head moves away.

use rand::Rng;
use worm_bricks_core::{
    CellCoord, CellState, Direction, FruitId, ModuleId, Occupant, PlayerId, SegmentSnapshot,
    WormColor, WormId, WormSnapshot, WormState,
};

use crate::{
    grid::GridMap,
    pool::{Pool, Poolable},
};

/// Segment of a worm's chain.
#[derive(Clone, Debug)]
pub(crate) struct Module {
    target: CellCoord,
    direction: Direction,
    next: Option<ModuleId>,
}

impl Module {
    pub(crate) fn new() -> Self {
        Self {
            target: CellCoord::new(0, 0),
            direction: Direction::East,
            next: None,
        }
    }
}

impl Poolable for Module {
    fn on_disable(&mut self) {
        self.next = None;
    }
}

/// Outcome of a single movement tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Advance {
    /// The head moved into a free or fruit cell.
    Moved(Step),
    /// A possessed worm ran into something and waits for its player.
    Blocked,
    /// An unpossessed worm found no way forward, even after one retry.
    Stuck,
}

/// Effects of a successful step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) from: CellCoord,
    pub(crate) to: CellCoord,
    pub(crate) eaten: Option<FruitId>,
    pub(crate) grew: bool,
    /// Growth was due but the module pool had no free slot.
    pub(crate) starved: bool,
}

/// Head of a worm; lives in the worm pool.
#[derive(Clone, Debug)]
pub(crate) struct Worm {
    id: WormId,
    head: Option<ModuleId>,
    tail: Option<ModuleId>,
    length: u32,
    length_cap: u32,
    direction: Direction,
    color: WormColor,
    possessed_by: Option<PlayerId>,
    state: WormState,
    grow_pending: bool,
}

impl Poolable for Worm {
    fn on_enable(&mut self) {
        self.state = WormState::Spawning;
    }

    fn on_disable(&mut self) {
        self.head = None;
        self.tail = None;
        self.length = 0;
        self.possessed_by = None;
        self.grow_pending = false;
        self.state = WormState::Disabled;
    }
}

impl Worm {
    pub(crate) fn new(id: WormId) -> Self {
        Self {
            id,
            head: None,
            tail: None,
            length: 0,
            length_cap: 0,
            direction: Direction::East,
            color: WormColor::PALETTE[0],
            possessed_by: None,
            state: WormState::Disabled,
            grow_pending: false,
        }
    }

    pub(crate) fn length(&self) -> u32 {
        self.length
    }

    pub(crate) fn color(&self) -> WormColor {
        self.color
    }

    pub(crate) fn possessed_by(&self) -> Option<PlayerId> {
        self.possessed_by
    }

    pub(crate) fn possess(&mut self, player: Option<PlayerId>) {
        self.possessed_by = player;
    }

    /// Acquires a head plus up to `length - 1` coiled segments on `cell`.
    ///
    /// Returns the number of segments acquired; zero means the module pool
    /// could not even supply a head and nothing was registered.
    pub(crate) fn spawn<R: Rng>(
        &mut self,
        cell: CellCoord,
        length: u32,
        color: WormColor,
        modules: &mut Pool<ModuleId, Module>,
        grid: &mut GridMap,
        rng: &mut R,
    ) -> u32 {
        let Some(head) = modules.enable() else {
            return 0;
        };
        if grid.set(cell, Some(Occupant::Worm(self.id))).is_err() {
            let _ = modules.disable(head);
            return 0;
        }
        if let Some(module) = modules.get_mut(head) {
            module.target = cell;
            module.next = None;
        }

        self.head = Some(head);
        self.tail = Some(head);
        self.length = 1;
        self.length_cap = length;
        self.color = color;
        self.possessed_by = None;
        self.grow_pending = false;

        while self.length < length {
            if !self.grow(cell, modules) {
                break;
            }
        }

        self.direction = choose_direction(cell, grid, rng)
            .unwrap_or_else(|| Direction::ALL[rng.gen_range(0..Direction::ALL.len())]);
        if let Some(module) = modules.get_mut(head) {
            module.direction = self.direction;
        }
        self.state = WormState::Moving;
        self.length
    }

    /// Runs one movement tick.
    pub(crate) fn advance<R: Rng>(
        &mut self,
        modules: &mut Pool<ModuleId, Module>,
        grid: &mut GridMap,
        rng: &mut R,
        max_length: u32,
    ) -> Advance {
        if self.grow_pending {
            self.grow_pending = false;
            self.length_cap = (self.length_cap + 1).min(max_length);
        }

        let Some(head_cell) = self.head_cell(modules) else {
            debug_assert!(false, "enabled worm without a head module");
            return Advance::Stuck;
        };

        if let Some(step) = self.try_step(head_cell, self.direction, modules, grid) {
            return Advance::Moved(step);
        }

        if self.possessed_by.is_some() {
            self.state = WormState::Blocked;
            return Advance::Blocked;
        }

        if let Some(direction) = choose_direction(head_cell, grid, rng) {
            if let Some(step) = self.try_step(head_cell, direction, modules, grid) {
                return Advance::Moved(step);
            }
        }
        Advance::Stuck
    }

    /// Adopts `direction` if the cell that way is free or holds fruit.
    pub(crate) fn steer(
        &mut self,
        direction: Direction,
        modules: &Pool<ModuleId, Module>,
        grid: &GridMap,
    ) -> bool {
        let Some(head_cell) = self.head_cell(modules) else {
            return false;
        };
        if !grid.check_step(head_cell, direction).is_passable() {
            return false;
        }
        self.direction = direction;
        true
    }

    /// Returns every segment to the module pool and clears the worm's cells.
    pub(crate) fn teardown(&mut self, modules: &mut Pool<ModuleId, Module>, grid: &mut GridMap) {
        let occupant = Occupant::Worm(self.id);
        let mut cursor = self.head.take();
        while let Some(id) = cursor {
            let Some(module) = modules.get(id) else {
                break;
            };
            let (target, next) = (module.target, module.next);
            let _ = grid.release(target, occupant);
            let _ = modules.disable(id);
            cursor = next;
        }
        self.tail = None;
        self.length = 0;
    }

    /// Appends the distinct cells claimed by the chain, head first.
    pub(crate) fn occupied_cells(&self, modules: &Pool<ModuleId, Module>, out: &mut Vec<CellCoord>) {
        let start = out.len();
        for (_, module) in self.chain(modules) {
            if out[start..].last() != Some(&module.target) {
                out.push(module.target);
            }
        }
    }

    pub(crate) fn snapshot(&self, modules: &Pool<ModuleId, Module>) -> WormSnapshot {
        WormSnapshot {
            id: self.id,
            state: self.state,
            color: self.color,
            direction: self.direction,
            length: self.length,
            length_cap: self.length_cap,
            possessed_by: self.possessed_by,
            segments: self
                .chain(modules)
                .map(|(module, segment)| SegmentSnapshot {
                    module,
                    target: segment.target,
                })
                .collect(),
        }
    }

    fn head_cell(&self, modules: &Pool<ModuleId, Module>) -> Option<CellCoord> {
        modules.get(self.head?).map(|module| module.target)
    }

    fn chain<'a>(
        &self,
        modules: &'a Pool<ModuleId, Module>,
    ) -> impl Iterator<Item = (ModuleId, &'a Module)> + 'a {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            let module = modules.get(id)?;
            cursor = module.next;
            Some((id, module))
        })
    }

    fn grow(&mut self, cell: CellCoord, modules: &mut Pool<ModuleId, Module>) -> bool {
        let Some(tail) = self.tail else {
            return false;
        };
        let direction = modules
            .get(tail)
            .map_or(self.direction, |module| module.direction);
        let Some(id) = modules.enable() else {
            return false;
        };
        if let Some(module) = modules.get_mut(id) {
            module.target = cell;
            module.direction = direction;
            module.next = None;
        }
        if let Some(module) = modules.get_mut(tail) {
            module.next = Some(id);
        }
        self.tail = Some(id);
        self.length += 1;
        true
    }

    fn try_step(
        &mut self,
        from: CellCoord,
        direction: Direction,
        modules: &mut Pool<ModuleId, Module>,
        grid: &mut GridMap,
    ) -> Option<Step> {
        let to = from.neighbor(direction)?;
        let eaten = match grid.check(to) {
            CellState::Empty => None,
            CellState::Fruit => match grid.occupant(to) {
                Some(Occupant::Fruit(fruit)) => Some(fruit),
                _ => None,
            },
            CellState::Occupied | CellState::OutOfBounds => return None,
        };
        let occupant = Occupant::Worm(self.id);
        grid.set(to, Some(occupant)).ok()?;

        let mut carried = (to, direction);
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(module) = modules.get_mut(id) else {
                break;
            };
            let previous = (module.target, module.direction);
            module.target = carried.0;
            module.direction = carried.1;
            carried = previous;
            cursor = module.next;
        }
        let vacated = carried.0;

        let mut grew = false;
        let mut starved = false;
        if self.length < self.length_cap {
            grew = self.grow(vacated, modules);
            starved = !grew;
        }
        if !grew {
            let tail_target = self
                .tail
                .and_then(|tail| modules.get(tail))
                .map(|module| module.target);
            if tail_target != Some(vacated) {
                let _ = grid.release(vacated, occupant);
            }
        }

        if eaten.is_some() {
            self.grow_pending = true;
        }
        self.direction = direction;
        self.state = WormState::Moving;
        Some(Step {
            from,
            to,
            eaten,
            grew,
            starved,
        })
    }
}

/// Scans the four headings from a random start and returns the first one
/// leading to a free or fruit cell.
pub(crate) fn choose_direction<R: Rng>(
    from: CellCoord,
    grid: &GridMap,
    rng: &mut R,
) -> Option<Direction> {
    let start = rng.gen_range(0..Direction::ALL.len());
    (0..Direction::ALL.len())
        .map(|offset| Direction::ALL[(start + offset) % Direction::ALL.len()])
        .find(|direction| grid.check_step(from, *direction).is_passable())
}
