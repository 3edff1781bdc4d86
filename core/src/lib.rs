#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Worm bricks simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually happened. Systems consume event streams, query
//! immutable views, and respond exclusively with new command batches.

mod settings;

pub use settings::{Settings, SettingsError, Tuning};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Worm bricks.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation by one fixed tick, moving every enabled worm.
    Tick,
    /// Requests that a worm be spawned at the provided cell.
    SpawnWorm {
        /// Cell the worm's head and coiled body start on.
        cell: CellCoord,
        /// Number of segments the worm is created with.
        length: u32,
        /// Appearance assigned to the worm and any blocks it later becomes.
        color: WormColor,
    },
    /// Requests that a fruit be dropped onto the provided cell.
    SpawnFruit {
        /// Cell that receives the fruit.
        cell: CellCoord,
    },
    /// Requests that a worm change its heading.
    SteerWorm {
        /// Identifier of the worm being steered.
        worm: WormId,
        /// Heading requested by the controller.
        direction: Direction,
    },
    /// Attaches a player to a worm so that it stops choosing its own heading.
    PossessWorm {
        /// Identifier of the worm being possessed.
        worm: WormId,
        /// Player taking control of the worm.
        player: PlayerId,
    },
    /// Detaches whichever player currently possesses the worm.
    ReleaseWorm {
        /// Identifier of the worm being released.
        worm: WormId,
    },
    /// Disables a worm, returning its segments to the module pool.
    DisableWorm {
        /// Identifier of the worm being disabled.
        worm: WormId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation advanced by one tick.
    TickAdvanced {
        /// Number of ticks processed since the world was created.
        tick: u64,
    },
    /// Confirms that a worm was spawned.
    WormSpawned {
        /// Identifier of the worm slot that was enabled.
        worm: WormId,
        /// Cell the worm occupies after spawning.
        cell: CellCoord,
        /// Number of segments acquired for the worm.
        length: u32,
        /// Appearance assigned to the worm.
        color: WormColor,
    },
    /// Reports that a worm spawn request was rejected.
    WormSpawnRejected {
        /// Cell requested for the spawn.
        cell: CellCoord,
        /// Reason the spawn was rejected.
        reason: SpawnRejection,
    },
    /// Confirms that a worm's head advanced between two cells.
    WormAdvanced {
        /// Identifier of the worm that moved.
        worm: WormId,
        /// Cell the head occupied before moving.
        from: CellCoord,
        /// Cell the head occupies after moving.
        to: CellCoord,
    },
    /// Confirms that a worm acquired an additional segment.
    WormGrew {
        /// Identifier of the worm that grew.
        worm: WormId,
        /// Number of segments after growing.
        length: u32,
    },
    /// Reports that a possessed worm could not move this tick.
    WormBlocked {
        /// Identifier of the blocked worm.
        worm: WormId,
    },
    /// Confirms that a steering request was accepted.
    WormSteered {
        /// Identifier of the steered worm.
        worm: WormId,
        /// Heading adopted by the worm.
        direction: Direction,
    },
    /// Confirms that a player took control of a worm.
    WormPossessed {
        /// Identifier of the possessed worm.
        worm: WormId,
        /// Player controlling the worm.
        player: PlayerId,
    },
    /// Confirms that a worm is no longer possessed.
    WormReleased {
        /// Identifier of the released worm.
        worm: WormId,
    },
    /// Confirms that a worm was converted into blocks.
    WormBlockified {
        /// Identifier of the worm that turned into blocks.
        worm: WormId,
        /// Number of blocks created from the worm's cells.
        blocks: u32,
    },
    /// Confirms that a worm was disabled and its cells cleared.
    WormDisabled {
        /// Identifier of the disabled worm.
        worm: WormId,
    },
    /// Confirms that a fruit was dropped into the grid.
    FruitSpawned {
        /// Identifier of the fruit slot that was enabled.
        fruit: FruitId,
        /// Cell occupied by the fruit.
        cell: CellCoord,
    },
    /// Reports that a fruit could not be dropped onto the requested cell.
    FruitSpawnRejected {
        /// Cell requested for the fruit.
        cell: CellCoord,
    },
    /// Confirms that a worm ate a fruit.
    FruitConsumed {
        /// Identifier of the worm that ate the fruit.
        worm: WormId,
        /// Identifier of the consumed fruit.
        fruit: FruitId,
        /// Cell the fruit occupied.
        cell: CellCoord,
    },
    /// Confirms that a block was placed into the grid.
    BlockSpawned {
        /// Identifier of the block slot that was enabled.
        block: BlockId,
        /// Region of cells covered by the block.
        region: CellRect,
        /// Appearance inherited from the worm.
        color: WormColor,
    },
    /// Confirms that an existing block was merged into a blockifying worm.
    BlockAbsorbed {
        /// Identifier of the absorbed block.
        block: BlockId,
        /// Worm whose cells absorbed the block.
        into: WormId,
    },
    /// Reports that a pool had no free slot for a request.
    PoolExhausted {
        /// Pool that ran out of slots.
        pool: PoolKind,
    },
}

/// Reasons a worm spawn request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRejection {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell is already claimed by an occupant.
    CellOccupied,
    /// No worm or module slot was available.
    PoolExhausted,
}

/// Fixed-capacity pools maintained by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Worm heads.
    Worms,
    /// Chain segments shared by every worm.
    Modules,
    /// Rectangular blocks left behind by stuck worms.
    Blocks,
    /// Consumable fruit.
    Fruit,
}

/// Visual appearance applied to a worm and the blocks it becomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WormColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl WormColor {
    /// Colours handed out to spawned worms in rotation.
    pub const PALETTE: [WormColor; 4] = [
        WormColor::from_rgb(0xe0, 0x4f, 0x5f),
        WormColor::from_rgb(0x4f, 0xb4, 0x77),
        WormColor::from_rgb(0x3f, 0x7c, 0xe0),
        WormColor::from_rgb(0xf2, 0xc1, 0x4e),
    ];

    /// Creates a new worm color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Cardinal movement directions available to worms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in the order used when scanning for a valid heading.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row delta of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Unique identifier assigned to a worm slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WormId(u32);

impl WormId {
    /// Creates a new worm identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a chain segment slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Creates a new module identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a block slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    /// Creates a new block identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a fruit slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FruitId(u32);

impl FruitId {
    /// Creates a new fruit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a player able to possess worms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Cell one step away in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant;
    /// the upper bound is the grid's concern.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the cell lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column >= self.origin.column
            && cell.row >= self.origin.row
            && cell.column - self.origin.column < self.size.width
            && cell.row - self.origin.row < self.size.height
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let width = self.size.width;
        (0..self.size.height).flat_map(move |dy| {
            (0..width).map(move |dx| CellCoord::new(origin.column + dx, origin.row + dy))
        })
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells covered.
    #[must_use]
    pub const fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Entity currently claiming a grid cell.
///
/// The grid stores these as non-owning back-references; occupants live in
/// their respective pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    /// A segment of a live worm.
    Worm(WormId),
    /// Part of a rectangular block.
    Block(BlockId),
    /// A consumable fruit.
    Fruit(FruitId),
}

/// Result of probing a grid cell before moving into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    /// The coordinate lies outside the grid.
    OutOfBounds,
    /// Nothing claims the cell.
    Empty,
    /// A worm segment or block claims the cell.
    Occupied,
    /// A fruit claims the cell and may be eaten.
    Fruit,
}

impl CellState {
    /// Reports whether a worm may move into a cell in this state.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        matches!(self, Self::Empty | Self::Fruit)
    }
}

/// Lifecycle stage of a worm slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WormState {
    /// The slot is free in the worm pool.
    Disabled,
    /// The worm is acquiring its segments.
    Spawning,
    /// The worm advanced on its last tick.
    Moving,
    /// A possessed worm could not advance on its last tick.
    Blocked,
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<Occupant>],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<Occupant>], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the occupant claiming the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Classifies the provided cell for movement checks.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> CellState {
        match self.index(cell) {
            None => CellState::OutOfBounds,
            Some(index) => match self.cells.get(index).copied().flatten() {
                None => CellState::Empty,
                Some(Occupant::Fruit(_)) => CellState::Fruit,
                Some(_) => CellState::Occupied,
            },
        }
    }

    /// Appends every unclaimed cell in row-major order to `out`.
    pub fn empty_cells(&self, out: &mut Vec<CellCoord>) {
        let columns = self.columns.max(1);
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.is_none() {
                let index = index as u32;
                out.push(CellCoord::new(index % columns, index / columns));
            }
        }
    }

    /// Returns an iterator over all cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Option<Occupant>> + 'a {
        self.cells.iter().copied()
    }

    /// Provides the dimensions of the underlying occupancy grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Immutable representation of a single chain segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentSnapshot {
    /// Module slot backing the segment.
    pub module: ModuleId,
    /// Grid-aligned destination of the segment.
    pub target: CellCoord,
}

/// Immutable representation of a single worm's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WormSnapshot {
    /// Identifier of the worm slot.
    pub id: WormId,
    /// Lifecycle stage of the worm.
    pub state: WormState,
    /// Appearance assigned to the worm.
    pub color: WormColor,
    /// Current heading.
    pub direction: Direction,
    /// Number of live segments.
    pub length: u32,
    /// Length the worm keeps growing toward.
    pub length_cap: u32,
    /// Player controlling the worm, if any.
    pub possessed_by: Option<PlayerId>,
    /// Segments ordered from head to tail.
    pub segments: Vec<SegmentSnapshot>,
}

impl WormSnapshot {
    /// Cell targeted by the head segment.
    #[must_use]
    pub fn head(&self) -> Option<CellCoord> {
        self.segments.first().map(|segment| segment.target)
    }
}

/// Read-only snapshot describing all enabled worms.
#[derive(Clone, Debug, Default)]
pub struct WormView {
    snapshots: Vec<WormSnapshot>,
}

impl WormView {
    /// Creates a new worm view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<WormSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured worm snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &WormSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot for a worm.
    #[must_use]
    pub fn get(&self, id: WormId) -> Option<&WormSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Returns the worm possessed by the provided player, if any.
    #[must_use]
    pub fn possessed_by(&self, player: PlayerId) -> Option<&WormSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.possessed_by == Some(player))
    }

    /// Number of enabled worms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no worm is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a single block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSnapshot {
    /// Identifier of the block slot.
    pub id: BlockId,
    /// Region of cells covered by the block.
    pub region: CellRect,
    /// Appearance inherited from the worm.
    pub color: WormColor,
}

/// Read-only snapshot describing all enabled blocks.
#[derive(Clone, Debug, Default)]
pub struct BlockView {
    snapshots: Vec<BlockSnapshot>,
}

impl BlockView {
    /// Creates a new block view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BlockSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured block snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockSnapshot> {
        self.snapshots.iter()
    }

    /// Total number of cells covered by all blocks.
    #[must_use]
    pub fn covered_cells(&self) -> u32 {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.region.size().area())
            .sum()
    }
}
