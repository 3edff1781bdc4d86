#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Worm bricks.
//!
//! The world owns one [`GridMap`] and four fixed-capacity [`Pool`]s (worms,
//! chain modules, blocks and fruit). All mutation flows through [`apply`];
//! read access goes through the [`query`] module. A tick moves every enabled
//! worm in the worm pool's current array order, and each move sees the grid
//! exactly as the previous worm left it.

pub mod grid;
pub mod pool;
mod spawner;
mod worm;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};
use worm_bricks_core::{
    BlockId, CellCoord, CellState, Command, Direction, Event, FruitId, ModuleId, Occupant,
    PlayerId, PoolKind, Settings, SpawnRejection, WormColor, WormId, WELCOME_BANNER,
};

pub use grid::{GridError, GridMap};
pub use pool::{Handle, Pool, PoolError, Poolable, Slot};

use self::{
    spawner::{Block, BlockSpawner},
    worm::{Advance, Module, Worm},
};

/// Reasons a world cannot be constructed.
#[derive(Debug, Error)]
pub enum WorldError {
    /// One of the pools could not be allocated.
    #[error("failed to allocate {kind:?} pool")]
    Pool {
        /// Pool that failed.
        kind: PoolKind,
        /// Underlying pool error.
        #[source]
        source: PoolError,
    },
}

/// Consumable dropped onto the grid.
#[derive(Clone, Debug)]
struct Fruit {
    cell: CellCoord,
}

impl Poolable for Fruit {}

/// Represents the authoritative Worm bricks world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    settings: Settings,
    grid: GridMap,
    worms: Pool<WormId, Worm>,
    modules: Pool<ModuleId, Module>,
    blocks: Pool<BlockId, Block>,
    fruit: Pool<FruitId, Fruit>,
    spawner: BlockSpawner,
    rng: ChaCha8Rng,
    scratch: Vec<CellCoord>,
    tick_index: u64,
}

impl World {
    /// Creates an empty world sized and seeded from `settings`.
    pub fn new(settings: Settings) -> Result<Self, WorldError> {
        let tuning = settings.tuning();
        let grid = GridMap::new(
            settings.columns(),
            settings.rows(),
            settings.cell_size(),
            Vec2::new(settings.viewport_width(), settings.viewport_height()),
        );
        let worms = allocate(PoolKind::Worms, tuning.worm_capacity, Worm::new)?;
        let modules = allocate(PoolKind::Modules, tuning.module_capacity, |_| Module::new())?;
        let blocks = allocate(PoolKind::Blocks, tuning.block_capacity, |_| Block::new())?;
        let fruit = allocate(PoolKind::Fruit, tuning.fruit_capacity, |_| Fruit {
            cell: CellCoord::new(0, 0),
        })?;
        let rng = ChaCha8Rng::seed_from_u64(tuning.seed);

        Ok(Self {
            banner: WELCOME_BANNER,
            scratch: Vec::with_capacity(tuning.max_length as usize),
            settings,
            grid,
            worms,
            modules,
            blocks,
            fruit,
            spawner: BlockSpawner::default(),
            rng,
            tick_index: 0,
        })
    }

    fn tick(&mut self, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TickAdvanced {
            tick: self.tick_index,
        });

        for position in 0..self.worms.capacity() {
            if let Some(worm) = self.worms.enabled_at(position) {
                self.step_worm(worm, out_events);
            }
        }
    }

    fn step_worm(&mut self, id: WormId, out_events: &mut Vec<Event>) {
        let max_length = self.settings.tuning().max_length;
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };

        match worm.advance(&mut self.modules, &mut self.grid, &mut self.rng, max_length) {
            Advance::Moved(step) => {
                out_events.push(Event::WormAdvanced {
                    worm: id,
                    from: step.from,
                    to: step.to,
                });
                if let Some(fruit) = step.eaten {
                    let _ = self.fruit.disable(fruit);
                    out_events.push(Event::FruitConsumed {
                        worm: id,
                        fruit,
                        cell: step.to,
                    });
                }
                if step.grew {
                    out_events.push(Event::WormGrew {
                        worm: id,
                        length: worm.length(),
                    });
                }
                if step.starved {
                    warn!(worm = id.get(), "module pool exhausted, growth deferred");
                    out_events.push(Event::PoolExhausted {
                        pool: PoolKind::Modules,
                    });
                }
            }
            Advance::Blocked => out_events.push(Event::WormBlocked { worm: id }),
            Advance::Stuck => self.blockify(id, out_events),
        }
    }

    fn blockify(&mut self, id: WormId, out_events: &mut Vec<Event>) {
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };
        let color = worm.color();
        self.scratch.clear();
        worm.occupied_cells(&self.modules, &mut self.scratch);
        worm.teardown(&mut self.modules, &mut self.grid);
        let _ = self.worms.disable(id);

        let blocks = self.spawner.blockify(
            id,
            &self.scratch,
            color,
            &mut self.grid,
            &mut self.blocks,
            out_events,
        );
        info!(worm = id.get(), cells = self.scratch.len(), blocks, "worm turned into blocks");
        out_events.push(Event::WormBlockified { worm: id, blocks });
        out_events.push(Event::WormDisabled { worm: id });
    }

    fn spawn_worm(
        &mut self,
        cell: CellCoord,
        length: u32,
        color: WormColor,
        out_events: &mut Vec<Event>,
    ) {
        let rejection = match self.grid.check(cell) {
            CellState::Empty => None,
            CellState::OutOfBounds => Some(SpawnRejection::OutOfBounds),
            CellState::Occupied | CellState::Fruit => Some(SpawnRejection::CellOccupied),
        };
        if let Some(reason) = rejection {
            debug!(?cell, ?reason, "worm spawn rejected");
            out_events.push(Event::WormSpawnRejected { cell, reason });
            return;
        }

        let exhausted = if !self.modules.has_available(1) {
            Some(PoolKind::Modules)
        } else if !self.worms.has_available(1) {
            Some(PoolKind::Worms)
        } else {
            None
        };
        if let Some(pool) = exhausted {
            warn!(?pool, "pool exhausted, worm not spawned");
            out_events.push(Event::PoolExhausted { pool });
            out_events.push(Event::WormSpawnRejected {
                cell,
                reason: SpawnRejection::PoolExhausted,
            });
            return;
        }

        let Some(id) = self.worms.enable() else {
            return;
        };
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };
        let length = length.clamp(1, self.settings.tuning().max_length.max(1));
        let acquired = worm.spawn(
            cell,
            length,
            color,
            &mut self.modules,
            &mut self.grid,
            &mut self.rng,
        );
        if acquired == 0 {
            let _ = self.worms.disable(id);
            out_events.push(Event::WormSpawnRejected {
                cell,
                reason: SpawnRejection::PoolExhausted,
            });
            return;
        }
        if acquired < length {
            warn!(worm = id.get(), acquired, length, "module pool exhausted during spawn");
            out_events.push(Event::PoolExhausted {
                pool: PoolKind::Modules,
            });
        }
        out_events.push(Event::WormSpawned {
            worm: id,
            cell,
            length: acquired,
            color,
        });
    }

    fn spawn_fruit(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        if self.grid.check(cell) != CellState::Empty {
            out_events.push(Event::FruitSpawnRejected { cell });
            return;
        }
        let Some(fruit) = self.fruit.enable() else {
            out_events.push(Event::PoolExhausted {
                pool: PoolKind::Fruit,
            });
            out_events.push(Event::FruitSpawnRejected { cell });
            return;
        };
        if let Some(entry) = self.fruit.get_mut(fruit) {
            entry.cell = cell;
        }
        if self.grid.set(cell, Some(Occupant::Fruit(fruit))).is_err() {
            let _ = self.fruit.disable(fruit);
            out_events.push(Event::FruitSpawnRejected { cell });
            return;
        }
        out_events.push(Event::FruitSpawned { fruit, cell });
    }

    fn steer_worm(&mut self, id: WormId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };
        if worm.steer(direction, &self.modules, &self.grid) {
            out_events.push(Event::WormSteered {
                worm: id,
                direction,
            });
        } else {
            debug!(worm = id.get(), ?direction, "steering ignored");
        }
    }

    fn possess_worm(&mut self, id: WormId, player: PlayerId, out_events: &mut Vec<Event>) {
        if !self.worms.is_enabled(id) {
            return;
        }
        for position in 0..self.worms.capacity() {
            let Some(other) = self.worms.enabled_at(position) else {
                continue;
            };
            if other != id {
                self.release_worm(other, Some(player), out_events);
            }
        }
        if let Some(worm) = self.worms.get_mut(id) {
            worm.possess(Some(player));
            out_events.push(Event::WormPossessed { worm: id, player });
        }
    }

    /// Releases `id` if it is possessed by `only_player`, or by anyone when `None`.
    fn release_worm(
        &mut self,
        id: WormId,
        only_player: Option<PlayerId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };
        let Some(current) = worm.possessed_by() else {
            return;
        };
        if only_player.map_or(true, |player| player == current) {
            worm.possess(None);
            out_events.push(Event::WormReleased { worm: id });
        }
    }

    fn disable_worm(&mut self, id: WormId, out_events: &mut Vec<Event>) {
        let Some(worm) = self.worms.get_mut(id) else {
            return;
        };
        worm.teardown(&mut self.modules, &mut self.grid);
        let _ = self.worms.disable(id);
        out_events.push(Event::WormDisabled { worm: id });
    }
}

fn allocate<K, T, F>(kind: PoolKind, capacity: u32, factory: F) -> Result<Pool<K, T>, WorldError>
where
    K: Handle,
    F: FnMut(K) -> T,
{
    Pool::new(capacity as usize, factory).map_err(|source| WorldError::Pool { kind, source })
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => world.tick(out_events),
        Command::SpawnWorm {
            cell,
            length,
            color,
        } => world.spawn_worm(cell, length, color, out_events),
        Command::SpawnFruit { cell } => world.spawn_fruit(cell, out_events),
        Command::SteerWorm { worm, direction } => world.steer_worm(worm, direction, out_events),
        Command::PossessWorm { worm, player } => world.possess_worm(worm, player, out_events),
        Command::ReleaseWorm { worm } => world.release_worm(worm, None, out_events),
        Command::DisableWorm { worm } => world.disable_worm(worm, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use worm_bricks_core::{
        BlockSnapshot, BlockView, CellCoord, OccupancyView, PoolKind, Settings, WormId, WormView,
    };

    use super::{GridMap, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Settings the world was built from.
    #[must_use]
    pub fn settings(world: &World) -> &Settings {
        &world.settings
    }

    /// Provides read-only access to the occupancy map and its transforms.
    #[must_use]
    pub fn grid(world: &World) -> &GridMap {
        &world.grid
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.grid.view()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Captures every enabled worm with its chain, head first.
    #[must_use]
    pub fn worm_view(world: &World) -> WormView {
        WormView::from_snapshots(
            world
                .worms
                .iter_enabled()
                .map(|(_, worm)| worm.snapshot(&world.modules))
                .collect(),
        )
    }

    /// Enabled worms in the order the next tick will move them.
    #[must_use]
    pub fn worm_order(world: &World) -> Vec<WormId> {
        world.worms.iter_enabled().map(|(id, _)| id).collect()
    }

    /// Captures every enabled block.
    #[must_use]
    pub fn block_view(world: &World) -> BlockView {
        BlockView::from_snapshots(
            world
                .blocks
                .iter_enabled()
                .map(|(id, block)| BlockSnapshot {
                    id,
                    region: block.region(),
                    color: block.color(),
                })
                .collect(),
        )
    }

    /// Cells holding uneaten fruit, in fruit pool order.
    #[must_use]
    pub fn fruit_cells(world: &World) -> Vec<CellCoord> {
        world
            .fruit
            .iter_enabled()
            .map(|(_, fruit)| fruit.cell)
            .collect()
    }

    /// Enabled slots and capacity of a pool.
    #[must_use]
    pub fn pool_usage(world: &World, pool: PoolKind) -> (usize, usize) {
        match pool {
            PoolKind::Worms => (world.worms.len(), world.worms.capacity()),
            PoolKind::Modules => (world.modules.len(), world.modules.capacity()),
            PoolKind::Blocks => (world.blocks.len(), world.blocks.capacity()),
            PoolKind::Fruit => (world.fruit.len(), world.fruit.capacity()),
        }
    }

    /// Renders the grid as ASCII for diagnostics.
    #[must_use]
    pub fn render_ascii(world: &World) -> String {
        world.grid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worm_bricks_core::Tuning;

    fn world() -> World {
        let tuning = Tuning {
            worm_capacity: 2,
            module_capacity: 6,
            ..Tuning::default()
        };
        let settings = Settings::with_grid(6, 6, 192.0, 192.0, tuning).expect("settings");
        World::new(settings).expect("world")
    }

    #[test]
    fn spawn_registers_start_cell() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnWorm {
                cell: CellCoord::new(2, 2),
                length: 3,
                color: WormColor::PALETTE[2],
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::WormSpawned {
                worm: WormId::new(0),
                cell: CellCoord::new(2, 2),
                length: 3,
                color: WormColor::PALETTE[2],
            }]
        );
        assert_eq!(
            world.grid.occupant(CellCoord::new(2, 2)),
            Some(Occupant::Worm(WormId::new(0)))
        );
        assert_eq!(world.modules.len(), 3);
    }

    #[test]
    fn spawn_onto_claimed_cell_is_rejected() {
        let mut world = world();
        let mut events = Vec::new();
        let cell = CellCoord::new(1, 1);
        apply(&mut world, Command::SpawnFruit { cell }, &mut events);
        events.clear();

        apply(
            &mut world,
            Command::SpawnWorm {
                cell,
                length: 2,
                color: WormColor::PALETTE[0],
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::WormSpawnRejected {
                cell,
                reason: SpawnRejection::CellOccupied,
            }]
        );
    }

    #[test]
    fn worm_pool_exhaustion_is_reported() {
        let mut world = world();
        let mut events = Vec::new();
        for column in 0..3 {
            apply(
                &mut world,
                Command::SpawnWorm {
                    cell: CellCoord::new(column * 2, 0),
                    length: 1,
                    color: WormColor::PALETTE[0],
                },
                &mut events,
            );
        }

        assert!(events.contains(&Event::PoolExhausted {
            pool: PoolKind::Worms
        }));
        assert_eq!(world.worms.len(), 2);
    }

    #[test]
    fn possession_moves_between_worms() {
        let mut world = world();
        let mut events = Vec::new();
        for column in [0, 4] {
            apply(
                &mut world,
                Command::SpawnWorm {
                    cell: CellCoord::new(column, 3),
                    length: 1,
                    color: WormColor::PALETTE[0],
                },
                &mut events,
            );
        }
        let player = PlayerId::new(1);
        apply(
            &mut world,
            Command::PossessWorm {
                worm: WormId::new(0),
                player,
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut world,
            Command::PossessWorm {
                worm: WormId::new(1),
                player,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::WormReleased {
                    worm: WormId::new(0)
                },
                Event::WormPossessed {
                    worm: WormId::new(1),
                    player
                },
            ]
        );
    }

    #[test]
    fn disable_returns_every_module() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnWorm {
                cell: CellCoord::new(3, 3),
                length: 4,
                color: WormColor::PALETTE[1],
            },
            &mut events,
        );
        apply(&mut world, Command::Tick, &mut events);
        apply(
            &mut world,
            Command::DisableWorm {
                worm: WormId::new(0),
            },
            &mut events,
        );

        assert!(world.modules.is_empty());
        assert!(world.worms.is_empty());
        assert_eq!(world.grid.claimed_by(Occupant::Worm(WormId::new(0))), 0);
    }
}
