#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic population system that keeps worms alive and drops fruit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use worm_bricks_core::{CellCoord, Command, Event, OccupancyView, Tuning, WormColor, WormView};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    worm_count: u32,
    initial_length: u32,
    fruit_interval: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// A `fruit_interval` of zero disables fruit drops.
    #[must_use]
    pub const fn new(worm_count: u32, initial_length: u32, fruit_interval: u32, rng_seed: u64) -> Self {
        Self {
            worm_count,
            initial_length,
            fruit_interval,
            rng_seed,
        }
    }

    /// Derives the configuration from session tuning.
    #[must_use]
    pub const fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(
            tuning.worm_count,
            tuning.initial_length,
            tuning.fruit_interval,
            tuning.seed,
        )
    }
}

/// Pure system that tops up the worm population and schedules fruit.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    ticks_since_fruit: u32,
    rng: ChaCha8Rng,
    color_index: usize,
    empty: Vec<CellCoord>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ticks_since_fruit: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            color_index: 0,
            empty: Vec::new(),
        }
    }

    /// Consumes events and immutable views to emit spawn commands.
    ///
    /// Worms are requested whenever fewer than the configured count are
    /// alive; fruit is requested once per elapsed fruit interval. Every
    /// command in a batch targets a distinct empty cell.
    pub fn handle(
        &mut self,
        events: &[Event],
        worms: &WormView,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        let ticks = events
            .iter()
            .filter(|event| matches!(event, Event::TickAdvanced { .. }))
            .count() as u32;
        let fruit = self.resolve_fruit_drops(ticks);
        let deficit = self
            .config
            .worm_count
            .saturating_sub(u32::try_from(worms.len()).unwrap_or(u32::MAX));
        if deficit == 0 && fruit == 0 {
            return;
        }

        self.empty.clear();
        occupancy.empty_cells(&mut self.empty);

        for _ in 0..deficit {
            let Some(cell) = self.take_cell() else {
                debug!(deficit, "no empty cell left for worm spawn");
                return;
            };
            let color = self.next_color();
            out.push(Command::SpawnWorm {
                cell,
                length: self.config.initial_length,
                color,
            });
        }

        for _ in 0..fruit {
            let Some(cell) = self.take_cell() else {
                debug!("no empty cell left for fruit");
                return;
            };
            out.push(Command::SpawnFruit { cell });
        }
    }

    fn resolve_fruit_drops(&mut self, ticks: u32) -> u32 {
        if self.config.fruit_interval == 0 {
            return 0;
        }

        self.ticks_since_fruit = self.ticks_since_fruit.saturating_add(ticks);
        let drops = self.ticks_since_fruit / self.config.fruit_interval;
        self.ticks_since_fruit %= self.config.fruit_interval;
        drops
    }

    fn take_cell(&mut self) -> Option<CellCoord> {
        if self.empty.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.empty.len());
        Some(self.empty.swap_remove(index))
    }

    fn next_color(&mut self) -> WormColor {
        let color = WormColor::PALETTE[self.color_index % WormColor::PALETTE.len()];
        self.color_index = (self.color_index + 1) % WormColor::PALETTE.len();
        color
    }
}
