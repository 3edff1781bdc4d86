#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Worm bricks session.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use worm_bricks_core::{CellCoord, Command, Direction, Event, PlayerId, PoolKind, Settings};
use worm_bricks_rendering::{Color, Drawable, Presentation};
use worm_bricks_system_control::{Control, PlayerInput};
use worm_bricks_system_spawning::{Config as SpawningConfig, Spawning};
use worm_bricks_world::{self as world, query, GridMap, World};

use crate::config::Overrides;

/// Simulated seconds per tick handed to the presentation phase.
const TICK_SECONDS: f32 = 0.125;
/// Fraction of the remaining distance sprites cover per second.
const EASING_RATE: f32 = 12.0;
/// Player driven by the built-in pilot.
const PILOT: PlayerId = PlayerId::new(1);

#[derive(Parser, Debug)]
#[command(name = "worm-bricks", version, about = "Run a headless Worm bricks session")]
struct Cli {
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u64,
    /// Seed for every random source, overriding the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file with tuning values; omitted keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Window width in pixels the grid is fitted into.
    #[arg(long, default_value_t = 800.0)]
    width: f32,
    /// Window height in pixels the grid is fitted into.
    #[arg(long, default_value_t = 600.0)]
    height: f32,
    /// Print the grid every N ticks; zero prints only the final state.
    #[arg(long, default_value_t = 0)]
    print_every: u64,
    /// Number of worms to keep alive, overriding the config file.
    #[arg(long)]
    worms: Option<u32>,
    /// Cell size in pixels, overriding the config file.
    #[arg(long)]
    cell_size: Option<f32>,
    /// Let a built-in pilot possess and steer one worm.
    #[arg(long)]
    pilot: bool,
    /// Print the effective tuning as TOML and exit.
    #[arg(long)]
    dump_config: bool,
}

/// Headless stand-in for a graphics node. The text frame is monochrome.
#[derive(Clone, Copy, Debug, Default)]
struct Sprite {
    visible: bool,
    position: Vec2,
}

impl Drawable for Sprite {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_color(&mut self, _color: Color) {}

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }
}

/// Entry point for the Worm bricks command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let tuning = config::load_tuning(cli.config.as_deref())?;
    let tuning = Overrides {
        seed: cli.seed,
        worm_count: cli.worms,
        cell_size: cli.cell_size,
    }
    .apply(tuning);
    if cli.dump_config {
        print!("{}", config::render_tuning(&tuning)?);
        return Ok(());
    }

    let settings = Settings::from_window(cli.width, cli.height, tuning)
        .context("window and tuning do not produce a playable grid")?;
    let module_capacity = settings.tuning().module_capacity as usize;
    let mut session = Session::new(settings, cli.pilot)?;
    println!("{}", query::welcome_banner(&session.world));
    info!(
        columns = query::grid(&session.world).columns(),
        rows = query::grid(&session.world).rows(),
        seed = query::settings(&session.world).tuning().seed,
        "session started"
    );

    let mut presentation = Presentation::new(module_capacity, EASING_RATE)
        .context("failed to set up presentation")?;
    let mut sprites = vec![Sprite::default(); module_capacity];

    for _ in 0..cli.ticks {
        session.step();
        presentation.update(
            &query::worm_view(&session.world),
            query::grid(&session.world),
            TICK_SECONDS,
            &mut sprites,
        );

        let tick = query::tick_index(&session.world);
        if cli.print_every > 0 && tick % cli.print_every == 0 {
            println!("tick {tick}");
            print!("{}", query::render_ascii(&session.world));
            println!("sprites");
            print!("{}", render_sprites(&sprites, query::grid(&session.world)));
        }
    }

    print_summary(&session.world, &presentation);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Two-phase loop state: systems react to the previous tick's events, then
/// the world advances.
struct Session {
    world: World,
    spawning: Spawning,
    control: Control,
    pilot: bool,
    events: Vec<Event>,
    commands: Vec<Command>,
    inputs: Vec<PlayerInput>,
}

impl Session {
    fn new(settings: Settings, pilot: bool) -> Result<Self> {
        let spawning = Spawning::new(SpawningConfig::from_tuning(settings.tuning()));
        let world = World::new(settings).context("failed to allocate world")?;
        Ok(Self {
            world,
            spawning,
            control: Control::new(),
            pilot,
            events: Vec::new(),
            commands: Vec::new(),
            inputs: Vec::new(),
        })
    }

    fn step(&mut self) {
        self.commands.clear();
        let worms = query::worm_view(&self.world);
        self.spawning.handle(
            &self.events,
            &worms,
            query::occupancy_view(&self.world),
            &mut self.commands,
        );

        self.inputs.clear();
        if self.pilot {
            self.inputs.extend(pilot_input(&self.world));
        }
        self.control.handle(&self.inputs, &worms, &mut self.commands);

        self.events.clear();
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
        world::apply(&mut self.world, Command::Tick, &mut self.events);
        debug!(events = self.events.len(), "tick applied");
    }
}

/// Keeps one worm possessed and turns it clockwise before it runs into
/// something.
fn pilot_input(world: &World) -> Option<PlayerInput> {
    let worms = query::worm_view(world);
    let Some(worm) = worms.possessed_by(PILOT) else {
        let (columns, rows) = query::occupancy_view(world).dimensions();
        return Some(PlayerInput::Possess {
            player: PILOT,
            near: CellCoord::new(columns / 2, rows / 2),
        });
    };
    let head = worm.head()?;
    let occupancy = query::occupancy_view(world);
    let ahead = |direction: Direction| {
        head.neighbor(direction)
            .map_or(false, |cell| occupancy.state(cell).is_passable())
    };
    if ahead(worm.direction) {
        return None;
    }

    let start = Direction::ALL
        .iter()
        .position(|direction| *direction == worm.direction)
        .unwrap_or(0);
    (1..Direction::ALL.len())
        .map(|offset| Direction::ALL[(start + offset) % Direction::ALL.len()])
        .filter(|direction| *direction != worm.direction.opposite())
        .find(|direction| ahead(*direction))
        .map(|direction| PlayerInput::Steer {
            player: PILOT,
            direction,
        })
}

/// Draws the eased sprite positions as text, one `#` per cell holding at
/// least one visible sprite.
fn render_sprites(sprites: &[Sprite], grid: &GridMap) -> String {
    let columns = grid.columns() as usize;
    let rows = grid.rows() as usize;
    let mut frame = vec![b'.'; columns * rows];
    for sprite in sprites.iter().filter(|sprite| sprite.visible) {
        if let Some(cell) = grid.to_cell(sprite.position) {
            frame[cell.row() as usize * columns + cell.column() as usize] = b'#';
        }
    }

    let mut text = String::with_capacity((columns + 1) * rows);
    for row in frame.chunks(columns) {
        text.extend(row.iter().map(|&glyph| char::from(glyph)));
        text.push('\n');
    }
    text
}

fn print_summary(world: &World, presentation: &Presentation) {
    let worms = query::worm_view(world);
    let blocks = query::block_view(world);
    let (modules, module_capacity) = query::pool_usage(world, PoolKind::Modules);
    println!("{}", query::render_ascii(world));
    println!(
        "ticks: {}  worms: {}  segments: {modules}/{module_capacity}  blocks: {} ({} cells)  fruit: {}  sprites: {}",
        query::tick_index(world),
        worms.len(),
        blocks.iter().count(),
        blocks.covered_cells(),
        query::fruit_cells(world).len(),
        presentation.visible_count(),
    );
    if let Some(worm) = worms.possessed_by(PILOT) {
        println!(
            "pilot holds worm {} with {} segments",
            worm.id.get(),
            worm.length
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_frame_marks_nearest_cells() {
        let grid = GridMap::new(3, 2, 32.0, Vec2::new(96.0, 64.0));
        let eased = grid.to_world(CellCoord::new(1, 0)) + Vec2::new(10.0, 4.0);
        let sprites = [
            Sprite {
                visible: true,
                position: eased,
            },
            Sprite {
                visible: false,
                position: grid.to_world(CellCoord::new(0, 1)),
            },
            Sprite {
                visible: true,
                position: grid.to_world(CellCoord::new(2, 1)),
            },
        ];

        assert_eq!(render_sprites(&sprites, &grid), ".#.\n..#\n");
    }
}
