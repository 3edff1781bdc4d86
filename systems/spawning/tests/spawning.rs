use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    hash::{Hash, Hasher},
};

use worm_bricks_core::{CellCoord, Command, Event, Settings, Tuning, WormColor, WormId};
use worm_bricks_system_spawning::{Config, Spawning};
use worm_bricks_world::{self as world, query, World};

fn world_with(columns: u32, rows: u32) -> World {
    let tuning = Tuning::default();
    let settings = Settings::with_grid(columns, rows, 256.0, 256.0, tuning).expect("settings");
    World::new(settings).expect("world")
}

fn run(world: &World, spawning: &mut Spawning, events: &[Event]) -> Vec<Command> {
    let mut commands = Vec::new();
    let worms = query::worm_view(world);
    spawning.handle(events, &worms, query::occupancy_view(world), &mut commands);
    commands
}

#[test]
fn tops_up_population_with_distinct_cells_and_rotating_colors() {
    let mut world = world_with(8, 8);
    let mut spawning = Spawning::new(Config::new(3, 2, 0, 0x1234_5678));

    let commands = run(&world, &mut spawning, &[]);
    assert_eq!(commands.len(), 3, "expected one spawn per missing worm");

    let mut cells = HashSet::new();
    for (command, expected_color) in commands.iter().zip(WormColor::PALETTE.iter()) {
        match command {
            Command::SpawnWorm {
                cell,
                length,
                color,
            } => {
                assert!(cells.insert(*cell), "cell {cell:?} targeted twice");
                assert_eq!(*length, 2);
                assert_eq!(color, expected_color);
            }
            other => panic!("unexpected command emitted: {other:?}"),
        }
    }

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(query::worm_view(&world).len(), 3);
    assert!(
        run(&world, &mut spawning, &[]).is_empty(),
        "full population needs no spawns"
    );
}

#[test]
fn never_targets_claimed_cells() {
    let mut world = world_with(2, 1);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnWorm {
            cell: CellCoord::new(0, 0),
            length: 1,
            color: WormColor::PALETTE[0],
        },
        &mut events,
    );
    let mut spawning = Spawning::new(Config::new(4, 1, 0, 9));

    let commands = run(&world, &mut spawning, &[]);

    assert_eq!(
        commands,
        vec![Command::SpawnWorm {
            cell: CellCoord::new(1, 0),
            length: 1,
            color: WormColor::PALETTE[0],
        }]
    );
}

#[test]
fn fruit_follows_tick_cadence() {
    let world = world_with(4, 4);
    let mut spawning = Spawning::new(Config::new(0, 1, 2, 3));

    let tick = [Event::TickAdvanced { tick: 1 }];
    assert!(run(&world, &mut spawning, &tick).is_empty());
    let commands = run(&world, &mut spawning, &tick);
    assert!(matches!(commands.as_slice(), [Command::SpawnFruit { .. }]));

    let unrelated = [Event::WormDisabled {
        worm: WormId::new(0),
    }];
    assert!(run(&world, &mut spawning, &unrelated).is_empty());
}

#[test]
fn deterministic_replay_produces_identical_sequence() {
    let first = replay();
    let second = replay();
    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

fn replay() -> ReplayOutcome {
    let mut world = world_with(10, 8);
    let mut spawning = Spawning::new(Config::new(5, 3, 4, 0x4d59_5df4_d0f3_3173));
    let mut spawns = Vec::new();
    let mut events = Vec::new();

    for _ in 0..60 {
        for command in run(&world, &mut spawning, &events) {
            spawns.push(command.clone());
            let mut generated = Vec::new();
            world::apply(&mut world, command, &mut generated);
        }
        events.clear();
        world::apply(&mut world, Command::Tick, &mut events);
    }

    ReplayOutcome {
        spawns: spawns.iter().map(SpawnRecord::from).collect(),
        grid: query::render_ascii(&world),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    spawns: Vec<SpawnRecord>,
    grid: String,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SpawnRecord {
    Worm { cell: CellCoord, color: WormColor },
    Fruit { cell: CellCoord },
    Other,
}

impl From<&Command> for SpawnRecord {
    fn from(command: &Command) -> Self {
        match command {
            Command::SpawnWorm { cell, color, .. } => Self::Worm {
                cell: *cell,
                color: *color,
            },
            Command::SpawnFruit { cell } => Self::Fruit { cell: *cell },
            _ => Self::Other,
        }
    }
}
