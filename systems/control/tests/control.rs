use worm_bricks_core::{
    CellCoord, Command, Direction, Event, PlayerId, Settings, Tuning, WormColor, WormId,
};
use worm_bricks_system_control::{Control, PlayerInput};
use worm_bricks_world::{self as world, query, World};

const PLAYER: PlayerId = PlayerId::new(1);

fn populated_world() -> World {
    let settings =
        Settings::with_grid(8, 8, 256.0, 256.0, Tuning::default()).expect("settings");
    let mut world = World::new(settings).expect("world");
    let mut events = Vec::new();
    for cell in [CellCoord::new(1, 1), CellCoord::new(6, 6)] {
        world::apply(
            &mut world,
            Command::SpawnWorm {
                cell,
                length: 1,
                color: WormColor::PALETTE[0],
            },
            &mut events,
        );
    }
    world
}

fn drive(world: &mut World, control: &mut Control, inputs: &[PlayerInput]) -> Vec<Event> {
    let mut commands = Vec::new();
    control.handle(inputs, &query::worm_view(world), &mut commands);
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

#[test]
fn possess_steer_and_release_round_trip() {
    let mut world = populated_world();
    let mut control = Control::new();

    let events = drive(
        &mut world,
        &mut control,
        &[PlayerInput::Possess {
            player: PLAYER,
            near: CellCoord::new(5, 7),
        }],
    );
    assert_eq!(
        events,
        vec![Event::WormPossessed {
            worm: WormId::new(1),
            player: PLAYER,
        }]
    );

    let current = query::worm_view(&world)
        .possessed_by(PLAYER)
        .map(|worm| worm.direction)
        .expect("possessed worm");
    let turn = Direction::ALL
        .into_iter()
        .find(|direction| *direction != current)
        .expect("another heading");
    let events = drive(
        &mut world,
        &mut control,
        &[PlayerInput::Steer {
            player: PLAYER,
            direction: turn,
        }],
    );
    assert_eq!(
        events,
        vec![Event::WormSteered {
            worm: WormId::new(1),
            direction: turn,
        }]
    );

    let events = drive(
        &mut world,
        &mut control,
        &[PlayerInput::Release { player: PLAYER }],
    );
    assert_eq!(
        events,
        vec![Event::WormReleased {
            worm: WormId::new(1)
        }]
    );
    assert!(query::worm_view(&world).possessed_by(PLAYER).is_none());
}

#[test]
fn steering_without_possession_emits_nothing() {
    let world = populated_world();
    let mut control = Control::new();
    let mut commands = Vec::new();

    control.handle(
        &[PlayerInput::Steer {
            player: PLAYER,
            direction: Direction::North,
        }],
        &query::worm_view(&world),
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn second_player_cannot_take_held_worm() {
    let mut world = populated_world();
    let mut control = Control::new();
    let other = PlayerId::new(2);

    let _ = drive(
        &mut world,
        &mut control,
        &[PlayerInput::Possess {
            player: PLAYER,
            near: CellCoord::new(1, 1),
        }],
    );
    let events = drive(
        &mut world,
        &mut control,
        &[PlayerInput::Possess {
            player: other,
            near: CellCoord::new(1, 1),
        }],
    );

    assert_eq!(
        events,
        vec![Event::WormPossessed {
            worm: WormId::new(1),
            player: other,
        }]
    );
}
