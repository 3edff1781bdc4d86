#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure control system translating player input into worm commands.

use tracing::debug;
use worm_bricks_core::{CellCoord, Command, Direction, PlayerId, WormId, WormView};

/// Input distilled by an adapter from whatever device a player is using.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerInput {
    /// Take over the free worm whose head is closest to `near`.
    Possess {
        /// Player requesting control.
        player: PlayerId,
        /// Cell the player is pointing at.
        near: CellCoord,
    },
    /// Let go of the worm the player currently holds.
    Release {
        /// Player giving up control.
        player: PlayerId,
    },
    /// Ask the held worm to turn.
    Steer {
        /// Player steering.
        player: PlayerId,
        /// Requested heading.
        direction: Direction,
    },
}

/// Control system that maps player input onto possession and steering commands.
#[derive(Debug, Default, Clone)]
pub struct Control;

impl Control {
    /// Creates a new control system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Consumes player input and the current worm view to emit commands.
    ///
    /// Steering only ever targets the worm the player possesses and is
    /// skipped when the worm already faces that way. The world still
    /// validates every direction before accepting it.
    pub fn handle(&mut self, inputs: &[PlayerInput], worms: &WormView, out: &mut Vec<Command>) {
        for input in inputs {
            match *input {
                PlayerInput::Possess { player, near } => {
                    if let Some(worm) = closest_free_worm(worms, player, near) {
                        out.push(Command::PossessWorm { worm, player });
                    } else {
                        debug!(player = player.get(), "no free worm to possess");
                    }
                }
                PlayerInput::Release { player } => {
                    if let Some(worm) = worms.possessed_by(player) {
                        out.push(Command::ReleaseWorm { worm: worm.id });
                    }
                }
                PlayerInput::Steer { player, direction } => {
                    let Some(worm) = worms.possessed_by(player) else {
                        continue;
                    };
                    if worm.direction != direction {
                        out.push(Command::SteerWorm {
                            worm: worm.id,
                            direction,
                        });
                    }
                }
            }
        }
    }
}

/// Worm nearest to `near` that nobody else holds; ties go to the lower id.
fn closest_free_worm(worms: &WormView, player: PlayerId, near: CellCoord) -> Option<WormId> {
    worms
        .iter()
        .filter(|worm| worm.possessed_by.map_or(true, |holder| holder == player))
        .filter_map(|worm| {
            worm.head()
                .map(|head| (head.manhattan_distance(near), worm.id))
        })
        .min()
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use worm_bricks_core::{ModuleId, SegmentSnapshot, WormColor, WormSnapshot, WormState};

    fn snapshot(id: u32, head: CellCoord, possessed_by: Option<PlayerId>) -> WormSnapshot {
        WormSnapshot {
            id: WormId::new(id),
            state: WormState::Moving,
            color: WormColor::PALETTE[0],
            direction: Direction::East,
            length: 1,
            length_cap: 1,
            possessed_by,
            segments: vec![SegmentSnapshot {
                module: ModuleId::new(id),
                target: head,
            }],
        }
    }

    #[test]
    fn possess_picks_nearest_unheld_worm() {
        let worms = WormView::from_snapshots(vec![
            snapshot(0, CellCoord::new(9, 9), None),
            snapshot(1, CellCoord::new(2, 2), Some(PlayerId::new(5))),
            snapshot(2, CellCoord::new(4, 3), None),
        ]);
        assert_eq!(
            closest_free_worm(&worms, PlayerId::new(1), CellCoord::new(2, 2)),
            Some(WormId::new(2))
        );
        assert_eq!(
            closest_free_worm(&worms, PlayerId::new(5), CellCoord::new(2, 2)),
            Some(WormId::new(1))
        );
    }

    #[test]
    fn ties_prefer_lower_id() {
        let worms = WormView::from_snapshots(vec![
            snapshot(3, CellCoord::new(1, 0), None),
            snapshot(1, CellCoord::new(0, 1), None),
        ]);
        assert_eq!(
            closest_free_worm(&worms, PlayerId::new(0), CellCoord::new(0, 0)),
            Some(WormId::new(1))
        );
    }
}
