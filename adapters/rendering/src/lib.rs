#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation phase for Worm bricks adapters.
//!
//! The simulation only ever moves logical cell targets. [`Presentation`]
//! runs after each simulation step, eases one visual per module slot toward
//! the world-space centre of its target cell and forwards the result to an
//! adapter-provided [`Drawable`]. Nothing here mutates the world.

use std::{error::Error, fmt};

use glam::Vec2;
use worm_bricks_core::{ModuleId, WormColor, WormId, WormView};
use worm_bricks_world::GridMap;

/// Amount possessed worms are lightened by so players can find them.
const POSSESSED_HIGHLIGHT: f32 = 0.35;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let lift = |channel: f32| channel + (1.0 - channel) * amount;

        Self {
            red: lift(self.red),
            green: lift(self.green),
            blue: lift(self.blue),
            alpha: self.alpha,
        }
    }
}

impl From<WormColor> for Color {
    fn from(color: WormColor) -> Self {
        Self::from_rgb_u8(color.red(), color.green(), color.blue())
    }
}

/// External visual attached to a module slot.
///
/// Implementations forward the calls to whatever graphics layer the adapter
/// uses. The presentation only calls `set_visible` and `set_color` when the
/// value changes; `set_position` is called for every visible slot on every
/// update.
pub trait Drawable {
    /// Shows or hides the visual.
    fn set_visible(&mut self, visible: bool);

    /// Changes the fill color.
    fn set_color(&mut self, color: Color);

    /// Moves the visual's centre to a world-space position.
    fn set_position(&mut self, position: Vec2);
}

/// Errors that can occur when constructing the presentation.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Easing rates must be positive and finite.
    InvalidRate {
        /// Provided rate that failed validation.
        rate: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRate { rate } => {
                write!(f, "easing rate must be positive and finite (received {rate})")
            }
        }
    }
}

impl Error for RenderingError {}

#[derive(Clone, Copy, Debug)]
struct Visual {
    visible: bool,
    owner: Option<WormId>,
    position: Vec2,
    color: Color,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            visible: false,
            owner: None,
            position: Vec2::ZERO,
            color: Color::from_rgb_u8(0, 0, 0),
        }
    }
}

/// Interpolated visual state for every module slot.
#[derive(Clone, Debug)]
pub struct Presentation {
    rate: f32,
    visuals: Vec<Visual>,
    seen: Vec<bool>,
}

impl Presentation {
    /// Creates hidden visuals for `module_capacity` slots.
    ///
    /// `rate` is the fraction of the remaining distance covered per second;
    /// a single update never overshoots the target.
    pub fn new(module_capacity: usize, rate: f32) -> Result<Self, RenderingError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RenderingError::InvalidRate { rate });
        }
        Ok(Self {
            rate,
            visuals: vec![Visual::default(); module_capacity],
            seen: vec![false; module_capacity],
        })
    }

    /// Eases every live segment toward its target and pushes the result to
    /// `drawables`, indexed by module slot. Slots whose worm went away are
    /// hidden, and a slot that changed worms snaps to its new target.
    pub fn update<D: Drawable>(
        &mut self,
        worms: &WormView,
        grid: &GridMap,
        dt: f32,
        drawables: &mut [D],
    ) {
        let t = (self.rate * dt.max(0.0)).min(1.0);
        self.seen.fill(false);

        for worm in worms.iter() {
            let mut color = Color::from(worm.color);
            if worm.possessed_by.is_some() {
                color = color.lighten(POSSESSED_HIGHLIGHT);
            }

            for segment in &worm.segments {
                let index = segment.module.get() as usize;
                let Some(visual) = self.visuals.get_mut(index) else {
                    debug_assert!(false, "module slot {index} outside presentation");
                    continue;
                };
                self.seen[index] = true;
                let target = grid.to_world(segment.target);
                let drawable = drawables.get_mut(index);

                if visual.visible && visual.owner == Some(worm.id) {
                    visual.position = visual.position.lerp(target, t);
                } else {
                    visual.visible = true;
                    visual.owner = Some(worm.id);
                    visual.position = target;
                    visual.color = color;
                    if let Some(drawable) = drawable {
                        drawable.set_visible(true);
                        drawable.set_color(color);
                        drawable.set_position(target);
                    }
                    continue;
                }

                if let Some(drawable) = drawable {
                    if visual.color != color {
                        drawable.set_color(color);
                    }
                    drawable.set_position(visual.position);
                }
                visual.color = color;
            }
        }

        for (index, visual) in self.visuals.iter_mut().enumerate() {
            if visual.visible && !self.seen[index] {
                visual.visible = false;
                visual.owner = None;
                if let Some(drawable) = drawables.get_mut(index) {
                    drawable.set_visible(false);
                }
            }
        }
    }

    /// Current eased position of a visible module.
    #[must_use]
    pub fn position(&self, module: ModuleId) -> Option<Vec2> {
        self.visuals
            .get(module.get() as usize)
            .filter(|visual| visual.visible)
            .map(|visual| visual.position)
    }

    /// Number of visuals currently shown.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visuals.iter().filter(|visual| visual.visible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worm_bricks_core::{CellCoord, Command, Direction, Event, PlayerId, Settings, Tuning};
    use worm_bricks_world::{self as world, query, World};

    #[derive(Clone, Debug, Default)]
    struct Recording {
        visible: bool,
        color: Option<Color>,
        position: Option<Vec2>,
        color_changes: u32,
    }

    impl Drawable for Recording {
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }

        fn set_color(&mut self, color: Color) {
            self.color = Some(color);
            self.color_changes += 1;
        }

        fn set_position(&mut self, position: Vec2) {
            self.position = Some(position);
        }
    }

    fn world_with_worm() -> World {
        let tuning = Tuning {
            module_capacity: 8,
            ..Tuning::default()
        };
        let settings = Settings::with_grid(8, 8, 256.0, 256.0, tuning).expect("settings");
        let mut world = World::new(settings).expect("world");
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SpawnWorm {
                cell: CellCoord::new(3, 3),
                length: 1,
                color: WormColor::PALETTE[1],
            },
            &mut events,
        );
        world
    }

    fn present(
        presentation: &mut Presentation,
        world: &World,
        dt: f32,
        drawables: &mut [Recording],
    ) {
        presentation.update(&query::worm_view(world), query::grid(world), dt, drawables);
    }

    #[test]
    fn invalid_rates_are_rejected() {
        assert_eq!(
            Presentation::new(4, 0.0).unwrap_err(),
            RenderingError::InvalidRate { rate: 0.0 }
        );
        assert!(Presentation::new(4, f32::NAN).is_err());
    }

    #[test]
    fn worm_color_converts_to_unit_channels() {
        let color = Color::from(WormColor::from_rgb(255, 0, 51));
        assert_eq!(
            color,
            Color {
                red: 1.0,
                green: 0.0,
                blue: 0.2,
                alpha: 1.0,
            }
        );
        let white = color.lighten(1.0);
        assert_eq!((white.red, white.green), (1.0, 1.0));
    }

    #[test]
    fn new_segment_snaps_to_target_and_shows() {
        let world = world_with_worm();
        let mut presentation = Presentation::new(8, 10.0).expect("presentation");
        let mut drawables = vec![Recording::default(); 8];

        present(&mut presentation, &world, 0.016, &mut drawables);

        let expected = query::grid(&world).to_world(CellCoord::new(3, 3));
        assert!(drawables[0].visible);
        assert_eq!(drawables[0].position, Some(expected));
        assert_eq!(drawables[0].color, Some(Color::from(WormColor::PALETTE[1])));
        assert_eq!(presentation.visible_count(), 1);
    }

    #[test]
    fn moving_segment_eases_toward_new_target() {
        let mut world = world_with_worm();
        let mut presentation = Presentation::new(8, 2.0).expect("presentation");
        let mut drawables = vec![Recording::default(); 8];
        present(&mut presentation, &world, 0.0, &mut drawables);

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SteerWorm {
                worm: WormId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );
        world::apply(&mut world, Command::Tick, &mut events);
        present(&mut presentation, &world, 0.25, &mut drawables);

        let grid = query::grid(&world);
        let from = grid.to_world(CellCoord::new(3, 3));
        let to = grid.to_world(CellCoord::new(4, 3));
        let halfway = from.lerp(to, 0.5);
        assert_eq!(presentation.position(ModuleId::new(0)), Some(halfway));
        assert_eq!(drawables[0].position, Some(halfway));

        present(&mut presentation, &world, 1.0, &mut drawables);
        assert_eq!(drawables[0].position, Some(to));
        assert_eq!(drawables[0].color_changes, 1);
    }

    #[test]
    fn possession_lightens_and_disable_hides() {
        let mut world = world_with_worm();
        let mut presentation = Presentation::new(8, 10.0).expect("presentation");
        let mut drawables = vec![Recording::default(); 8];
        present(&mut presentation, &world, 0.0, &mut drawables);

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::PossessWorm {
                worm: WormId::new(0),
                player: PlayerId::new(1),
            },
            &mut events,
        );
        present(&mut presentation, &world, 0.0, &mut drawables);
        assert_eq!(
            drawables[0].color,
            Some(Color::from(WormColor::PALETTE[1]).lighten(POSSESSED_HIGHLIGHT))
        );

        world::apply(
            &mut world,
            Command::DisableWorm {
                worm: WormId::new(0),
            },
            &mut events,
        );
        present(&mut presentation, &world, 0.0, &mut drawables);
        assert!(!drawables[0].visible);
        assert_eq!(presentation.visible_count(), 0);
        assert_eq!(presentation.position(ModuleId::new(0)), None);
    }

    #[test]
    fn reused_module_snaps_to_new_owner() {
        let tuning = Tuning {
            module_capacity: 1,
            ..Tuning::default()
        };
        let settings = Settings::with_grid(8, 8, 256.0, 256.0, tuning).expect("settings");
        let mut world = World::new(settings).expect("world");
        let mut presentation = Presentation::new(1, 2.0).expect("presentation");
        let mut drawables = vec![Recording::default(); 1];
        let mut events = Vec::new();
        let spawn = |cell| Command::SpawnWorm {
            cell,
            length: 1,
            color: WormColor::PALETTE[1],
        };

        world::apply(&mut world, spawn(CellCoord::new(1, 1)), &mut events);
        present(&mut presentation, &world, 0.0, &mut drawables);

        events.clear();
        world::apply(
            &mut world,
            Command::DisableWorm {
                worm: WormId::new(0),
            },
            &mut events,
        );
        world::apply(&mut world, spawn(CellCoord::new(6, 6)), &mut events);
        assert!(events.contains(&Event::WormSpawned {
            worm: WormId::new(1),
            cell: CellCoord::new(6, 6),
            length: 1,
            color: WormColor::PALETTE[1],
        }));
        present(&mut presentation, &world, 0.25, &mut drawables);

        let target = query::grid(&world).to_world(CellCoord::new(6, 6));
        assert_eq!(presentation.position(ModuleId::new(0)), Some(target));
        assert_eq!(drawables[0].position, Some(target));
        assert!(drawables[0].visible);
    }
}
