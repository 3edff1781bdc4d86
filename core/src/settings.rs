//! Read-only configuration computed once at startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable constants that shape a Worm bricks session.
///
/// Every field falls back to [`Tuning::default`] when omitted from a
/// configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Side length of a single grid cell in pixels.
    pub cell_size: f32,
    /// Pixels kept free between the window edge and the playing field.
    pub margin: f32,
    /// Number of worms the spawning system keeps alive.
    pub worm_count: u32,
    /// Segments a freshly spawned worm starts with.
    pub initial_length: u32,
    /// Upper bound on any worm's length.
    pub max_length: u32,
    /// Ticks between fruit drops. Zero disables fruit.
    pub fruit_interval: u32,
    /// Capacity of the worm pool.
    pub worm_capacity: u32,
    /// Capacity of the shared module pool.
    pub module_capacity: u32,
    /// Capacity of the block pool.
    pub block_capacity: u32,
    /// Capacity of the fruit pool.
    pub fruit_capacity: u32,
    /// Seed for every random source in the simulation.
    pub seed: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cell_size: 32.0,
            margin: 16.0,
            worm_count: 8,
            initial_length: 3,
            max_length: 12,
            fruit_interval: 10,
            worm_capacity: 16,
            module_capacity: 256,
            block_capacity: 256,
            fruit_capacity: 32,
            seed: 0x5eed_b41c_2a17_9e03,
        }
    }
}

/// Reasons a configuration cannot produce a playable field.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SettingsError {
    /// Cells must have a positive, finite size.
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f32),
    /// The window leaves no room for a single cell after margins.
    #[error("window {width}x{height} is too small for a {cell_size}px grid")]
    WindowTooSmall {
        /// Requested window width.
        width: f32,
        /// Requested window height.
        height: f32,
        /// Configured cell size.
        cell_size: f32,
    },
    /// A pool was configured without any slots.
    #[error("{0} capacity must be at least one")]
    ZeroCapacity(&'static str),
    /// Worms must start with at least one segment and no more than the cap.
    #[error("initial length {initial} must be within 1..={max}")]
    InvalidInitialLength {
        /// Configured initial length.
        initial: u32,
        /// Configured maximum length.
        max: u32,
    },
}

/// Geometry and tuning handed to the world's constructors.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    columns: u32,
    rows: u32,
    viewport_width: f32,
    viewport_height: f32,
    tuning: Tuning,
}

impl Settings {
    /// Derives grid dimensions that fit inside the window after margins.
    pub fn from_window(
        window_width: f32,
        window_height: f32,
        tuning: Tuning,
    ) -> Result<Self, SettingsError> {
        let cell_size = tuning.cell_size;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SettingsError::InvalidCellSize(cell_size));
        }

        let usable_width = window_width - 2.0 * tuning.margin;
        let usable_height = window_height - 2.0 * tuning.margin;
        let columns = (usable_width / cell_size).floor();
        let rows = (usable_height / cell_size).floor();
        if !(columns >= 1.0 && rows >= 1.0) {
            return Err(SettingsError::WindowTooSmall {
                width: window_width,
                height: window_height,
                cell_size,
            });
        }

        Self::with_grid(
            columns as u32,
            rows as u32,
            window_width,
            window_height,
            tuning,
        )
    }

    /// Uses explicit grid dimensions inside a viewport of the given size.
    pub fn with_grid(
        columns: u32,
        rows: u32,
        viewport_width: f32,
        viewport_height: f32,
        tuning: Tuning,
    ) -> Result<Self, SettingsError> {
        if !(tuning.cell_size.is_finite() && tuning.cell_size > 0.0) {
            return Err(SettingsError::InvalidCellSize(tuning.cell_size));
        }
        if columns == 0 || rows == 0 {
            return Err(SettingsError::WindowTooSmall {
                width: viewport_width,
                height: viewport_height,
                cell_size: tuning.cell_size,
            });
        }

        let capacities = [
            ("worm", tuning.worm_capacity),
            ("module", tuning.module_capacity),
            ("block", tuning.block_capacity),
            ("fruit", tuning.fruit_capacity),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, capacity)| *capacity == 0) {
            return Err(SettingsError::ZeroCapacity(name));
        }

        if tuning.initial_length == 0 || tuning.initial_length > tuning.max_length {
            return Err(SettingsError::InvalidInitialLength {
                initial: tuning.initial_length,
                max: tuning.max_length,
            });
        }

        Ok(Self {
            columns,
            rows,
            viewport_width,
            viewport_height,
            tuning,
        })
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.tuning.cell_size
    }

    /// Width of the viewport the field is centred in.
    #[must_use]
    pub const fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Height of the viewport the field is centred in.
    #[must_use]
    pub const fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Tunable constants backing these settings.
    #[must_use]
    pub const fn tuning(&self) -> &Tuning {
        &self.tuning
    }
}
