//! Simulation configuration loaded from TOML, with defaults for every field.
//!
//! A missing file section (or a missing file, see [`SimulationConfig::load_or_default`])
//! falls back to the built-in values, which reproduce the classic particle
//! fountain: air drag on a sphere, gravity pointing down the screen (+Y), a
//! unit box, and a 60 Hz tick.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::engine::scheduler::ExecutionMode;


/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`SimulationConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its permitted range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Window size, consumed by renderers mapping the unit box to pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// Particle spawning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Particles spawned per tick.
    pub per_tick: u32,
    /// Spawning stops once the world holds this many entities.
    pub max_entities: usize,
    /// Seed of the spawn RNG.
    pub seed: u64,
    /// Spawn position shared by every particle.
    pub origin: Vec3,
    /// Initial speed.
    pub speed: f32,
    /// Particle mass.
    pub mass: f32,
    /// Collision sphere radius; `0` spawns point particles without spheres.
    pub radius: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            per_tick: 1,
            max_entities: 10_000,
            seed: 0x5EED,
            origin: Vec3::new(0.5, 0.25, 0.0),
            speed: 0.2,
            mass: 7.0,
            radius: 0.005,
        }
    }
}

/// Physical constants and collision tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed tick length in seconds.
    pub dt: f32,
    /// Gravity added to `force.y` every tick.
    pub gravity: f32,
    /// Fluid density (1.2 for air, 999.9 for water).
    pub fluid_density: f32,
    /// Drag coefficient (0.47 for a sphere).
    pub drag_coefficient: f32,
    /// Reference area.
    pub area: f32,
    /// Fraction of normal speed kept after a wall bounce.
    pub restitution: f32,
    /// Distance inside a wall a bounced particle is placed at.
    pub wall_epsilon: f32,
    /// Lower corner of the box.
    pub bounds_min: Vec3,
    /// Upper corner of the box.
    pub bounds_max: Vec3,
    /// Factor applied to `-d_pos` when backing out of a sphere contact.
    pub backout_factor: f32,
    /// Back-out distance along the contact normal when `d_pos` is ~0.
    pub min_backout: f32,
    /// Maximum doublings of the back-out step.
    pub max_backout_iterations: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: 9.81,
            fluid_density: 1.2,
            drag_coefficient: 0.47,
            area: 10.10,
            restitution: 0.9,
            wall_epsilon: 1.0e-4,
            bounds_min: Vec3::new(0.0, 0.0, -1.0),
            bounds_max: Vec3::new(1.0, 1.0, 1.0),
            backout_factor: 0.5,
            min_backout: 1.0e-4,
            max_backout_iterations: 16,
        }
    }
}

impl PhysicsConfig {
    /// Combined drag constant `k = ½·ρ·Cd·A`.
    #[inline]
    pub fn drag_constant(&self) -> f32 {
        0.5 * self.fluid_density * self.drag_coefficient * self.area
    }
}

/// Scheduler options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sequential or parallel entity loops.
    pub mode: ExecutionMode,
}

/// Everything needed to build and drive a simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Window size.
    pub window: WindowConfig,
    /// Particle spawning.
    pub spawn: SpawnConfig,
    /// Physics constants.
    pub physics: PhysicsConfig,
    /// Scheduler options.
    pub scheduler: SchedulerConfig,
}

impl SimulationConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Rejects values the systems cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        let invalid = |field: &'static str, reason: &'static str| Err(ConfigError::Invalid { field, reason });

        if !(p.dt > 0.0 && p.dt.is_finite()) {
            return invalid("physics.dt", "must be positive and finite");
        }
        if !(0.0..1.0).contains(&p.restitution) {
            return invalid("physics.restitution", "must be in [0, 1)");
        }
        if !p.bounds_min.cmplt(p.bounds_max).all() {
            return invalid("physics.bounds_min", "must be below bounds_max on every axis");
        }
        if p.wall_epsilon < 0.0 {
            return invalid("physics.wall_epsilon", "must not be negative");
        }
        if !(p.backout_factor > 0.0) {
            return invalid("physics.backout_factor", "must be positive");
        }
        if p.max_backout_iterations == 0 {
            return invalid("physics.max_backout_iterations", "must be at least 1");
        }
        if !(self.spawn.mass > 0.0) {
            return invalid("spawn.mass", "must be positive");
        }
        if self.spawn.radius < 0.0 {
            return invalid("spawn.radius", "must not be negative");
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert!((config.physics.drag_constant() - 0.5 * 1.2 * 0.47 * 10.10).abs() < 1e-6);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config = SimulationConfig::from_toml(
            r#"
            [physics]
            gravity = 1.62

            [scheduler]
            mode = "parallel"
            "#,
        )
        .unwrap();
        assert_eq!(config.physics.gravity, 1.62);
        assert_eq!(config.physics.dt, 1.0 / 60.0);
        assert_eq!(config.scheduler.mode, ExecutionMode::Parallel);
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = SimulationConfig::from_toml("[physics]\nrestitution = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "physics.restitution", .. }));

        let err = SimulationConfig::from_toml("[physics]\nmax_backout_iterations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "physics.max_backout_iterations", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(SimulationConfig::from_toml("[physics"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn round_trips_through_toml() {
        let text = toml::to_string(&SimulationConfig::default()).unwrap();
        assert_eq!(SimulationConfig::from_toml(&text).unwrap(), SimulationConfig::default());
    }
}
