//! Parameter bus: externally written visual parameters read once per tick.
//!
//! The session layer (or anything else holding a [`ParameterBus`] clone)
//! writes fields whenever commands arrive; the engine takes a
//! [`BusSnapshot`] at the top of each tick. Fields are independent
//! last-write-wins values with no cross-field consistency.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::PaletteError;
use crate::palette::{parse_hex, Theme, ThemePalette};

/// Writable bus fields
#[derive(Debug, Clone)]
struct BusState {
    base_color: Vec3,
    base_color_hex: String,
    pulse_intensity: f32,
    /// When set, the pulse target drops to 0 at this instant
    pulse_deadline: Option<Instant>,
    amplitude: f32,
    frequency: f32,
    speed: f32,
    palette: ThemePalette,
    /// Bumped on every palette write so readers can detect changes
    palette_revision: u64,
    is_processing: bool,
    ambient_brightness: f32,
    sampling: SamplingParams,
}

/// Generation settings of the upstream model, echoed into the orb shader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 20,
            top_p: 0.8,
        }
    }
}

impl Default for BusState {
    fn default() -> Self {
        let theme = Theme::default_theme();
        let hex = theme.primary_hex();
        Self {
            base_color: parse_hex(hex).unwrap_or(Vec3::ONE),
            base_color_hex: hex.to_string(),
            pulse_intensity: 0.0,
            pulse_deadline: None,
            amplitude: 0.5,
            frequency: 3.0,
            speed: 0.5,
            palette: theme.palette(),
            palette_revision: 0,
            is_processing: false,
            ambient_brightness: 0.5,
            sampling: SamplingParams::default(),
        }
    }
}

/// Values the engine reads for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct BusSnapshot {
    pub base_color: Vec3,
    pub pulse_intensity: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
    pub palette: ThemePalette,
    pub palette_revision: u64,
    pub is_processing: bool,
    pub ambient_brightness: f32,
    pub sampling: SamplingParams,
}

/// Shared handle to the bus (clone freely; all clones see the same state)
#[derive(Debug, Clone, Default)]
pub struct ParameterBus {
    inner: Arc<Mutex<BusState>>,
}

impl ParameterBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        // Plain value state: a panicked writer cannot leave it half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the orb base colour from a hex string
    pub fn set_base_color(&self, hex: &str) -> Result<(), PaletteError> {
        let color = parse_hex(hex)?;
        let mut state = self.state();
        state.base_color = color;
        state.base_color_hex = hex.to_string();
        Ok(())
    }

    /// Current base colour as the hex string it was set from
    pub fn base_color_hex(&self) -> String {
        self.state().base_color_hex.clone()
    }

    /// Set the pulse target directly, cancelling any pending auto-reset
    pub fn set_pulse_target(&self, intensity: f32) {
        let mut state = self.state();
        state.pulse_intensity = intensity.clamp(0.0, 1.0);
        state.pulse_deadline = None;
    }

    /// Set the pulse target and reset it to 0 after `duration`
    pub fn trigger_pulse(&self, intensity: f32, duration: Duration) {
        self.trigger_pulse_at(intensity, duration, Instant::now());
    }

    pub(crate) fn trigger_pulse_at(&self, intensity: f32, duration: Duration, now: Instant) {
        let mut state = self.state();
        state.pulse_intensity = intensity.clamp(0.0, 1.0);
        state.pulse_deadline = Some(now + duration);
    }

    pub fn set_deformation(&self, amplitude: f32, frequency: f32, speed: f32) {
        let mut state = self.state();
        state.amplitude = amplitude;
        state.frequency = frequency;
        state.speed = speed;
    }

    pub fn set_palette(&self, palette: ThemePalette) {
        let mut state = self.state();
        state.palette = palette;
        state.palette_revision += 1;
    }

    /// Switch theme: palette plus the theme's primary colour as base colour
    pub fn set_theme(&self, theme: &Theme) {
        let palette = theme.palette();
        let hex = theme.primary_hex();
        let mut state = self.state();
        state.palette = palette;
        state.palette_revision += 1;
        if let Ok(color) = parse_hex(hex) {
            state.base_color = color;
            state.base_color_hex = hex.to_string();
        }
    }

    pub fn set_processing(&self, is_processing: bool) {
        self.state().is_processing = is_processing;
    }

    pub fn set_ambient_brightness(&self, brightness: f32) {
        self.state().ambient_brightness = brightness.clamp(0.0, 1.0);
    }

    pub fn set_sampling(&self, sampling: SamplingParams) {
        self.state().sampling = sampling;
    }

    /// Apply a tool command, returning the result text reported upstream
    pub fn apply(&self, command: &ToolCommand) -> Result<String, PaletteError> {
        match command {
            ToolCommand::SetOrbColor { hex } => {
                self.set_base_color(hex)?;
                log::debug!("bus: orb colour {}", hex);
                Ok(format!("Color set to {}", hex))
            }
            ToolCommand::TriggerPulse {
                intensity,
                duration,
            } => {
                let millis = if duration.is_finite() {
                    duration.max(0.0)
                } else {
                    0.0
                };
                self.trigger_pulse(*intensity, Duration::from_secs_f64(millis / 1000.0));
                log::debug!("bus: pulse {} for {}ms", intensity, millis);
                Ok(format!("Pulse triggered with intensity {}", intensity))
            }
            ToolCommand::SetDeformation {
                amplitude,
                frequency,
                speed,
            } => {
                self.set_deformation(*amplitude, *frequency, *speed);
                log::debug!(
                    "bus: deformation amp {} freq {} speed {}",
                    amplitude,
                    frequency,
                    speed
                );
                Ok(format!(
                    "Deformation set to amp {}, freq {}, speed {}",
                    amplitude, frequency, speed
                ))
            }
        }
    }

    /// Read every field as of now
    pub fn snapshot(&self) -> BusSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Read every field, expiring a pulse whose deadline is at or before `now`
    pub fn snapshot_at(&self, now: Instant) -> BusSnapshot {
        let mut state = self.state();
        if let Some(deadline) = state.pulse_deadline {
            if now >= deadline {
                state.pulse_intensity = 0.0;
                state.pulse_deadline = None;
            }
        }
        BusSnapshot {
            base_color: state.base_color,
            pulse_intensity: state.pulse_intensity,
            amplitude: state.amplitude,
            frequency: state.frequency,
            speed: state.speed,
            palette: state.palette.clone(),
            palette_revision: state.palette_revision,
            is_processing: state.is_processing,
            ambient_brightness: state.ambient_brightness,
            sampling: state.sampling,
        }
    }
}

/// Commands issued by the upstream decision process
///
/// Wire shape: `{"name": "triggerPulse", "args": {"intensity": 0.8, "duration": 250}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum ToolCommand {
    /// Set the orb base colour
    #[serde(rename = "setOrbColor")]
    SetOrbColor { hex: String },

    /// Temporary pulse; `duration` is in milliseconds
    #[serde(rename = "triggerPulse")]
    TriggerPulse { intensity: f32, duration: f64 },

    /// Surface deformation parameters
    #[serde(rename = "setDeformation")]
    SetDeformation {
        amplitude: f32,
        frequency: f32,
        speed: f32,
    },
}

impl ToolCommand {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let snapshot = ParameterBus::new().snapshot();
        assert_eq!(snapshot.amplitude, 0.5);
        assert_eq!(snapshot.frequency, 3.0);
        assert_eq!(snapshot.speed, 0.5);
        assert_eq!(snapshot.pulse_intensity, 0.0);
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.ambient_brightness, 0.5);
        assert_eq!(snapshot.palette.len(), 5);
        assert_eq!(snapshot.sampling.top_k, 20);
    }

    #[test]
    fn test_clones_share_state() {
        let bus = ParameterBus::new();
        let writer = bus.clone();
        writer.set_processing(true);
        writer.set_deformation(1.5, 8.0, 2.0);
        let snapshot = bus.snapshot();
        assert!(snapshot.is_processing);
        assert_eq!(snapshot.amplitude, 1.5);
        assert_eq!(snapshot.frequency, 8.0);
        assert_eq!(snapshot.speed, 2.0);
    }

    #[test]
    fn test_pulse_expires_after_duration() {
        let bus = ParameterBus::new();
        let start = Instant::now();
        bus.trigger_pulse_at(0.8, Duration::from_millis(250), start);

        let before = bus.snapshot_at(start + Duration::from_millis(100));
        assert_eq!(before.pulse_intensity, 0.8);

        let after = bus.snapshot_at(start + Duration::from_millis(250));
        assert_eq!(after.pulse_intensity, 0.0);
    }

    #[test]
    fn test_pulse_clamped() {
        let bus = ParameterBus::new();
        bus.set_pulse_target(3.0);
        assert_eq!(bus.snapshot().pulse_intensity, 1.0);
        bus.set_pulse_target(-1.0);
        assert_eq!(bus.snapshot().pulse_intensity, 0.0);
    }

    #[test]
    fn test_invalid_colour_leaves_previous() {
        let bus = ParameterBus::new();
        bus.set_base_color("#ff0000").unwrap();
        assert!(bus.set_base_color("not-a-colour").is_err());
        assert_eq!(bus.snapshot().base_color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(bus.base_color_hex(), "#ff0000");
    }

    #[test]
    fn test_palette_revision_bumps() {
        let bus = ParameterBus::new();
        let r0 = bus.snapshot().palette_revision;
        bus.set_theme(&Theme::by_key("eldritch").unwrap());
        let snapshot = bus.snapshot();
        assert_eq!(snapshot.palette_revision, r0 + 1);
        assert_eq!(snapshot.palette.len(), 4);
        assert_eq!(bus.base_color_hex(), "#5D3A9B");
    }

    #[test]
    fn test_tool_command_json() {
        let cmd = ToolCommand::from_json(
            r#"{"name":"triggerPulse","args":{"intensity":0.7,"duration":300}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ToolCommand::TriggerPulse {
                intensity: 0.7,
                duration: 300.0
            }
        );

        let cmd = ToolCommand::from_json(
            r#"{"name":"setDeformation","args":{"amplitude":1.0,"frequency":4.0,"speed":0.2}}"#,
        )
        .unwrap();
        let bus = ParameterBus::new();
        let result = bus.apply(&cmd).unwrap();
        assert!(result.starts_with("Deformation set"));
        assert_eq!(bus.snapshot().frequency, 4.0);

        assert!(ToolCommand::from_json(r#"{"name":"explode","args":{}}"#).is_err());
    }

    #[test]
    fn test_apply_bad_colour_is_error() {
        let bus = ParameterBus::new();
        let cmd = ToolCommand::SetOrbColor {
            hex: "#zzz".to_string(),
        };
        assert!(bus.apply(&cmd).is_err());
    }
}
