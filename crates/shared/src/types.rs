use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Snapshot of which logical driving actions are currently held.
/// Produced by an input collaborator, read once per tick by the simulation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub left_brake: bool,
    pub right_brake: bool,
    pub use_item: bool,
}

impl ControlState {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Physics tuning, immutable after construction and injected into the
/// simulation. Defaults mirror the constants in [`crate::constants`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleTuning {
    pub thrust: f32,
    pub air_brake: f32,
    pub max_speed: f32,
    pub angular_speed: f32,
    pub air_angular_speed: f32,
    pub angular_lerp: f32,
    pub air_drift: f32,
    pub drift_lerp: f32,
    pub roll_angle: f32,
    pub roll_lerp: f32,
    pub gradient_lerp: f32,
    pub tilt_lerp: f32,
    pub repulsion_lerp: f32,
    pub repulsion_cap: f32,
    pub repulsion_ratio: f32,
    pub repulsion_v_scale: f32,
    pub long_frame_dt: f32,
    pub collision_speed_decrease: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            thrust: crate::THRUST,
            air_brake: crate::AIR_BRAKE,
            max_speed: crate::MAX_SPEED,
            angular_speed: crate::ANGULAR_SPEED,
            air_angular_speed: crate::AIR_ANGULAR_SPEED,
            angular_lerp: crate::ANGULAR_LERP,
            air_drift: crate::AIR_DRIFT,
            drift_lerp: crate::DRIFT_LERP,
            roll_angle: crate::ROLL_ANGLE,
            roll_lerp: crate::ROLL_LERP,
            gradient_lerp: crate::GRADIENT_LERP,
            tilt_lerp: crate::TILT_LERP,
            repulsion_lerp: crate::REPULSION_LERP,
            repulsion_cap: crate::REPULSION_CAP,
            repulsion_ratio: crate::REPULSION_RATIO,
            repulsion_v_scale: crate::REPULSION_V_SCALE,
            long_frame_dt: crate::LONG_FRAME_DT,
            collision_speed_decrease: crate::COLLISION_SPEED_DECREASE,
        }
    }
}

/// Per-frame view of the vehicle state, recorded into replays and handed
/// to pilots. The chase camera reads `speed_ratio` from here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub speed: f32,
    pub speed_ratio: f32,
    pub drift: f32,
    pub angular: f32,
    pub roll: f32,
    pub gradient: f32,
    pub tilt: f32,
    pub falling: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub tick: u32,
    pub vehicle: VehicleSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub pilot_name: String,
    pub max_ticks: u32,
    pub dt: f32,
    pub start_position: Vec3,
    pub control_period: u32,
    pub frame_interval: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pilot_name: "idle".into(),
            max_ticks: crate::DEFAULT_SESSION_TICKS,
            dt: crate::DEFAULT_DT,
            start_position: Vec3::ZERO,
            control_period: crate::CONTROL_PERIOD,
            frame_interval: crate::FRAME_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub top_speed: f32,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub config: SessionConfig,
    pub frames: Vec<ReplayFrame>,
    pub stats: SessionStats,
    pub final_tick: u32,
}
