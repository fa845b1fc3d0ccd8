use glam::Vec3;

// Integration
pub const EPSILON: f32 = 1e-8;
pub const DEFAULT_DT: f32 = 1.6; // 16ms frame pre-scaled by the 0.1 driver factor

// Thrust and drag
pub const THRUST: f32 = 0.02;
pub const AIR_RESIST: f32 = 0.02;
pub const AIR_BRAKE: f32 = 0.02;
pub const MAX_SPEED: f32 = 7.0;

// Steering
pub const ANGULAR_SPEED: f32 = 0.005;
pub const AIR_ANGULAR_SPEED: f32 = 0.0065;
pub const ANGULAR_LERP: f32 = 0.35;

// Drift (lateral slide while air-braking)
pub const AIR_DRIFT: f32 = 0.1;
pub const DRIFT_LERP: f32 = 0.35;

// Banking roll during turns
pub const ROLL_ANGLE: f32 = 0.6;
pub const ROLL_LERP: f32 = 0.08;

// Secondary lean channels, decay-only until terrain drives them
pub const GRADIENT_LERP: f32 = 0.05;
pub const GRADIENT_SCALE: f32 = 4.0;
pub const TILT_LERP: f32 = 0.05;
pub const TILT_SCALE: f32 = 4.0;

// Lean axes. Gradient pitches about X; tilt and roll both lean about Z,
// layered in that order on top of the yaw frame.
pub const GRADIENT_AXIS: Vec3 = Vec3::X;
pub const TILT_AXIS: Vec3 = Vec3::Z;
pub const ROLL_AXIS: Vec3 = Vec3::Z;

// Collision response
pub const REPULSION_RATIO: f32 = 0.5;
pub const REPULSION_CAP: f32 = 2.5;
pub const REPULSION_LERP: f32 = 0.1;
pub const REPULSION_V_SCALE: f32 = 4.0;
pub const LONG_FRAME_DT: f32 = 1.5; // repulsion decay doubles past this
pub const COLLISION_SPEED_DECREASE: f32 = 0.8;

// Terrain height following
pub const HEIGHT_LERP: f32 = 0.4;

// Terminal fall: constant per-tick translation once the vehicle leaves the track
pub const FALL_VECTOR: Vec3 = Vec3::new(0.0, -20.0, 0.0);

// Session driver
pub const CONTROL_PERIOD: u32 = 2;
pub const FRAME_INTERVAL: u32 = 4;
pub const DEFAULT_SESSION_TICKS: u32 = 600;
