use glam::Vec3;
use slipstream_shared::*;

use crate::pilots::Pilot;
use crate::vehicle::VehicleSim;

/// Run a deterministic session with a default (terrain-less) vehicle.
pub fn run_session(config: &SessionConfig, pilot: &mut dyn Pilot) -> Replay {
    run_session_on(VehicleSim::new(VehicleTuning::default()), config, pilot)
}

/// Run a session on a pre-built vehicle, e.g. one with terrain attached.
///
/// The driver samples the pilot every `control_period` ticks and records a
/// frame every `frame_interval` ticks, the same cadence the renderer and
/// chase camera would consume.
pub fn run_session_on(mut sim: VehicleSim, config: &SessionConfig, pilot: &mut dyn Pilot) -> Replay {
    let control_period = config.control_period.max(1);
    let frame_interval = config.frame_interval.max(1);

    sim.reset_position(config.start_position);

    let mut controls = ControlState::none();
    let mut frames = vec![ReplayFrame {
        tick: 0,
        vehicle: sim.snapshot(),
    }];
    let mut stats = SessionStats::default();
    let mut previous = config.start_position;
    let mut final_tick = 0;

    for tick in 0..config.max_ticks {
        if tick % control_period == 0 {
            controls = pilot.control(&sim.snapshot());
        }

        sim.tick(config.dt, &controls);
        final_tick = tick + 1;

        let snapshot = sim.snapshot();
        let position = Vec3::new(snapshot.x, snapshot.y, snapshot.z);
        stats.distance += position.distance(previous);
        stats.top_speed = stats.top_speed.max(snapshot.speed);
        previous = position;

        if final_tick % frame_interval == 0 {
            frames.push(ReplayFrame {
                tick: final_tick,
                vehicle: snapshot,
            });
        }
    }

    if final_tick % frame_interval != 0 {
        frames.push(ReplayFrame {
            tick: final_tick,
            vehicle: sim.snapshot(),
        });
    }

    Replay {
        config: config.clone(),
        frames,
        stats,
        final_tick,
    }
}
