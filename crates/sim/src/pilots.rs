use slipstream_shared::{ControlState, VehicleSnapshot};

/// An input collaborator: turns the latest vehicle snapshot into the
/// control flags held for the next control period.
pub trait Pilot: Send {
    fn name(&self) -> &str;
    fn control(&mut self, snapshot: &VehicleSnapshot) -> ControlState;
}

/// Holds nothing - useful for testing decay behavior.
pub struct IdlePilot;

impl Pilot for IdlePilot {
    fn name(&self) -> &str {
        "idle"
    }

    fn control(&mut self, _snapshot: &VehicleSnapshot) -> ControlState {
        ControlState::none()
    }
}

/// Straight-line run at full throttle.
pub struct ThrottlePilot;

impl Pilot for ThrottlePilot {
    fn name(&self) -> &str {
        "throttle"
    }

    fn control(&mut self, _snapshot: &VehicleSnapshot) -> ControlState {
        ControlState {
            forward: true,
            ..ControlState::none()
        }
    }
}

/// Alternates turn plus matching air brake on a fixed period, exercising
/// banking, drift and yaw together.
pub struct SlalomPilot {
    period: u32,
    calls: u32,
}

impl SlalomPilot {
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            calls: 0,
        }
    }
}

impl Pilot for SlalomPilot {
    fn name(&self) -> &str {
        "slalom"
    }

    fn control(&mut self, _snapshot: &VehicleSnapshot) -> ControlState {
        let phase = (self.calls / self.period) % 2;
        self.calls += 1;
        let mut controls = ControlState {
            forward: true,
            ..ControlState::none()
        };
        if phase == 0 {
            controls.left = true;
            controls.left_brake = true;
        } else {
            controls.right = true;
            controls.right_brake = true;
        }
        controls
    }
}
