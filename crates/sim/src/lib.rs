pub mod pilots;
pub mod session;
pub mod vehicle;

pub use pilots::*;
pub use session::*;
pub use vehicle::VehicleSim;
