pub mod flight;
pub mod payload;
pub mod snapshot;

pub use flight::{FlightCode, FlightKey, ProgressFlag, TrackedFlight};
pub use snapshot::{FlightSnapshot, FlightStatus, TrackPoint};
