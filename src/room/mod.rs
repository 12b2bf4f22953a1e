// Room module: player roster, host succession, entry gate.

pub mod gate;
pub mod state;

pub use gate::{AdmissionPlan, AdmissionWave, EntryGate};
pub use state::{Player, Room};
