//! Risk scoring components

pub mod engine;
pub mod shares;
pub mod signal;

pub use engine::{ScoreBreakdown, ScoreEngine};
pub use shares::ShareGenerator;
pub use signal::{FixedDeviceSignal, RiskSignalProvider, SimulatedDeviceSignal};
