//! Type definitions for the scoring pipeline

pub mod analysis;
pub mod outcome;
pub mod shares;
pub mod transaction;

pub use analysis::{AnalysisResult, AnalysisSource, ThreatLevel};
pub use outcome::ScoringOutcome;
pub use shares::SmpcShares;
pub use transaction::{Classification, ScoringRequest, Transaction};
