//! Natural-language analysis of scored transactions

pub mod client;
pub mod gateway;

pub use client::{HttpReasoningClient, Message, ReasoningService};
pub use gateway::{fallback_analysis, AnalysisGateway, FALLBACK_RECOMMENDATION, FALLBACK_SUMMARY};
