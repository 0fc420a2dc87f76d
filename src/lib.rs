#![allow(clippy::collapsible_if)]

pub mod arena;
pub mod config;
pub mod diagnostics;
pub mod language;
pub mod logging;
pub mod runtime;
pub mod tools;

pub use arena::{Arena, ArenaOutcome, CandidateReport};
