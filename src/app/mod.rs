// Application layer - Use case interactors

pub mod container;
pub mod cut_orchestrator;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use cut_orchestrator::{CutOrchestrator, CutOutcome, CutRequest, CutSettings, JobAccepted};
