pub mod dto;
pub mod engine;

pub use dto::{DiagramConfig, RunReport};
pub use engine::{DiagramEngine, RunOutput};
