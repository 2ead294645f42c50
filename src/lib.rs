//! flowlanes: lane-grouped call/reference graphs from Python
//! sources, laid out in layers and rendered as draw.io and Mermaid diagrams.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
