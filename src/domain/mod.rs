pub mod entity;
pub mod reference;
pub mod node;
pub mod edge;
pub mod graph;
pub mod builder;
pub mod layout;
pub mod routing;
pub mod filter;
pub mod config;
pub mod error;
pub mod ports;
