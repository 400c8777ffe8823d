//! Domain layer: records flowing through the stages, the graph model and the stage ports.

pub mod graph;
pub mod model;
pub mod ports;
