//! Domain types shared by the tracker and its remote collaborator

pub mod agent;
pub mod metric;
pub mod snapshot;
pub mod target;
pub mod week_key;
