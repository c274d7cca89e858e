//! Multi-node integration suite.

pub mod network;

mod flows;
