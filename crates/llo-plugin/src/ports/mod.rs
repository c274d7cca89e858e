//! Ports layer (Hexagonal Architecture)
//!
//! Inbound: the reporting-plugin interface driven by the consensus transport.
//! Outbound: collaborators the plugin calls out to.

mod inbound;
mod outbound;

pub use inbound::*;
pub use outbound::*;
