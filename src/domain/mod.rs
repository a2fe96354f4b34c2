// Domain layer: plain records and the ports the core talks to.

pub mod model;
pub mod ports;
