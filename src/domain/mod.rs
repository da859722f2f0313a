// Domain layer: record and receipt models plus the ports the driver depends on.

pub mod model;
pub mod ports;
