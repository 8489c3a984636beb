// Domain layer: asset tasks, reports and the storage port.

pub mod model;
pub mod ports;
