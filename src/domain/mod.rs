// Domain layer: records and the storage port. No database or config types leak in here.

pub mod model;
pub mod ports;
