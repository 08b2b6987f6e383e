// Domain layer: census models and ports (interfaces).

pub mod model;
pub mod ports;
