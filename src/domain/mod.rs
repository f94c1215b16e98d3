// Domain layer: core models and ports (interfaces) to the persistence collaborator.

pub mod model;
pub mod ports;
