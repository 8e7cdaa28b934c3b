pub mod distance;
pub mod service;
pub mod velocity;

pub use distance::{compensated_distance_km, haversine_km};
pub use service::{EvaluationError, Operation, TravelAnomalyService};
pub use velocity::VelocityClassifier;
