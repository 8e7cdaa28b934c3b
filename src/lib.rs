pub mod api;
pub mod config;
pub mod detection;
pub mod geolocation;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use config::Config;
pub use detection::{EvaluationError, TravelAnomalyService, VelocityClassifier};
pub use geolocation::{GeoError, GeoResolver, MaxMindResolver, StaticResolver};
pub use models::{AnomalyResponse, AnomalyResult, LocationFix, LoginEvent, LoginRecord, LoginRequest};
pub use persistence::{EventStore, PersistenceError, SqliteEventStore};
