pub mod event;
pub mod report;

pub use event::{LocationFix, LoginEvent, LoginRecord, LoginRequest, ValidationError};
pub use report::{AnomalyResponse, AnomalyResult, NeighborAccess, TransitionVerdict};
