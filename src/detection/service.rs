//! Impossible-travel evaluation of a single login
//!
//! Resolves the login's IP, records it, looks up the user's neighboring
//! logins in time and classifies both transitions. Each collaborator call
//! runs on a blocking worker under a time limit.
//!
//! Two concurrent logins for the same user may not see each other as
//! neighbors: each one appends and then queries, and either query can run
//! before the other append lands. A login never sees itself, because the
//! store's neighbor queries use strict timestamp inequality.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use crate::detection::velocity::VelocityClassifier;
use crate::geolocation::{GeoError, GeoResolver};
use crate::models::{AnomalyResult, LoginEvent, LoginRecord, LoginRequest, ValidationError};
use crate::persistence::{EventStore, PersistenceError};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Collaborator call made during an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Resolve,
    Append,
    NearestBefore,
    NearestAfter,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Resolve => "geolocation lookup",
            Operation::Append => "event append",
            Operation::NearestBefore => "preceding event query",
            Operation::NearestAfter => "subsequent event query",
        };
        f.write_str(name)
    }
}

/// Errors that abort an evaluation
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Invalid login event: {0}")]
    Validation(#[from] ValidationError),

    #[error("Geolocation failed: {0}")]
    Resolver(#[from] GeoError),

    #[error("Event store failed: {0}")]
    Storage(#[from] PersistenceError),

    #[error("{operation} timed out after {limit:?}")]
    Timeout { operation: Operation, limit: Duration },

    #[error("{operation} worker failed: {reason}")]
    Internal { operation: Operation, reason: String },
}

impl EvaluationError {
    /// Only malformed input is final; every dependency failure may succeed on retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EvaluationError::Validation(_))
    }

    /// Message that is safe to return to a client
    ///
    /// Validation errors name the offending field. Dependency errors say
    /// which kind of dependency failed and nothing about its internals.
    pub fn public_message(&self) -> String {
        match self {
            EvaluationError::Validation(e) => e.to_string(),
            EvaluationError::Resolver(e) if e.is_not_found() => {
                "no location available for ip_address".to_string()
            }
            EvaluationError::Resolver(_) => "geolocation service unavailable".to_string(),
            EvaluationError::Storage(_) => "event store unavailable".to_string(),
            EvaluationError::Timeout { .. } => "dependency timed out".to_string(),
            EvaluationError::Internal { .. } => "internal error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Before,
    After,
}

/// Evaluates logins for impossible travel
///
/// Holds its collaborators by `Arc`, so one instance can be shared by every
/// request handler.
pub struct TravelAnomalyService {
    resolver: Arc<dyn GeoResolver>,
    store: Arc<dyn EventStore>,
    classifier: VelocityClassifier,
    resolver_timeout: Duration,
    store_timeout: Duration,
}

impl TravelAnomalyService {
    /// Create a service with the default threshold and time limits
    pub fn new(resolver: Arc<dyn GeoResolver>, store: Arc<dyn EventStore>) -> Self {
        TravelAnomalyService {
            resolver,
            store,
            classifier: VelocityClassifier::new(),
            resolver_timeout: DEFAULT_CALL_TIMEOUT,
            store_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Create a service using the threshold and time limits from `config`
    pub fn from_config(
        resolver: Arc<dyn GeoResolver>,
        store: Arc<dyn EventStore>,
        config: &Config,
    ) -> Self {
        Self::new(resolver, store)
            .with_max_velocity(config.detection.max_velocity_kmh)
            .with_timeouts(config.timeouts.resolver(), config.timeouts.store())
    }

    pub fn with_max_velocity(mut self, max_velocity_kmh: f64) -> Self {
        self.classifier = VelocityClassifier::with_max_velocity(max_velocity_kmh);
        self
    }

    pub fn with_timeouts(mut self, resolver: Duration, store: Duration) -> Self {
        self.resolver_timeout = resolver;
        self.store_timeout = store;
        self
    }

    pub fn max_velocity_kmh(&self) -> f64 {
        self.classifier.max_velocity_kmh()
    }

    /// Validate a raw request and evaluate it
    ///
    /// Invalid input is rejected before any collaborator is called.
    pub async fn evaluate_request(
        &self,
        request: &LoginRequest,
    ) -> Result<AnomalyResult, EvaluationError> {
        let event = request.validate().map_err(reject)?;
        self.evaluate(event).await
    }

    /// Evaluate one login against the user's neighboring logins
    ///
    /// Either a complete result is returned or the whole evaluation fails.
    /// Invalid events are rejected before any collaborator is called.
    pub async fn evaluate(&self, event: LoginEvent) -> Result<AnomalyResult, EvaluationError> {
        event.validate().map_err(reject)?;

        let user = event.username.clone();
        let event_uuid = event.event_uuid.clone();

        let result = self.run(event).await;
        match &result {
            Ok(outcome) if outcome.is_suspicious() => log::warn!(
                "Impossible travel for user '{}' (event {}): before={} after={}",
                user,
                event_uuid,
                describe(outcome.before.as_ref().map(|v| v.speed_kmh)),
                describe(outcome.after.as_ref().map(|v| v.speed_kmh)),
            ),
            Ok(_) => log::debug!("Login {} for user '{}' is not suspicious", event_uuid, user),
            Err(e) => log::error!("Evaluation of event {} for user '{}' failed: {}", event_uuid, user, e),
        }
        result
    }

    async fn run(&self, event: LoginEvent) -> Result<AnomalyResult, EvaluationError> {
        let resolver = Arc::clone(&self.resolver);
        let ip = event.ip_address;
        let location = bounded(Operation::Resolve, self.resolver_timeout, move || {
            resolver.resolve(&ip)
        })
        .await?;
        if !location.is_valid() {
            return Err(GeoError::InvalidCoordinates(location.latitude, location.longitude).into());
        }

        let record = LoginRecord::new(event, location);

        // Append before querying so the user's next login sees this one
        let store = Arc::clone(&self.store);
        let to_append = record.clone();
        bounded(Operation::Append, self.store_timeout, move || {
            store.append(&to_append)
        })
        .await?;

        let before = self.neighbor(Direction::Before, &record).await?;
        let after = self.neighbor(Direction::After, &record).await?;

        Ok(AnomalyResult {
            current: location,
            before: self.classifier.classify(&record, before.as_ref()),
            after: self.classifier.classify(&record, after.as_ref()),
        })
    }

    async fn neighbor(
        &self,
        direction: Direction,
        record: &LoginRecord,
    ) -> Result<Option<LoginRecord>, EvaluationError> {
        let store = Arc::clone(&self.store);
        let user = record.username.clone();
        let timestamp = record.timestamp;

        let (operation, found) = match direction {
            Direction::Before => (
                Operation::NearestBefore,
                bounded(Operation::NearestBefore, self.store_timeout, move || {
                    store.nearest_before(&user, timestamp)
                })
                .await?,
            ),
            Direction::After => (
                Operation::NearestAfter,
                bounded(Operation::NearestAfter, self.store_timeout, move || {
                    store.nearest_after(&user, timestamp)
                })
                .await?,
            ),
        };

        if let Some(neighbor) = &found {
            let ordered = match direction {
                Direction::Before => neighbor.timestamp < timestamp,
                Direction::After => neighbor.timestamp > timestamp,
            };
            if !ordered || neighbor.username != record.username {
                return Err(PersistenceError::InvalidData(format!(
                    "{} returned event {} at {} for a login at {}",
                    operation, neighbor.event_uuid, neighbor.timestamp, timestamp
                ))
                .into());
            }
        }
        Ok(found)
    }
}

/// Run a blocking collaborator call on the blocking pool, bounded by `limit`
///
/// On timeout the call keeps running in the background but its result is
/// discarded.
async fn bounded<T, E, F>(operation: Operation, limit: Duration, work: F) -> Result<T, EvaluationError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<EvaluationError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result.map_err(Into::into),
        Ok(Err(join_error)) => Err(EvaluationError::Internal {
            operation,
            reason: join_error.to_string(),
        }),
        Err(_) => Err(EvaluationError::Timeout { operation, limit }),
    }
}

fn reject(e: ValidationError) -> ValidationError {
    log::debug!("Rejected login event: {}", e);
    e
}

fn describe(speed_kmh: Option<u64>) -> String {
    match speed_kmh {
        Some(speed) => format!("{} km/h", speed),
        None => "none".to_string(),
    }
}
