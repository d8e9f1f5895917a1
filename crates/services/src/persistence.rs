use std::sync::Arc;

use serde_json::Value;
use storage::repository::KeyValueStore;
use study_core::Clock;
use study_core::model::{AppState, SCHEMA_VERSION};

use crate::error::PersistenceError;

/// Key holding the serialized `AppState`.
pub const STATE_KEY: &str = "study-tracker-data";
/// Key holding the schema version the snapshot was written with.
pub const VERSION_KEY: &str = "study-tracker-version";

/// Result of [`PersistenceGateway::load_tracked`].
#[derive(Debug)]
pub struct Loaded {
    pub state: AppState,
    /// True when nothing usable was stored and `state` is the default catalog.
    pub defaulted: bool,
}

/// Loads and saves the state snapshot against a key-value store.
///
/// `load` and `save` never fail: storage problems are logged, reads fall back
/// to the default catalog and failed writes are dropped.
#[derive(Clone)]
pub struct PersistenceGateway {
    kv: Arc<dyn KeyValueStore>,
    clock: Clock,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        Self { kv, clock }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Stored state, or a fresh default state when nothing usable is stored.
    ///
    /// On fallback the current version marker is written so the next save
    /// lines up with the running schema.
    pub async fn load(&self) -> AppState {
        self.load_tracked().await.state
    }

    /// Like [`load`](Self::load), but also says whether the defaults were used.
    ///
    /// Callers that keep running should persist a defaulted state soon: until
    /// they do, the discarded blob is still under [`STATE_KEY`].
    pub async fn load_tracked(&self) -> Loaded {
        match self.try_load().await {
            Ok(state) => {
                tracing::debug!(subjects = state.subjects.len(), "loaded stored state");
                Loaded {
                    state,
                    defaulted: false,
                }
            }
            Err(err) => {
                if matches!(err, PersistenceError::Missing) {
                    tracing::info!("no stored state, starting from defaults");
                } else {
                    tracing::warn!("stored state unusable, using defaults: {err}");
                }
                if let Err(err) = self.kv.set(VERSION_KEY, SCHEMA_VERSION).await {
                    tracing::warn!("failed to write schema version: {err}");
                }
                Loaded {
                    state: AppState::fresh(self.clock.now()),
                    defaulted: true,
                }
            }
        }
    }

    /// Strict form of [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// `Missing` when no snapshot exists, `VersionMismatch` when the marker is
    /// absent or different, `Decode`/`MissingSubjects` for corrupt snapshots,
    /// `Storage` when the backend fails.
    pub async fn try_load(&self) -> Result<AppState, PersistenceError> {
        let blob = self.kv.get(STATE_KEY).await?;
        let version = self.kv.get(VERSION_KEY).await?;

        let Some(blob) = blob else {
            return Err(PersistenceError::Missing);
        };
        if version.as_deref() != Some(SCHEMA_VERSION) {
            return Err(PersistenceError::VersionMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        let raw: Value = serde_json::from_str(&blob).map_err(PersistenceError::Decode)?;
        if !raw.get("subjects").is_some_and(Value::is_array) {
            return Err(PersistenceError::MissingSubjects);
        }
        serde_json::from_value(raw).map_err(PersistenceError::Decode)
    }

    /// Writes a stamped copy of `state`. Failures are logged and dropped.
    pub async fn save(&self, state: &AppState) {
        if let Err(err) = self.try_save(state).await {
            tracing::warn!("failed to persist state: {err}");
        }
    }

    /// Strict form of [`save`](Self::save). `state` itself is never modified.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if encoding or either write fails.
    pub async fn try_save(&self, state: &AppState) -> Result<(), PersistenceError> {
        let stamped = state.stamped(self.clock.now());
        let blob = serde_json::to_string(&stamped).map_err(PersistenceError::Encode)?;
        self.kv.set(STATE_KEY, &blob).await?;
        self.kv.set(VERSION_KEY, SCHEMA_VERSION).await?;
        tracing::debug!(bytes = blob.len(), "persisted state");
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
