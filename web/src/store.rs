//! Server-side state shared by every request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use survey::{FileListing, PairUniverse, SessionState, SurveySession};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Sessions kept before the least recently used ones are dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub type SessionHandle = Arc<tokio::sync::Mutex<SurveySession>>;

struct Entry {
    session: SessionHandle,
    touched: Instant,
}

impl Entry {
    /// Idle sessions may go, except those in use by a request and those
    /// still holding responses the sink never accepted.
    fn evictable(&self) -> bool {
        self.session
            .try_lock()
            .map(|session| !session.awaiting_delivery())
            .unwrap_or(false)
    }
}

/// Sessions keyed by the id stored in the respondent's cookie.
///
/// Each session sits behind its own async lock so a request can read, modify
/// and write it back atomically without blocking other respondents. Sessions
/// idle for longer than the ttl are swept on insert, and the store never
/// grows past its capacity unless every entry is awaiting delivery.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            capacity,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `session` under its id and return the id.
    pub fn insert(&self, session: SurveySession) -> Uuid {
        let now = Instant::now();
        self.sweep(now);
        let id = session.id();
        let mut map = self.map();
        while map.len() >= self.capacity {
            let oldest = map
                .iter()
                .filter(|(_, entry)| entry.evictable())
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(id, _)| *id);
            let Some(oldest) = oldest else {
                warn!(sessions = map.len(), "session store full of undelivered responses");
                break;
            };
            map.remove(&oldest);
            debug!(%oldest, "evicted least recently used session");
        }
        map.insert(
            id,
            Entry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                touched: now,
            },
        );
        id
    }

    /// Session stored under `id`, marking it as used now.
    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut map = self.map();
        let entry = map.get_mut(&id)?;
        entry.touched = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.map().remove(&id).is_some()
    }

    /// Drop sessions untouched for longer than the ttl as of `now`, returning
    /// how many went.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, entry| {
            now.saturating_duration_since(entry.touched) < self.idle_ttl || !entry.evictable()
        });
        let dropped = before - map.len();
        if dropped > 0 {
            debug!(dropped, remaining = map.len(), "expired idle sessions");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifecycle state of the session stored under `id`.
    pub async fn state(&self, id: Uuid) -> SessionState {
        let Some(session) = self.get(id) else {
            return SessionState::Uninitialized;
        };
        let state = session.lock().await.state();
        state
    }
}

/// The current pair universe plus the listings it was built from.
pub struct Catalog {
    real: Box<dyn FileListing>,
    synth: Box<dyn FileListing>,
    delimiter: char,
    universe: RwLock<Arc<PairUniverse>>,
}

impl Catalog {
    /// List both sources and build the initial universe.
    pub fn load(
        real: Box<dyn FileListing>,
        synth: Box<dyn FileListing>,
        delimiter: char,
    ) -> survey::Result<Self> {
        let universe = survey::index_directories(real.as_ref(), synth.as_ref(), delimiter)?;
        Ok(Self {
            real,
            synth,
            delimiter,
            universe: RwLock::new(Arc::new(universe)),
        })
    }

    /// Snapshot of the current universe.
    pub fn universe(&self) -> Arc<PairUniverse> {
        self.universe
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild the universe from the listings. Running sessions keep the
    /// pairs they already drew.
    pub fn reload(&self) -> survey::Result<usize> {
        let universe =
            survey::index_directories(self.real.as_ref(), self.synth.as_ref(), self.delimiter)?;
        let pairs = universe.len();
        *self
            .universe
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(universe);
        info!(pairs, "reloaded image pairs");
        Ok(pairs)
    }
}
