//! Keyed pool of device connections with idle eviction.
//!
//! One entry per address. Each entry sits behind its own async mutex, which
//! serializes get-or-create and every write-then-read exchange for that
//! address. A single sweep task evicts entries that have been idle for the
//! configured window.
//!
//! # Entry Lifecycle
//!
//! ```text
//!   Absent ──acquire──► Connecting ──dial ok──► Open ◄──┐
//!                           │                    │  └───┘ use (touch)
//!                       dial failed        evict/invalidate
//!                           ▼                    ▼
//!                         Closed ◄───────────────┘  (removed from map)
//! ```
//!
//! An entry in the map is only ever `Connecting` or `Open`. `Closed`
//! entries are detached, so a caller that locks one after losing a race
//! goes back to the map and redials.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::config::ChannelConfig;
use crate::error::{Error, Result};

use super::connection::dial;

// ============================================================================
// Types
// ============================================================================

/// Shared handle to one address's entry.
type EntrySlot = Arc<AsyncMutex<EntryState>>;

/// Why an entry stopped being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Idle for longer than the idle window.
    Evicted,
    /// An exchange on it failed.
    Invalidated,
    /// The dial that would have opened it failed.
    DialFailed,
    /// The pool shut down.
    Shutdown,
}

/// State of one pooled entry.
enum EntryState {
    /// Registered, dial not yet completed.
    Connecting,
    /// Socket is live.
    Open {
        stream: TcpStream,
        last_used: Instant,
    },
    /// Detached from the pool; never reopened.
    Closed(CloseReason),
}

/// Copyable view of an [`EntryState`] variant.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Connecting,
    Open,
    Closed(CloseReason),
}

impl EntryState {
    fn phase(&self) -> Phase {
        match self {
            Self::Connecting => Phase::Connecting,
            Self::Open { .. } => Phase::Open,
            Self::Closed(reason) => Phase::Closed(*reason),
        }
    }
}

// ============================================================================
// ConnectionPool
// ============================================================================

/// Address-keyed registry of live device connections.
///
/// Constructed once at startup with [`ConnectionPool::start`] and shared
/// across request tasks. Call [`ConnectionPool::shutdown`] before exit.
///
/// # Example
///
/// ```ignore
/// let pool = ConnectionPool::start(ChannelConfig::default())?;
///
/// let (mut conn, fresh) = pool.acquire("10.5.34.12").await?;
/// let stream = conn.stream_mut()?;
/// // ... write one command, read one response ...
/// conn.touch();
/// drop(conn);
///
/// pool.shutdown().await;
/// ```
pub struct ConnectionPool {
    /// Channel timing and addressing.
    config: ChannelConfig,

    /// Entries by address.
    entries: Mutex<FxHashMap<String, EntrySlot>>,

    /// Pooled dials performed since start.
    dials: AtomicU64,

    /// Shutdown flag.
    shutdown: AtomicBool,

    /// Idle sweep task.
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// ConnectionPool - Constructor
// ============================================================================

impl ConnectionPool {
    /// Creates a pool and starts its idle sweep task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn start(config: ChannelConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let pool = Arc::new(Self {
            config,
            entries: Mutex::new(FxHashMap::default()),
            dials: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        });

        let handle = tokio::spawn(Self::sweep_loop(Arc::downgrade(&pool)));
        *pool.sweeper.lock() = Some(handle);

        debug!(
            idle_ms = pool.config.idle_timeout.as_millis() as u64,
            sweep_ms = pool.config.sweep_interval.as_millis() as u64,
            "ConnectionPool started"
        );

        Ok(pool)
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl ConnectionPool {
    /// Returns the channel configuration this pool was started with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Returns the number of registered entries.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns the number of dials performed for pooled entries.
    #[inline]
    #[must_use]
    pub fn dial_count(&self) -> u64 {
        self.dials.load(Ordering::SeqCst)
    }

    /// Returns `true` if an entry is registered for `address`.
    #[inline]
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.entries.lock().contains_key(address)
    }

    /// Gets the open connection for `address`, dialing if there is none.
    ///
    /// The returned handle holds the address's lock until dropped, so one
    /// caller at a time can exchange on the socket. Concurrent first
    /// callers for the same address wait on the dial instead of each
    /// dialing. The boolean is `true` when this call performed the dial.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] or [`Error::Timeout`] if dialing fails
    /// - [`Error::ConnectionClosed`] if the pool is shut down
    pub async fn acquire(&self, address: &str) -> Result<(PooledConnection<'_>, bool)> {
        loop {
            let slot = {
                let mut entries = self.entries.lock();

                // Checked under the map lock so nothing is registered after
                // shutdown drains the map.
                if self.shutdown.load(Ordering::SeqCst) {
                    return Err(Error::ConnectionClosed);
                }

                Arc::clone(
                    entries
                        .entry(address.to_string())
                        .or_insert_with(|| Arc::new(AsyncMutex::new(EntryState::Connecting))),
                )
            };

            let mut guard = Arc::clone(&slot).lock_owned().await;

            match guard.phase() {
                Phase::Open => {
                    debug!(address = %address, "Using already open connection");
                    return Ok((PooledConnection::new(self, address, slot, guard), false));
                }

                Phase::Closed(reason) => {
                    trace!(address = %address, ?reason, "Entry closed while waiting, retrying");
                    continue;
                }

                Phase::Connecting => {
                    self.dials.fetch_add(1, Ordering::SeqCst);

                    match dial(address, &self.config).await {
                        Ok(stream) => {
                            *guard = EntryState::Open {
                                stream,
                                last_used: Instant::now(),
                            };
                            info!(address = %address, "Pooled connection opened");
                            return Ok((PooledConnection::new(self, address, slot, guard), true));
                        }
                        Err(e) => {
                            *guard = EntryState::Closed(CloseReason::DialFailed);
                            self.detach(address, &slot);
                            warn!(address = %address, error = %e, "Dial failed");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Removes and closes the entry for `address`.
    ///
    /// Waits for any exchange in progress on it to finish first. Returns
    /// `true` if an entry was removed.
    pub async fn invalidate(&self, address: &str) -> bool {
        let removed = self.entries.lock().remove(address);

        let Some(slot) = removed else {
            return false;
        };

        *slot.lock().await = EntryState::Closed(CloseReason::Invalidated);
        debug!(address = %address, "Connection invalidated");
        true
    }

    /// Evicts every entry idle for at least the idle window.
    ///
    /// Entries currently in use are skipped. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let snapshot: Vec<(String, EntrySlot)> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .map(|(address, slot)| (address.clone(), Arc::clone(slot)))
                .collect()
        };

        let mut evicted = 0;

        for (address, slot) in snapshot {
            let Ok(mut guard) = Arc::clone(&slot).try_lock_owned() else {
                continue;
            };

            let expired = matches!(
                &*guard,
                EntryState::Open { last_used, .. } if last_used.elapsed() >= self.config.idle_timeout
            );

            if expired {
                *guard = EntryState::Closed(CloseReason::Evicted);
                self.detach(&address, &slot);
                info!(address = %address, "Closing idle connection");
                evicted += 1;
            }
        }

        evicted
    }
}

// ============================================================================
// ConnectionPool - Lifecycle
// ============================================================================

impl ConnectionPool {
    /// Stops the sweeper and closes every entry.
    ///
    /// Waits for every [`PooledConnection`] still held to be dropped, so a
    /// task must release its own handles before calling this.
    pub async fn shutdown(&self) {
        info!("ConnectionPool shutting down");

        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }

        let slots: Vec<_> = {
            let mut map = self.entries.lock();
            map.drain().collect()
        };

        for (address, slot) in slots {
            *slot.lock().await = EntryState::Closed(CloseReason::Shutdown);
            debug!(address = %address, "Connection closed during shutdown");
        }

        info!("ConnectionPool shutdown complete");
    }

    /// Removes `slot` from the map if it is still the entry for `address`.
    fn detach(&self, address: &str, slot: &EntrySlot) {
        let mut entries = self.entries.lock();
        if entries
            .get(address)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            entries.remove(address);
        }
    }

    /// Background task that runs [`ConnectionPool::sweep`] periodically.
    async fn sweep_loop(pool: Weak<Self>) {
        let period = match pool.upgrade() {
            Some(pool) => pool.config.sweep_interval,
            None => return,
        };

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(pool) = pool.upgrade() else {
                break;
            };

            if pool.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let evicted = pool.sweep();
            if evicted > 0 {
                debug!(evicted, remaining = pool.connection_count(), "Idle sweep finished");
            }
        }

        debug!("Sweep loop terminated");
    }
}

// ============================================================================
// PooledConnection
// ============================================================================

/// Exclusive handle on one pooled connection.
///
/// Dropping it releases the address for the next caller.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    address: String,
    slot: EntrySlot,
    guard: OwnedMutexGuard<EntryState>,
}

impl<'a> PooledConnection<'a> {
    fn new(
        pool: &'a ConnectionPool,
        address: &str,
        slot: EntrySlot,
        guard: OwnedMutexGuard<EntryState>,
    ) -> Self {
        Self {
            pool,
            address: address.to_string(),
            slot,
            guard,
        }
    }

    /// Returns the address this connection belongs to.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the entry is no longer open.
    pub fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        match &mut *self.guard {
            EntryState::Open { stream, .. } => Ok(stream),
            _ => Err(Error::ConnectionClosed),
        }
    }

    /// Resets the idle timer.
    pub fn touch(&mut self) {
        if let EntryState::Open { last_used, .. } = &mut *self.guard {
            *last_used = Instant::now();
        }
    }

    /// Closes the socket and removes the entry from the pool.
    pub fn invalidate(mut self) {
        *self.guard = EntryState::Closed(CloseReason::Invalidated);
        self.pool.detach(&self.address, &self.slot);
        debug!(address = %self.address, "Connection invalidated");
    }
}

// ============================================================================
// Tests
// ============================================================================
