//! The single, mutually-exclusive server.
//!
//! One exclusive region (the "floor") covers wake-up, the service body, seat
//! release and the completion report. A client task holds it as a
//! `ServiceGuard`; dropping the guard always returns the seat and reports the
//! client done, including when the service body panics or the task is aborted
//! mid-service. A task cancelled while still queued for the floor is covered by
//! a `PendingReport`, which files the report once the floor frees up.
//!
//! Order inside the region:
//! 1. wake the server if it is sleeping
//! 2. run the service body
//! 3. release the client's seat
//! 4. report completion, which may put the server back to sleep

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, watch};

use crate::client::Client;
use crate::delay::Delay;
use crate::events::{EventKind, EventLog};
use crate::gate::Seat;
use crate::tracker::CompletionTracker;

/// Server activity state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Idle. Nobody is in the chair.
    #[default]
    Sleeping,
    /// Serving a client, or about to.
    Active,
}

/// The opaque, time-consuming work performed for one client.
#[async_trait]
pub trait ServiceWork: Send + Sync {
    async fn perform(&self, client: &Client);
}

/// Service body that sleeps for a duration sampled from a [`Delay`].
pub struct TimedService {
    delay: Delay,
    rng: StdMutex<StdRng>,
}

impl TimedService {
    pub fn new(delay: Delay) -> Self {
        Self {
            delay,
            rng: StdMutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(delay: Delay, seed: u64) -> Self {
        Self {
            delay,
            rng: StdMutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_duration(&self) -> Duration {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.delay.sample(&mut *rng)
    }
}

#[async_trait]
impl ServiceWork for TimedService {
    async fn perform(&self, client: &Client) {
        let duration = self.next_duration();
        tracing::debug!(client = %client, duration_ms = duration.as_millis() as u64, "Service body running");
        tokio::time::sleep(duration).await;
    }
}

/// Point-in-time view of the server, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterStatus {
    pub state: ServerState,
    pub expected: usize,
    pub outstanding: usize,
    /// Client currently in the chair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving: Option<String>,
}

struct Floor {
    state: ServerState,
    tracker: CompletionTracker,
    serving: Option<String>,
    status_tx: watch::Sender<CounterStatus>,
}

impl Floor {
    fn wake(&mut self, client: &str, events: &EventLog) {
        if self.state == ServerState::Sleeping {
            if self.tracker.is_drained() {
                debug_assert!(false, "server woken after all clients finished");
                tracing::error!(client, "Bug: server woken after all clients finished");
            }
            self.state = ServerState::Active;
            events.record(client, EventKind::ServerWoke);
        }
    }

    fn report_done(&mut self, client: &str, events: &EventLog) {
        let progress = self.tracker.report_done();
        tracing::debug!(client, outstanding = self.tracker.outstanding(), "Client reported done");
        if progress.is_drained() && self.state == ServerState::Active {
            self.state = ServerState::Sleeping;
            events.record(client, EventKind::ServerSlept);
        }
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(CounterStatus {
            state: self.state,
            expected: self.tracker.expected(),
            outstanding: self.tracker.outstanding(),
            serving: self.serving.clone(),
        });
    }
}

/// Holds the exclusive region for one client's service.
struct ServiceGuard<'a> {
    floor: MutexGuard<'a, Floor>,
    seat: Option<Seat>,
    client: &'a Client,
    events: &'a EventLog,
    finished: bool,
}

impl Drop for ServiceGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(client = %self.client, "Service aborted before completion - releasing seat");
        }
        self.floor.serving = None;
        if let Some(seat) = self.seat.take() {
            seat.release();
        }
        self.floor.report_done(self.client.name(), self.events);
    }
}

/// Completion report owed by a client that is queued for the floor.
///
/// Armed before the lock is awaited and disarmed as soon as it is held. If the
/// waiting future is dropped in between, the report is delivered on drop.
struct PendingReport {
    floor: Arc<Mutex<Floor>>,
    events: Arc<EventLog>,
    client: Option<String>,
}

impl PendingReport {
    fn new(floor: &Arc<Mutex<Floor>>, events: &Arc<EventLog>, client: &Client) -> Self {
        Self {
            floor: Arc::clone(floor),
            events: Arc::clone(events),
            client: Some(client.name().to_string()),
        }
    }

    fn disarm(&mut self) {
        self.client = None;
    }
}

impl Drop for PendingReport {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        tracing::warn!(client = %client, "Visit cancelled while waiting for the server - reporting done");

        if let Ok(mut floor) = self.floor.try_lock() {
            floor.report_done(&client, &self.events);
            return;
        }

        // Someone else holds the floor. Queue behind them.
        let floor = Arc::clone(&self.floor);
        let events = Arc::clone(&self.events);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    floor.lock().await.report_done(&client, &events);
                });
            }
            Err(_) => {
                tracing::error!(client = %client, "No runtime to deliver completion report - client left outstanding");
            }
        }
    }
}

/// Mutually-exclusive server with sleep/wake tracking.
pub struct ServiceCounter {
    floor: Arc<Mutex<Floor>>,
    status_rx: watch::Receiver<CounterStatus>,
    work: Arc<dyn ServiceWork>,
    events: Arc<EventLog>,
}

impl ServiceCounter {
    /// Create a sleeping server expecting `expected` client reports.
    pub fn new(expected: usize, work: Arc<dyn ServiceWork>, events: Arc<EventLog>) -> Self {
        let initial = CounterStatus {
            state: ServerState::Sleeping,
            expected,
            outstanding: expected,
            serving: None,
        };
        let (status_tx, status_rx) = watch::channel(initial);

        Self {
            floor: Arc::new(Mutex::new(Floor {
                state: ServerState::Sleeping,
                tracker: CompletionTracker::new(expected),
                serving: None,
                status_tx,
            })),
            status_rx,
            work,
            events,
        }
    }

    /// Serve an admitted client. Blocks until the server is free.
    ///
    /// Consumes the client and its seat: the seat is released and the client
    /// reported done before the server is handed to the next client. If the
    /// caller is cancelled while still queued, the seat is returned and the
    /// client is reported done once the floor frees up.
    pub async fn serve(&self, client: Client, seat: Seat) {
        let mut pending = PendingReport::new(&self.floor, &self.events, &client);
        let floor = self.floor.lock().await;
        pending.disarm();
        let mut service = ServiceGuard {
            floor,
            seat: Some(seat),
            client: &client,
            events: &self.events,
            finished: false,
        };

        service.floor.wake(client.name(), &self.events);
        service.floor.serving = Some(client.name().to_string());
        service.floor.publish();
        self.events.record(client.name(), EventKind::ServiceStarted);

        self.work.perform(&client).await;

        self.events.record(client.name(), EventKind::ServiceFinished);
        service.finished = true;
    }

    /// Report a client that was turned away at the gate.
    pub async fn report_rejected(&self, client: Client) {
        let mut pending = PendingReport::new(&self.floor, &self.events, &client);
        let mut floor = self.floor.lock().await;
        pending.disarm();
        floor.report_done(client.name(), &self.events);
    }

    /// Latest published status. Never waits on the exclusive region.
    pub fn status(&self) -> CounterStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<CounterStatus> {
        self.status_rx.clone()
    }

    pub fn state(&self) -> ServerState {
        self.status_rx.borrow().state
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }
}
