//! Lifecycle event log.
//!
//! Every observable step of a client's visit is recorded with a sequence
//! number and mirrored to `tracing`. Server-side events (wake, start, finish,
//! sleep) are recorded from inside the exclusive region, so their order in the
//! log is the order in which they happened.

use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrived,
    AdmittedWaiting,
    RejectedNoSeats,
    ServerWoke,
    ServiceStarted,
    ServiceFinished,
    ServerSlept,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrived => "arrived",
            Self::AdmittedWaiting => "admitted_waiting",
            Self::RejectedNoSeats => "rejected_no_seats",
            Self::ServerWoke => "server_woke",
            Self::ServiceStarted => "service_started",
            Self::ServiceFinished => "service_finished",
            Self::ServerSlept => "server_slept",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Arrived => "Client enters the shop",
            Self::AdmittedWaiting => "Client is waiting in the lounge",
            Self::RejectedNoSeats => "Client leaves, no seats available",
            Self::ServerWoke => "Barber wakes up",
            Self::ServiceStarted => "Barber starts the haircut",
            Self::ServiceFinished => "Barber finished the haircut",
            Self::ServerSlept => "Barber falls asleep, no more clients",
        }
    }
}

/// A recorded lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopEvent {
    pub seq: u64,
    pub client: String,
    pub kind: EventKind,
    /// Time since the log was created.
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Append-only, shared event log.
pub struct EventLog {
    created_at: Instant,
    events: StdMutex<Vec<ShopEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            created_at: Instant::now(),
            events: StdMutex::new(Vec::new()),
        }
    }

    pub fn record(&self, client: &str, kind: EventKind) {
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Event log mutex poisoned - recovering");
                poisoned.into_inner()
            }
        };

        let seq = events.len() as u64;
        tracing::info!(client, seq, event = kind.as_str(), "{}", kind.describe());
        events.push(ShopEvent {
            seq,
            client: client.to_string(),
            kind,
            elapsed: self.created_at.elapsed(),
        });
    }

    pub fn snapshot(&self) -> Vec<ShopEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.snapshot().iter().filter(|e| e.kind == kind).count()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
