//! BarberShop: the admission gate and the server behind one handle.
//!
//! A visit is the whole per-client protocol:
//! arrive → try the gate   → (admitted) wait for and receive service
//!                         → (rejected) report done and leave

use std::sync::Arc;

use serde::Serialize;

use crate::client::Client;
use crate::counter::{ServerState, ServiceCounter, ServiceWork};
use crate::events::{EventKind, EventLog};
use crate::gate::{Admission, AdmissionGate};

/// How a visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Served,
    Rejected,
}

/// Snapshot of shop state for reports and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopSnapshot {
    pub capacity: usize,
    pub occupied: usize,
    pub peak_occupied: usize,
    pub state: ServerState,
    pub outstanding: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving: Option<String>,
}

impl ShopSnapshot {
    /// All clients reported and the server is asleep.
    pub fn is_closed(&self) -> bool {
        self.outstanding == 0 && self.state == ServerState::Sleeping
    }
}

pub struct BarberShop {
    gate: AdmissionGate,
    counter: ServiceCounter,
    events: Arc<EventLog>,
}

impl BarberShop {
    /// A shop with `seats` waiting seats expecting `expected_clients` visits.
    pub fn new(seats: usize, expected_clients: usize, work: Arc<dyn ServiceWork>) -> Self {
        let events = Arc::new(EventLog::new());
        Self {
            gate: AdmissionGate::new(seats),
            counter: ServiceCounter::new(expected_clients, work, Arc::clone(&events)),
            events,
        }
    }

    /// Run one client's visit to completion.
    pub async fn visit(&self, client: Client) -> Outcome {
        self.events.record(client.name(), EventKind::Arrived);

        match self.gate.try_enter() {
            Admission::Admitted(seat) => {
                self.events.record(client.name(), EventKind::AdmittedWaiting);
                self.counter.serve(client, seat).await;
                Outcome::Served
            }
            Admission::Rejected => {
                self.events.record(client.name(), EventKind::RejectedNoSeats);
                self.counter.report_rejected(client).await;
                Outcome::Rejected
            }
        }
    }

    pub fn snapshot(&self) -> ShopSnapshot {
        let status = self.counter.status();
        ShopSnapshot {
            capacity: self.gate.capacity(),
            occupied: self.gate.occupied(),
            peak_occupied: self.gate.peak_occupied(),
            state: status.state,
            outstanding: status.outstanding,
            serving: status.serving,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn counter(&self) -> &ServiceCounter {
        &self.counter
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::TimedService;
    use crate::delay::Delay;

    fn shop(seats: usize, clients: usize, service_ms: u64) -> Arc<BarberShop> {
        Arc::new(BarberShop::new(
            seats,
            clients,
            Arc::new(TimedService::new(Delay::fixed(service_ms))),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn lone_visit_is_served() {
        let shop = shop(1, 1, 1000);

        let outcome = shop.visit(Client::new("Alice")).await;

        assert_eq!(outcome, Outcome::Served);
        let kinds: Vec<_> = shop.events().snapshot().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::Arrived,
                EventKind::AdmittedWaiting,
                EventKind::ServerWoke,
                EventKind::ServiceStarted,
                EventKind::ServiceFinished,
                EventKind::ServerSlept,
            ]
        );
        assert!(shop.snapshot().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn full_lounge_rejects_immediately() {
        let shop = shop(1, 2, 5000);

        let first = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Alice")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(shop.snapshot().occupied, 1);

        let second = shop.visit(Client::new("Bob")).await;

        assert_eq!(second, Outcome::Rejected);
        assert_eq!(first.await.unwrap(), Outcome::Served);

        let events = shop.events().snapshot();
        let position = |client: &str, kind: EventKind| {
            events
                .iter()
                .position(|e| e.client == client && e.kind == kind)
                .unwrap()
        };
        // Bob is turned away while Alice is still in the chair.
        assert!(
            position("Bob", EventKind::RejectedNoSeats)
                < position("Alice", EventKind::ServiceFinished)
        );
        assert!(shop.snapshot().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_queued_visit_still_lets_server_sleep() {
        let shop = shop(2, 2, 5000);

        let first = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Alice")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Bob")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());
        assert_eq!(first.await.unwrap(), Outcome::Served);

        shop.counter()
            .subscribe()
            .wait_for(|s| s.outstanding == 0)
            .await
            .unwrap();
        let snapshot = shop.snapshot();
        assert!(snapshot.is_closed());
        assert_eq!(snapshot.occupied, 0);
        assert_eq!(shop.events().count(EventKind::ServerSlept), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_rejection_is_still_reported() {
        let shop = shop(1, 2, 5000);

        let first = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Alice")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        // Bob is turned away and waits on the floor to report.
        let second = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Bob")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(shop.events().count(EventKind::RejectedNoSeats), 1);

        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());
        assert_eq!(first.await.unwrap(), Outcome::Served);

        shop.counter()
            .subscribe()
            .wait_for(|s| s.outstanding == 0)
            .await
            .unwrap();
        assert!(shop.snapshot().is_closed());
        assert_eq!(shop.events().count(EventKind::ServerSlept), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_client_in_chair() {
        let shop = shop(2, 1, 3000);

        let task = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.visit(Client::new("Charlie")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        insta::assert_json_snapshot!(shop.snapshot(), @r###"
        {
          "capacity": 2,
          "occupied": 1,
          "peak_occupied": 1,
          "state": "active",
          "outstanding": 1,
          "serving": "Charlie"
        }
        "###);

        task.await.unwrap();
        insta::assert_json_snapshot!(shop.snapshot(), @r###"
        {
          "capacity": 2,
          "occupied": 0,
          "peak_occupied": 1,
          "state": "sleeping",
          "outstanding": 0
        }
        "###);
    }
}
