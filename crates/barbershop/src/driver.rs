//! Arrival driver - feeds clients into the shop and waits for every visit.
//!
//! Flow:
//! 1. Wait the next inter-arrival gap
//! 2. Spawn one task per client running `BarberShop::visit`
//! 3. Join all tasks and tally outcomes into a `SimulationReport`

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::Client;
use crate::config::{ConfigError, ShopConfig};
use crate::counter::{ServerState, ServiceWork, TimedService};
use crate::delay::Delay;
use crate::events::ShopEvent;
use crate::shop::{BarberShop, Outcome};

/// Source of inter-arrival gaps.
pub trait ArrivalPattern: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Same gap before every arrival.
pub struct FixedArrivals(pub Duration);

impl ArrivalPattern for FixedArrivals {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

/// Gaps sampled from a [`Delay`].
pub struct RandomArrivals {
    delay: Delay,
    rng: StdRng,
}

impl RandomArrivals {
    pub fn new(delay: Delay) -> Self {
        Self {
            delay,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(delay: Delay, seed: u64) -> Self {
        Self {
            delay,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ArrivalPattern for RandomArrivals {
    fn next_delay(&mut self) -> Duration {
        self.delay.sample(&mut self.rng)
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub seats: usize,
    pub clients: usize,
    pub served: usize,
    pub rejected: usize,
    /// Visits whose task panicked.
    pub aborted: usize,
    pub peak_occupied: usize,
    pub final_state: ServerState,
    pub events: Vec<ShopEvent>,
}

impl SimulationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} clients: {} served, {} rejected, {} aborted (seats={}, peak={}, barber {})",
            self.clients,
            self.served,
            self.rejected,
            self.aborted,
            self.seats,
            self.peak_occupied,
            match self.final_state {
                ServerState::Sleeping => "asleep",
                ServerState::Active => "awake",
            }
        )
    }
}

/// One run: a shop, the clients that will visit it, and their arrival gaps.
pub struct Simulation {
    shop: Arc<BarberShop>,
    clients: Vec<Client>,
    arrivals: Box<dyn ArrivalPattern>,
}

impl Simulation {
    /// Build a shop sized for `clients`.
    pub fn new(
        seats: usize,
        clients: Vec<Client>,
        work: Arc<dyn ServiceWork>,
        arrivals: Box<dyn ArrivalPattern>,
    ) -> Self {
        let shop = Arc::new(BarberShop::new(seats, clients.len(), work));
        Self {
            shop,
            clients,
            arrivals,
        }
    }

    pub fn from_config(config: &ShopConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let work: Arc<dyn ServiceWork>;
        let arrivals: Box<dyn ArrivalPattern>;
        match config.seed {
            Some(seed) => {
                work = Arc::new(TimedService::with_seed(config.service, seed));
                arrivals = Box::new(RandomArrivals::with_seed(
                    config.arrival,
                    seed.wrapping_add(1),
                ));
            }
            None => {
                work = Arc::new(TimedService::new(config.service));
                arrivals = Box::new(RandomArrivals::new(config.arrival));
            }
        }

        Ok(Self::new(
            config.seats,
            config.build_clients(),
            work,
            arrivals,
        ))
    }

    pub fn shop(&self) -> &Arc<BarberShop> {
        &self.shop
    }

    pub async fn run(self) -> SimulationReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("simulation", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(self, run_id: Uuid) -> SimulationReport {
        let Simulation {
            shop,
            clients,
            mut arrivals,
        } = self;

        let started_at = Utc::now();
        let total = clients.len();
        tracing::info!(seats = shop.gate().capacity(), clients = total, "Shop opens");

        let mut visits = Vec::with_capacity(total);
        for client in clients {
            tokio::time::sleep(arrivals.next_delay()).await;

            let shop = Arc::clone(&shop);
            let name = client.name().to_string();
            let handle = tokio::spawn(async move { shop.visit(client).await }.in_current_span());
            visits.push((name, handle));
        }

        let (names, handles): (Vec<_>, Vec<_>) = visits.into_iter().unzip();
        let results = join_all(handles).await;

        let mut served = 0;
        let mut rejected = 0;
        let mut aborted = 0;
        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(Outcome::Served) => served += 1,
                Ok(Outcome::Rejected) => rejected += 1,
                Err(e) => {
                    tracing::error!(client = %name, error = %e, "Client task failed");
                    aborted += 1;
                }
            }
        }

        let snapshot = shop.snapshot();
        tracing::info!(served, rejected, aborted, "Simulation has ended");

        SimulationReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            seats: snapshot.capacity,
            clients: total,
            served,
            rejected,
            aborted,
            peak_occupied: snapshot.peak_occupied,
            final_state: snapshot.state,
            events: shop.events().snapshot(),
        }
    }
}
