//! barbershop: a bounded waiting area in front of a single exclusive server.
//!
//! Clients try the [`AdmissionGate`] without waiting; admitted clients queue
//! for the [`ServiceCounter`], which wakes on demand and goes back to sleep once
//! the [`CompletionTracker`] reports every expected client done.

mod client;
mod delay;
mod tracker;

pub mod config;
pub mod counter;
pub mod driver;
pub mod events;
pub mod gate;
pub mod shop;

pub use client::Client;
pub use config::{ConfigError, ShopConfig};
pub use counter::{CounterStatus, ServerState, ServiceCounter, ServiceWork, TimedService};
pub use delay::Delay;
pub use driver::{ArrivalPattern, FixedArrivals, RandomArrivals, Simulation, SimulationReport};
pub use events::{EventKind, EventLog, ShopEvent};
pub use gate::{Admission, AdmissionGate, Seat};
pub use shop::{BarberShop, Outcome, ShopSnapshot};
pub use tracker::{CompletionTracker, Progress};
