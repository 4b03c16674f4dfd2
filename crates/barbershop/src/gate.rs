//! Admission gate for the bounded waiting area.
//!
//! Admission is a non-blocking check: a client either takes a seat immediately
//! or is turned away for good. There is no queue for seats that free up later.
//!
//! A granted seat is represented by a [`Seat`] permit:
//! - `Seat::release()` returns it explicitly
//! - dropping a `Seat` returns it as well, so an aborted task never leaks one

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Seats {
    capacity: usize,
    available: AtomicUsize,
    peak_occupied: AtomicUsize,
}

impl Seats {
    fn give_back(&self) {
        let before = self.available.fetch_add(1, Ordering::AcqRel);
        debug_assert!(before < self.capacity, "seat released past capacity");
        if before >= self.capacity {
            tracing::error!(
                capacity = self.capacity,
                "Bug: seat released while waiting area already empty"
            );
        }
    }
}

/// Result of an admission attempt.
#[must_use = "an admitted seat is released as soon as it is dropped"]
pub enum Admission {
    /// A seat was taken and must be held until service completes.
    Admitted(Seat),
    /// No seat was free at the instant of the attempt.
    Rejected,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// A held waiting-area seat. Returns to the gate on release or drop.
#[must_use = "dropping a Seat releases it immediately"]
pub struct Seat {
    seats: Option<Arc<Seats>>,
}

impl Seat {
    /// Give the seat back to the waiting area.
    pub fn release(mut self) {
        if let Some(seats) = self.seats.take() {
            seats.give_back();
        }
    }
}

impl Drop for Seat {
    fn drop(&mut self) {
        if let Some(seats) = self.seats.take() {
            tracing::debug!("Seat dropped without explicit release - returning to gate");
            seats.give_back();
        }
    }
}

/// Tracks free seats in the waiting area and grants or denies entry atomically.
#[derive(Clone)]
pub struct AdmissionGate {
    seats: Arc<Seats>,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: Arc::new(Seats {
                capacity,
                available: AtomicUsize::new(capacity),
                peak_occupied: AtomicUsize::new(0),
            }),
        }
    }

    /// Try to take a seat without waiting.
    pub fn try_enter(&self) -> Admission {
        let mut current = self.seats.available.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Admission::Rejected;
            }
            match self.seats.available.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let occupied = self.seats.capacity - (current - 1);
        self.seats
            .peak_occupied
            .fetch_max(occupied, Ordering::AcqRel);

        Admission::Admitted(Seat {
            seats: Some(Arc::clone(&self.seats)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.seats.capacity
    }

    pub fn available(&self) -> usize {
        self.seats.available.load(Ordering::Acquire)
    }

    pub fn occupied(&self) -> usize {
        self.seats.capacity - self.available()
    }

    /// Highest occupancy observed since construction.
    pub fn peak_occupied(&self) -> usize {
        self.seats.peak_occupied.load(Ordering::Acquire)
    }
}
