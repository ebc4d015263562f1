//! Simulated server with an admission queue, processing slots and a cache.
//!
//! Each [`Server`] advances by one tick at a time. A tick first admits queued
//! requests into free slots, then releases every slot whose completion tick
//! has been reached, inserting the released keys into the server's cache.

use crate::cache::{CacheStats, ItemCache};
use crate::error::SimError;
use crate::request::Request;
use farmsim_dispatch::ServerLoad;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::error;

/// Service-time model shared by all servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModel {
    /// Base service time of a cache hit, in ticks.
    pub cached_ticks: u64,
    /// Base service time of a cache miss, in ticks.
    pub uncached_ticks: u64,
}

impl ServiceModel {
    /// Service time for a request admitted while `busy` other slots out of
    /// `capacity` are occupied.
    ///
    /// Once more than half of the slots are busy, every extra busy slot adds
    /// `base / capacity` ticks (integer division), modelling contention.
    pub fn service_ticks(&self, cached: bool, busy: usize, capacity: usize) -> u64 {
        let base = if cached {
            self.cached_ticks
        } else {
            self.uncached_ticks
        };
        let half = capacity / 2;
        if capacity == 0 || busy <= half {
            return base;
        }
        base + (base / capacity as u64) * (busy - half) as u64
    }
}

impl Default for ServiceModel {
    fn default() -> Self {
        Self {
            cached_ticks: 10,
            uncached_ticks: 100,
        }
    }
}

/// A simulated server.
#[derive(Debug, Clone)]
pub struct Server {
    /// Position of the server in the farm.
    pub id: usize,
    /// FIFO admission queue.
    queue: VecDeque<Request>,
    /// Maximum queue depth; arrivals beyond it are dropped.
    max_queue_depth: usize,
    /// Processing slots; `None` is a free slot.
    slots: Vec<Option<Request>>,
    /// Number of occupied slots.
    slots_in_use: usize,
    /// Items completed recently on this server.
    pub cache: ItemCache,
    service: ServiceModel,
    // --- Counters ---
    /// Requests completed since start.
    pub total_served: u64,
    /// Arrivals dropped because the queue was full.
    pub total_dropped: u64,
    /// Slot-ticks spent serving completed requests.
    pub busy_ticks: u64,
}

impl Server {
    pub fn new(
        id: usize,
        slots: usize,
        max_queue_depth: usize,
        cache_capacity: usize,
        service: ServiceModel,
    ) -> Self {
        Self {
            id,
            queue: VecDeque::with_capacity(max_queue_depth.min(64)),
            max_queue_depth,
            slots: vec![None; slots],
            slots_in_use: 0,
            cache: ItemCache::new(cache_capacity),
            service,
            total_served: 0,
            total_dropped: 0,
            busy_ticks: 0,
        }
    }

    /// Whether the queue has room for another request.
    pub fn can_accept(&self) -> bool {
        self.queue.len() < self.max_queue_depth
    }

    /// Append a request to the queue. Returns false, dropping the request,
    /// if the queue is full.
    pub fn enqueue(&mut self, request: Request) -> bool {
        if !self.can_accept() {
            self.total_dropped += 1;
            return false;
        }
        self.queue.push_back(request);
        true
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn slots_in_use(&self) -> usize {
        self.slots_in_use
    }

    pub fn slot_capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max_queue_depth(&self) -> usize {
        self.max_queue_depth
    }

    /// Queued plus in-flight requests.
    pub fn outstanding(&self) -> usize {
        self.queue.len() + self.slots_in_use
    }

    /// Requests currently occupying slots, in slot order.
    pub fn in_flight(&self) -> impl Iterator<Item = &Request> {
        self.slots.iter().flatten()
    }

    /// Advance this server to tick `now`.
    ///
    /// Admits queued requests into free slots first, then releases every
    /// request whose completion tick is at or before `now`. The released
    /// requests are returned.
    pub fn tick(&mut self, now: u64) -> Result<Vec<Request>, SimError> {
        while self.slots_in_use < self.slots.len() {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.admit(request, now)?;
        }
        Ok(self.release_due(now))
    }

    /// Place `request` into the first free slot.
    fn admit(&mut self, mut request: Request, now: u64) -> Result<(), SimError> {
        let Some(index) = self.slots.iter().position(Option::is_none) else {
            error!(
                server = self.id,
                slots_in_use = self.slots_in_use,
                capacity = self.slots.len(),
                "no free slot although the slot count says one exists"
            );
            return Err(SimError::InvariantViolation {
                server: self.id,
                detail: format!(
                    "no free slot with {} of {} slots in use",
                    self.slots_in_use,
                    self.slots.len()
                ),
            });
        };

        request.accepted = now;
        request.cached = self.cache.lookup(request.item);
        request.completed = now
            + self
                .service
                .service_ticks(request.cached, self.slots_in_use, self.slots.len());

        self.slots[index] = Some(request);
        self.slots_in_use += 1;
        Ok(())
    }

    /// Free every slot whose request completes at or before `now`.
    fn release_due(&mut self, now: u64) -> Vec<Request> {
        let mut done = Vec::new();
        for slot in self.slots.iter_mut() {
            if let Some(request) = slot.filter(|r| r.completed <= now) {
                *slot = None;
                self.cache.insert(request.item);
                self.busy_ticks += request.service_time();
                done.push(request);
            }
        }
        self.slots_in_use -= done.len();
        self.total_served += done.len() as u64;
        done
    }

    /// Verify the slot and queue bookkeeping.
    pub fn check_invariants(&self) -> Result<(), SimError> {
        let occupied = self.slots.iter().filter(|s| s.is_some()).count();
        let detail = if occupied != self.slots_in_use {
            Some(format!(
                "slot count {} disagrees with {} occupied slots",
                self.slots_in_use, occupied
            ))
        } else if self.slots_in_use > self.slots.len() {
            Some(format!(
                "{} slots in use exceeds capacity {}",
                self.slots_in_use,
                self.slots.len()
            ))
        } else if self.queue.len() > self.max_queue_depth {
            Some(format!(
                "queue depth {} exceeds maximum {}",
                self.queue.len(),
                self.max_queue_depth
            ))
        } else {
            None
        };

        match detail {
            Some(detail) => {
                error!(server = self.id, %detail, "server invariant violated");
                Err(SimError::InvariantViolation {
                    server: self.id,
                    detail,
                })
            }
            None => Ok(()),
        }
    }

    /// Read-only load view for dispatch policies.
    pub fn load(&self) -> ServerLoad {
        ServerLoad {
            id: self.id,
            queue_depth: self.queue.len(),
            slots_in_use: self.slots_in_use,
        }
    }

    /// End-of-run summary of this server.
    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            id: self.id,
            served: self.total_served,
            dropped: self.total_dropped,
            busy_ticks: self.busy_ticks,
            queue_depth: self.queue.len(),
            slots_in_use: self.slots_in_use,
            cache: self.cache.stats(),
        }
    }
}

/// Per-server totals reported at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: usize,
    pub served: u64,
    pub dropped: u64,
    pub busy_ticks: u64,
    pub queue_depth: usize,
    pub slots_in_use: usize,
    pub cache: CacheStats,
}
