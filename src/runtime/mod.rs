//! The scheduling fabric: services wired into a directed pub/sub graph and
//! driven through synchronized broadcast/listen cycles.

mod link;
mod service;

pub use link::{Broadcaster, Listener, Mailbox};
pub use service::{
    ActuatorService, ClusterService, CompositionService, FailurePolicy, LearnerService,
    MemoryService, OperatorService, SensorService, Service, PORT_A, PORT_ASSOCIATIVE, PORT_B,
    PORT_MAIN,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::error::EngineError;

#[derive(Debug, Clone)]
struct WireRequest {
    source: String,
    target: String,
    port: String,
}

/// The top-level scheduler: owns every service and drives them through
/// two-phase cycles.
///
/// Within a cycle the broadcast phase runs to completion across all services
/// before any service listens, and the listen phase drains completely before
/// the next cycle begins; both fan-outs are rejoined at a barrier. Sibling
/// services within a phase run in no particular order, so everything they
/// exchange composes commutatively.
///
/// Wiring changes are buffered and committed only on the cycle boundary, so
/// an in-flight cycle never observes a half-applied topology.
#[derive(Default)]
pub struct Architecture {
    services: Vec<Box<dyn Service>>,
    pending: Vec<WireRequest>,
    cycles: u64,
}

impl Architecture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its unique name.
    pub fn add_service(&mut self, service: impl Service + 'static) -> Result<(), EngineError> {
        if self.index_of(service.name()).is_some() {
            return Err(EngineError::DuplicateService(service.name().to_string()));
        }
        self.services.push(Box::new(service));
        Ok(())
    }

    /// Deregister and return a service. Pending wire requests naming it are
    /// dropped with a warning when they commit.
    pub fn remove_service(&mut self, name: &str) -> Option<Box<dyn Service>> {
        let index = self.index_of(name)?;
        Some(self.services.remove(index))
    }

    pub fn service(&self, name: &str) -> Option<&dyn Service> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Request that `target`'s `port` listen to `source`'s broadcasts.
    ///
    /// The request is validated now but committed only at the next cycle
    /// boundary; an in-flight cycle always completes on the old topology.
    /// Rebinding a port that is already bound revokes its old binding.
    pub fn connect(&mut self, source: &str, target: &str, port: &str) -> Result<(), EngineError> {
        if self.index_of(source).is_none() {
            return Err(EngineError::UnknownService(source.to_string()));
        }
        let Some(target_index) = self.index_of(target) else {
            return Err(EngineError::UnknownService(target.to_string()));
        };
        if self.services[target_index].listener_mut(port).is_none() {
            return Err(EngineError::UnknownPort {
                service: target.to_string(),
                port: port.to_string(),
            });
        }
        self.pending.push(WireRequest {
            source: source.to_string(),
            target: target.to_string(),
            port: port.to_string(),
        });
        Ok(())
    }

    /// Run one full broadcast/listen cycle.
    pub fn cycle(&mut self) {
        self.commit_rewires();

        self.services.par_iter_mut().for_each(|service| {
            service.broadcast();
        });
        self.services.par_iter_mut().for_each(|service| {
            service.listen();
        });

        self.cycles += 1;
        trace!(cycle = self.cycles, "cycle complete");
    }

    pub fn run_cycles(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.cycle();
        }
    }

    /// Cycle until `stop` is raised. The flag is honored only between cycles;
    /// an in-flight cycle always drains.
    pub fn run(&mut self, stop: &AtomicBool, delay: Duration) {
        while !stop.load(Ordering::Relaxed) {
            self.cycle();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        debug!(cycles = self.cycles, "architecture stopped");
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.services.iter().position(|s| s.name() == name)
    }

    fn commit_rewires(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = core::mem::take(&mut self.pending);
        for request in pending {
            // Services named at request time can have been removed since.
            let Some(dst) = self.index_of(&request.target) else {
                warn!(service = %request.target, "dropping wire request: target gone");
                continue;
            };
            let Some(listener) = self.services[dst].listener_mut(&request.port) else {
                warn!(service = %request.target, port = %request.port,
                    "dropping wire request: port gone");
                continue;
            };
            let mailbox = listener.rebind();
            let Some(src) = self.index_of(&request.source) else {
                warn!(service = %request.source, "dropping wire request: source gone");
                continue;
            };
            self.services[src].broadcaster_mut().register(mailbox);
            debug!(from = %request.source, to = %request.target,
                port = %request.port, "binding committed");
        }
    }
}
