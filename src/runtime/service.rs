use std::collections::BTreeMap;

use tracing::warn;

use crate::cluster::Cluster;
use crate::error::EngineError;
use crate::io::{Actuator, Operator, Sensor};
use crate::learn::{AutoAssociativeMemory, Learner};
use crate::runtime::link::{Broadcaster, Listener};
use crate::signal::Signal;

/// The `main` input port carried by most services.
pub const PORT_MAIN: &str = "main";
/// The associative input port of a learner service.
pub const PORT_ASSOCIATIVE: &str = "associative";
/// The two inputs of a composition service.
pub const PORT_A: &str = "a";
pub const PORT_B: &str = "b";

/// What a boundary service does with its loop after a sensor or actuator
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log, keep the last good value, keep cycling.
    #[default]
    HoldLast,
    /// Log and stop participating in further listen phases.
    Halt,
}

/// A schedulable unit of the runtime.
///
/// A service works in two phases per cycle: first it broadcasts its currently
/// held output to every listener bound to its broadcaster, then it listens —
/// draining its own listeners and recomputing its output. The cycle driver
/// guarantees the broadcast phase has fully completed across all services
/// before any service listens.
pub trait Service: Send {
    fn name(&self) -> &str;

    /// Publish the currently held output.
    fn broadcast(&mut self);

    /// Drain listeners and recompute the held output. This is where group and
    /// cluster evocation actually runs.
    fn listen(&mut self);

    /// The held output of the latest listen phase.
    fn pattern(&self) -> &Signal;

    fn broadcaster_mut(&mut self) -> &mut Broadcaster;

    /// The named input port, when the service has one.
    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener>;

    /// Whether the service still takes part in listen phases. Boundary
    /// services may deactivate themselves after a failure.
    fn active(&self) -> bool {
        true
    }
}

/// A service wrapping any [`Learner`]; ports `main` and `associative`.
pub struct LearnerService {
    name: String,
    learner: Box<dyn Learner>,
    pattern: Signal,
    broadcaster: Broadcaster,
    main: Listener,
    associative: Listener,
}

impl LearnerService {
    pub fn new(name: impl Into<String>, learner: Box<dyn Learner>) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            learner,
            broadcaster: Broadcaster::new(),
            main: Listener::new(),
            associative: Listener::new(),
        }
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }
}

impl Service for LearnerService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        self.main.refresh();
        self.associative.refresh();
        self.pattern = self.learner.evoke(self.main.read(), self.associative.read());
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        match port {
            PORT_MAIN => Some(&mut self.main),
            PORT_ASSOCIATIVE => Some(&mut self.associative),
            _ => None,
        }
    }
}

/// A service wrapping a [`Cluster`]; port `main` plus one named port per
/// associative source.
pub struct ClusterService {
    name: String,
    cluster: Cluster,
    pattern: Signal,
    broadcaster: Broadcaster,
    main: Listener,
    associates: BTreeMap<String, Listener>,
}

impl ClusterService {
    pub fn new(name: impl Into<String>, cluster: Cluster) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            cluster,
            broadcaster: Broadcaster::new(),
            main: Listener::new(),
            associates: BTreeMap::new(),
        }
    }

    /// Declare an associative source; its port name doubles as the cluster's
    /// association id.
    pub fn add_association_port(&mut self, source: impl Into<String>) {
        self.associates.entry(source.into()).or_default();
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }
}

impl Service for ClusterService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        self.main.refresh();
        for listener in self.associates.values_mut() {
            listener.refresh();
        }
        let associates: Vec<(&str, &Signal)> = self
            .associates
            .iter()
            .map(|(source, listener)| (source.as_str(), listener.read()))
            .collect();
        self.pattern = self.cluster.evoke(self.main.read(), &associates);
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        if port == PORT_MAIN {
            return Some(&mut self.main);
        }
        self.associates.get_mut(port)
    }
}

/// A service wrapping an [`AutoAssociativeMemory`]; port `main`.
pub struct MemoryService {
    name: String,
    memory: AutoAssociativeMemory,
    pattern: Signal,
    broadcaster: Broadcaster,
    main: Listener,
}

impl MemoryService {
    pub fn new(name: impl Into<String>, memory: AutoAssociativeMemory) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            memory,
            broadcaster: Broadcaster::new(),
            main: Listener::new(),
        }
    }

    pub fn memory(&self) -> &AutoAssociativeMemory {
        &self.memory
    }
}

impl Service for MemoryService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        self.main.refresh();
        self.pattern = self.memory.evoke(self.main.read());
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        (port == PORT_MAIN).then_some(&mut self.main)
    }
}

/// A service wrapping a [`Sensor`]; no input ports.
pub struct SensorService {
    name: String,
    sensor: Box<dyn Sensor>,
    pattern: Signal,
    broadcaster: Broadcaster,
    policy: FailurePolicy,
    active: bool,
    last_error: Option<EngineError>,
}

impl SensorService {
    pub fn new(name: impl Into<String>, sensor: Box<dyn Sensor>) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            sensor,
            broadcaster: Broadcaster::new(),
            policy: FailurePolicy::default(),
            active: true,
            last_error: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The most recent boundary failure, if any.
    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }
}

impl Service for SensorService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        if !self.active {
            return;
        }
        match self.sensor.sense() {
            Ok(pattern) => self.pattern = pattern,
            Err(source) => {
                // The failure stays owned by this service; siblings in the
                // same cycle never see it.
                warn!(service = %self.name, error = %source, "sensor failed");
                self.last_error = Some(EngineError::Sensor {
                    id: self.sensor.id().to_string(),
                    source,
                });
                if self.policy == FailurePolicy::Halt {
                    self.active = false;
                }
            }
        }
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, _port: &str) -> Option<&mut Listener> {
        None
    }

    fn active(&self) -> bool {
        self.active
    }
}

/// A service wrapping an [`Actuator`]; port `main`. Broadcasts whatever it
/// last delivered, so downstream taps can observe the actuated signal.
pub struct ActuatorService {
    name: String,
    actuator: Box<dyn Actuator>,
    pattern: Signal,
    broadcaster: Broadcaster,
    main: Listener,
    policy: FailurePolicy,
    active: bool,
    last_error: Option<EngineError>,
}

impl ActuatorService {
    pub fn new(name: impl Into<String>, actuator: Box<dyn Actuator>) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            actuator,
            broadcaster: Broadcaster::new(),
            main: Listener::new(),
            policy: FailurePolicy::default(),
            active: true,
            last_error: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }
}

impl Service for ActuatorService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        if !self.active {
            return;
        }
        self.main.refresh();
        let incoming = self.main.read().clone();
        if let Err(source) = self.actuator.actuate(&incoming) {
            warn!(service = %self.name, error = %source, "actuator failed");
            self.last_error = Some(EngineError::Actuator {
                id: self.actuator.id().to_string(),
                source,
            });
            if self.policy == FailurePolicy::Halt {
                self.active = false;
            }
            return;
        }
        self.pattern = incoming;
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        (port == PORT_MAIN).then_some(&mut self.main)
    }

    fn active(&self) -> bool {
        self.active
    }
}

/// A service applying a pure [`Operator`] to its `main` port.
pub struct OperatorService {
    name: String,
    operator: Box<dyn Operator>,
    pattern: Signal,
    broadcaster: Broadcaster,
    main: Listener,
}

impl OperatorService {
    pub fn new(name: impl Into<String>, operator: Box<dyn Operator>) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            operator,
            broadcaster: Broadcaster::new(),
            main: Listener::new(),
        }
    }
}

impl Service for OperatorService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        self.main.refresh();
        self.pattern = self.operator.execute(self.main.read().clone());
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        (port == PORT_MAIN).then_some(&mut self.main)
    }
}

/// A service compositing its `a` and `b` ports into one signal.
pub struct CompositionService {
    name: String,
    pattern: Signal,
    broadcaster: Broadcaster,
    a: Listener,
    b: Listener,
}

impl CompositionService {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            pattern: Signal::new(name.clone()),
            name,
            broadcaster: Broadcaster::new(),
            a: Listener::new(),
            b: Listener::new(),
        }
    }
}

impl Service for CompositionService {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&mut self) {
        self.broadcaster.publish(&self.pattern);
    }

    fn listen(&mut self) {
        self.a.refresh();
        self.b.refresh();
        let mut composed = Signal::new(self.name.clone());
        composed.composite(self.a.read());
        composed.composite(self.b.read());
        self.pattern = composed;
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    fn broadcaster_mut(&mut self) -> &mut Broadcaster {
        &mut self.broadcaster
    }

    fn listener_mut(&mut self, port: &str) -> Option<&mut Listener> {
        match port {
            PORT_A => Some(&mut self.a),
            PORT_B => Some(&mut self.b),
            _ => None,
        }
    }
}
