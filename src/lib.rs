//! # qualia
//!
//! An experimental associative-memory engine. Knowledge lives in sparse
//! integer patterns ("signals") and is learned by competing bipolar Hebbian
//! micro-units: synapses aggregate into neurons, neurons into groups, groups
//! into clusters selected by winner-take-all competition. A scheduling
//! fabric runs many such learners concurrently, synchronized through
//! two-phase broadcast/listen cycles that tolerate live rewiring.
//!
//! ## Quick start
//!
//! ```
//! use qualia::prelude::*;
//!
//! // Associate a "word" pattern with a "color" line.
//! let mut group = Group::new("color-word", GroupConfig::default().with_correlation_threshold(3));
//!
//! let mut color = Signal::new("color");
//! color.set(Address::new(0, 0), 1);
//! let mut word = Signal::new("word");
//! word.set(Address::new(3, 1), 1);
//!
//! for _ in 0..4 {
//!     group.evoke(&color, &word);
//! }
//!
//! // The learned line now evokes from the word alone.
//! let recalled = group.evoke(&Signal::new("cue"), &word);
//! assert_eq!(recalled.get(Address::new(0, 0)), 1);
//! ```
//!
//! ## Modules
//!
//! - [`signal`]: sparse patterns and their combinators
//! - [`learn`]: synapses, neurons, groups, auto-associative memory
//! - [`cluster`]: competing groups over distinct associative sources
//! - [`sequence`]: bounded recording of signal series
//! - [`runtime`]: the broadcast/listen scheduling fabric
//! - [`io`]: sensor/actuator/operator contracts at the system edge
//! - [`codec`]: the (x, y, value) wire form for signals

pub mod cluster;
pub mod codec;
pub mod error;
pub mod io;
pub mod learn;
pub mod runtime;
pub mod sequence;
pub mod signal;

pub mod prelude {
    pub use crate::cluster::Cluster;
    pub use crate::error::{BoundaryError, EngineError};
    pub use crate::io::{Actuator, FunctionalActuator, FunctionalSensor, Operator, Sensor};
    pub use crate::learn::{
        AdvancedGroup, AutoAssociativeMemory, Group, GroupConfig, Learner, Neuron, Synapse,
    };
    pub use crate::runtime::{
        ActuatorService, Architecture, ClusterService, CompositionService, FailurePolicy,
        LearnerService, MemoryService, OperatorService, SensorService, Service,
    };
    pub use crate::sequence::Sequencer;
    pub use crate::signal::{Address, Signal};
}
