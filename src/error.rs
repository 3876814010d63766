use thiserror::Error;

/// Failures produced by boundary collaborators (sensors, actuators).
/// The core never inspects these beyond reporting them.
pub type BoundaryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every explicit failure the engine can surface.
///
/// Pure signal/synapse arithmetic never errors; only wiring requests and
/// boundary collaborators can fail, and those failures stay owned by the
/// calling service rather than crossing task boundaries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown service `{0}`")]
    UnknownService(String),

    #[error("service `{service}` has no port `{port}`")]
    UnknownPort { service: String, port: String },

    #[error("a service named `{0}` is already registered")]
    DuplicateService(String),

    #[error("sensor `{id}` failed")]
    Sensor {
        id: String,
        #[source]
        source: BoundaryError,
    },

    #[error("actuator `{id}` failed")]
    Actuator {
        id: String,
        #[source]
        source: BoundaryError,
    },

    #[error("signal codec failure")]
    Codec(#[from] serde_json::Error),
}
