use crate::error::BoundaryError;
use crate::signal::Signal;

/// Anything that can produce one signal per call at the system edge.
///
/// A sensor is the only way raw external data enters the engine; it converts
/// whatever it observes into a sparse signal. A sensor must not block a cycle
/// indefinitely, since a stalled sensor stalls the whole listen barrier.
pub trait Sensor: Send {
    fn id(&self) -> &str;
    fn sense(&mut self) -> Result<Signal, BoundaryError>;
}

/// Anything that can consume one signal per call at the system edge.
/// Failure is returned explicitly, never swallowed.
pub trait Actuator: Send {
    fn id(&self) -> &str;
    fn actuate(&mut self, signal: &Signal) -> Result<(), BoundaryError>;
}

/// A non-neuronal circuit for processing signals in-flight.
pub trait Operator: Send {
    fn execute(&mut self, signal: Signal) -> Signal;
}

/// A sensor backed by a caller-supplied closure.
///
/// Without a processor, sensing yields an empty signal rather than failing,
/// so a half-wired architecture still cycles.
pub struct FunctionalSensor {
    id: String,
    processor: Option<Box<dyn FnMut() -> Result<Signal, BoundaryError> + Send>>,
}

impl FunctionalSensor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            processor: None,
        }
    }

    pub fn with_processor(
        id: impl Into<String>,
        processor: impl FnMut() -> Result<Signal, BoundaryError> + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            processor: Some(Box::new(processor)),
        }
    }

    pub fn set_processor(
        &mut self,
        processor: impl FnMut() -> Result<Signal, BoundaryError> + Send + 'static,
    ) {
        self.processor = Some(Box::new(processor));
    }
}

impl Sensor for FunctionalSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sense(&mut self) -> Result<Signal, BoundaryError> {
        match &mut self.processor {
            Some(processor) => processor(),
            None => Ok(Signal::new(self.id.clone())),
        }
    }
}

/// An actuator backed by a caller-supplied closure.
pub struct FunctionalActuator {
    id: String,
    consumer: Box<dyn FnMut(&Signal) -> Result<(), BoundaryError> + Send>,
}

impl FunctionalActuator {
    pub fn new(
        id: impl Into<String>,
        consumer: impl FnMut(&Signal) -> Result<(), BoundaryError> + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            consumer: Box::new(consumer),
        }
    }
}

impl Actuator for FunctionalActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn actuate(&mut self, signal: &Signal) -> Result<(), BoundaryError> {
        (self.consumer)(signal)
    }
}

/// Winner-take-all as an in-flight operator.
#[derive(Debug, Clone, Copy)]
pub struct WinnerTakeAll {
    pub gap: i32,
}

impl Operator for WinnerTakeAll {
    fn execute(&mut self, mut signal: Signal) -> Signal {
        signal.winner_take_all(self.gap);
        signal
    }
}

/// Decay as an in-flight operator.
#[derive(Debug, Clone, Copy)]
pub struct Decay {
    pub factor: i32,
}

impl Operator for Decay {
    fn execute(&mut self, mut signal: Signal) -> Signal {
        signal.decay(self.factor);
        signal
    }
}

/// Coordinate shift as an in-flight operator; the building block for
/// short-term sequence buffers.
#[derive(Debug, Clone, Copy)]
pub struct ShiftX {
    pub step: i32,
}

impl Operator for ShiftX {
    fn execute(&mut self, mut signal: Signal) -> Signal {
        signal.shift_x(self.step);
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Address;

    #[test]
    fn functional_sensor_without_processor_yields_empty() {
        let mut sensor = FunctionalSensor::new("bare");
        let signal = sensor.sense().unwrap();
        assert!(signal.is_empty());
        assert_eq!(signal.id(), "bare");
    }

    #[test]
    fn functional_sensor_runs_its_processor() {
        let mut count = 0;
        let mut sensor = FunctionalSensor::with_processor("counter", move || {
            count += 1;
            let mut s = Signal::new("counter");
            s.set(Address::new(count, 0), 1);
            Ok(s)
        });

        let first = sensor.sense().unwrap();
        let second = sensor.sense().unwrap();
        assert_eq!(first.get(Address::new(1, 0)), 1);
        assert_eq!(second.get(Address::new(2, 0)), 1);
    }

    #[test]
    fn sensor_failure_is_an_explicit_result() {
        let mut sensor =
            FunctionalSensor::with_processor("broken", || Err("camera offline".into()));
        assert!(sensor.sense().is_err());
    }

    #[test]
    fn operators_transform_in_flight() {
        let mut s = Signal::new("s");
        s.set(Address::new(0, 0), 3);
        s.set(Address::new(1, 0), 1);

        let sharpened = WinnerTakeAll { gap: 0 }.execute(s.clone());
        assert_eq!(sharpened.len(), 1);

        let shifted = ShiftX { step: 4 }.execute(s.clone());
        assert_eq!(shifted.get(Address::new(4, 0)), 3);

        let decayed = Decay { factor: 1 }.execute(s);
        assert_eq!(decayed.get(Address::new(0, 0)), 2);
        assert_eq!(decayed.get(Address::new(1, 0)), 1);
    }
}
