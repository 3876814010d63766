//! Wire form for signals: a named collection of (x, y, value) triples.
//!
//! Zero-valued triples are never emitted, and decoding reads 0 for any
//! address absent from the triples, so a signal round-trips exactly. Triples
//! are emitted in stable (x, y) order.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::signal::{Address, Signal};

/// One feature line on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub x: i32,
    pub y: i32,
    pub value: i32,
}

/// A signal on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub features: Vec<FeatureRecord>,
}

impl SignalRecord {
    pub fn into_signal(self) -> Signal {
        let mut signal = Signal::new(self.id);
        for feature in self.features {
            signal.set(Address::new(feature.x, feature.y), feature.value);
        }
        signal
    }
}

impl From<&Signal> for SignalRecord {
    fn from(signal: &Signal) -> Self {
        let features = signal
            .sorted()
            .into_iter()
            .map(|(address, value)| FeatureRecord {
                x: address.x,
                y: address.y,
                value,
            })
            .collect();
        Self {
            id: signal.id().to_string(),
            features,
        }
    }
}

impl From<SignalRecord> for Signal {
    fn from(record: SignalRecord) -> Self {
        record.into_signal()
    }
}

/// A series of signals on the wire, as produced by a sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSeriesRecord {
    pub id: String,
    pub signals: Vec<SignalRecord>,
}

impl SignalSeriesRecord {
    pub fn from_signals(id: impl Into<String>, signals: &[Signal]) -> Self {
        Self {
            id: id.into(),
            signals: signals.iter().map(SignalRecord::from).collect(),
        }
    }

    pub fn into_signals(self) -> Vec<Signal> {
        self.signals
            .into_iter()
            .map(SignalRecord::into_signal)
            .collect()
    }
}

pub fn to_json(signal: &Signal) -> Result<String, EngineError> {
    Ok(serde_json::to_string(&SignalRecord::from(signal))?)
}

pub fn from_json(json: &str) -> Result<Signal, EngineError> {
    let record: SignalRecord = serde_json::from_str(json)?;
    Ok(record.into_signal())
}

pub fn series_to_json(id: &str, signals: &[Signal]) -> Result<String, EngineError> {
    Ok(serde_json::to_string(&SignalSeriesRecord::from_signals(
        id, signals,
    ))?)
}

pub fn series_from_json(json: &str) -> Result<Vec<Signal>, EngineError> {
    let record: SignalSeriesRecord = serde_json::from_str(json)?;
    Ok(record.into_signals())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(id: &str, lines: &[((i32, i32), i32)]) -> Signal {
        let mut s = Signal::new(id);
        for ((x, y), v) in lines {
            s.set(Address::new(*x, *y), *v);
        }
        s
    }

    #[test]
    fn round_trip_preserves_every_line() {
        let original = signal("vision", &[((0, 0), 3), ((7, 2), -1), ((1, 5), 9)]);

        let decoded = from_json(&to_json(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
        // Every other address still reads zero.
        assert_eq!(decoded.get(Address::new(3, 3)), 0);
    }

    #[test]
    fn encoding_is_stable_ordered() {
        let a = signal("s", &[((2, 0), 1), ((0, 0), 1), ((1, 0), 1)]);
        let record = SignalRecord::from(&a);
        let xs: Vec<i32> = record.features.iter().map(|f| f.x).collect();
        assert_eq!(xs, vec![0, 1, 2]);

        // Two equal signals encode to the same bytes regardless of
        // insertion order.
        let b = signal("s", &[((1, 0), 1), ((2, 0), 1), ((0, 0), 1)]);
        assert_eq!(to_json(&a).unwrap(), to_json(&b).unwrap());
    }

    #[test]
    fn zero_triples_are_dropped_on_decode() {
        let record = SignalRecord {
            id: "s".to_string(),
            features: vec![
                FeatureRecord { x: 0, y: 0, value: 2 },
                FeatureRecord { x: 1, y: 0, value: 0 },
            ],
        };
        let signal = record.into_signal();
        assert_eq!(signal.len(), 1);
        assert_eq!(signal.get(Address::new(1, 0)), 0);
    }

    #[test]
    fn series_round_trip() {
        let series = vec![
            signal("step0", &[((0, 0), 1)]),
            signal("step1", &[((1, 0), 2)]),
        ];
        let json = series_to_json("walk", &series).unwrap();
        let decoded = series_from_json(&json).unwrap();
        assert_eq!(decoded, series);
    }
}
