use core::fmt;

use crate::signal::Signal;

/// Decides whether an incoming signal terminates the recorded series.
pub type SequenceThreshold = Box<dyn Fn(&[Signal], &Signal) -> bool + Send>;

/// A simple, non-neuronal operator recording a bounded series of signals.
///
/// Each recorded signal either extends the series or terminates it: the
/// configured thresholding predicate fires (by default, on an empty incoming
/// signal), or the length bound is reached. A terminated series is yielded
/// whole and the buffer resets.
pub struct Sequencer {
    id: String,
    buffer: Vec<Signal>,
    max_len: usize,
    threshold: SequenceThreshold,
}

impl Sequencer {
    pub fn new(id: impl Into<String>, max_len: usize) -> Self {
        Self {
            id: id.into(),
            buffer: Vec::with_capacity(max_len),
            max_len: max_len.max(1),
            threshold: Box::new(|_, incoming| incoming.is_empty()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len.max(1);
    }

    /// Replace the termination predicate. The predicate sees the recorded
    /// series and the incoming signal.
    pub fn set_threshold(&mut self, threshold: SequenceThreshold) {
        self.threshold = threshold;
    }

    /// Record one signal. Returns the completed series when this signal
    /// terminated it, `None` while the series is still building.
    pub fn record(&mut self, main: Signal) -> Option<Vec<Signal>> {
        if (self.threshold)(&self.buffer, &main) {
            let done = core::mem::take(&mut self.buffer);
            return if done.is_empty() { None } else { Some(done) };
        }
        self.buffer.push(main);
        if self.buffer.len() >= self.max_len {
            return Some(core::mem::take(&mut self.buffer));
        }
        None
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("id", &self.id)
            .field("len", &self.buffer.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Address;

    fn pulse(x: i32) -> Signal {
        let mut s = Signal::new("pulse");
        s.set(Address::new(x, 0), 1);
        s
    }

    #[test]
    fn empty_signal_terminates_the_series() {
        let mut seq = Sequencer::new("seq", 8);
        assert!(seq.record(pulse(0)).is_none());
        assert!(seq.record(pulse(1)).is_none());

        let done = seq.record(Signal::new("void")).expect("series should yield");
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].get(Address::new(0, 0)), 1);
        assert!(seq.is_empty());
    }

    #[test]
    fn terminating_an_empty_series_yields_nothing() {
        let mut seq = Sequencer::new("seq", 8);
        assert!(seq.record(Signal::new("void")).is_none());
    }

    #[test]
    fn full_buffer_yields_the_series() {
        let mut seq = Sequencer::new("seq", 3);
        assert!(seq.record(pulse(0)).is_none());
        assert!(seq.record(pulse(1)).is_none());

        let done = seq.record(pulse(2)).expect("series should yield at capacity");
        assert_eq!(done.len(), 3);
        assert!(seq.is_empty());
    }

    #[test]
    fn custom_threshold_controls_termination() {
        let mut seq = Sequencer::new("seq", 8);
        seq.set_threshold(Box::new(|_, incoming| incoming.strength() > 5));

        assert!(seq.record(pulse(0)).is_none());
        let mut spike = Signal::new("spike");
        spike.set(Address::new(9, 0), 9);
        let done = seq.record(spike).expect("spike should terminate");
        assert_eq!(done.len(), 1);
    }
}
