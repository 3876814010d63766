use std::sync::{Arc, Mutex, MutexGuard};

use crate::signal::Signal;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned slot only means a sibling task panicked mid-write; the
    // stored signal is still a whole value, so keep going.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct Slot {
    latest: Option<Signal>,
    revoked: bool,
}

/// The delivery cell shared between one broadcaster and one listener.
///
/// Written only during the broadcast phase, drained only during the listen
/// phase; the global phase barrier keeps the two sides from ever touching it
/// at the same time.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    slot: Arc<Mutex<Slot>>,
}

impl Mailbox {
    /// Store the latest signal. Returns false when the binding has been
    /// revoked and the broadcaster should forget this sink.
    fn deliver(&self, signal: &Signal) -> bool {
        let mut slot = lock(&self.slot);
        if slot.revoked {
            return false;
        }
        slot.latest = Some(signal.clone());
        true
    }

    fn take(&self) -> Option<Signal> {
        lock(&self.slot).latest.take()
    }

    fn revoke(&self) {
        lock(&self.slot).revoked = true;
    }
}

/// The publish side of a binding. Owned by a service; holds one delivery
/// cell per listener currently bound to it.
#[derive(Debug, Default)]
pub struct Broadcaster {
    sinks: Vec<Mailbox>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mailbox: Mailbox) {
        self.sinks.push(mailbox);
    }

    /// Publish the signal to every live sink, dropping revoked ones on the
    /// way through.
    pub fn publish(&mut self, signal: &Signal) {
        self.sinks.retain(|sink| sink.deliver(signal));
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// The receive side of a binding: one buffered latest-signal value.
///
/// A listener is bound to at most one broadcaster at a time. Rebinding hands
/// out a fresh mailbox and revokes the old one, so a stale broadcaster's
/// publishes stop reaching the listener no matter when it drops the sink.
#[derive(Debug, Default)]
pub struct Listener {
    mailbox: Mailbox,
    held: Signal,
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new binding: revoke the current mailbox and hand out a fresh
    /// one for the new broadcaster to register.
    pub fn rebind(&mut self) -> Mailbox {
        self.mailbox.revoke();
        self.mailbox = Mailbox::default();
        self.mailbox.clone()
    }

    /// Drain the mailbox into the held value. A quiet or unbound mailbox
    /// leaves the previously held value in place.
    pub fn refresh(&mut self) {
        if let Some(signal) = self.mailbox.take() {
            self.held = signal;
        }
    }

    /// The latest drained value. An unbound listener yields its last-held,
    /// possibly empty, signal; reading is never a failure.
    pub fn read(&self) -> &Signal {
        &self.held
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
    fn unbound_listener_reads_empty_without_failing() {
        let mut listener = Listener::new();
        listener.refresh();
        assert!(listener.read().is_empty());
    }

    #[test]
    fn publish_then_refresh_delivers_latest() {
        let mut broadcaster = Broadcaster::new();
        let mut listener = Listener::new();
        broadcaster.register(listener.rebind());

        broadcaster.publish(&pulse(1));
        broadcaster.publish(&pulse(2));
        listener.refresh();
        assert_eq!(listener.read().get(Address::new(2, 0)), 1);
        assert_eq!(listener.read().get(Address::new(1, 0)), 0);
    }

    #[test]
    fn listener_holds_last_value_when_broadcaster_goes_quiet() {
        let mut broadcaster = Broadcaster::new();
        let mut listener = Listener::new();
        broadcaster.register(listener.rebind());

        broadcaster.publish(&pulse(1));
        listener.refresh();
        listener.refresh();
        assert_eq!(listener.read().get(Address::new(1, 0)), 1);
    }

    #[test]
    fn rebinding_revokes_the_old_broadcaster() {
        let mut old = Broadcaster::new();
        let mut new = Broadcaster::new();
        let mut listener = Listener::new();

        old.register(listener.rebind());
        new.register(listener.rebind());

        old.publish(&pulse(1));
        new.publish(&pulse(2));
        listener.refresh();
        assert_eq!(listener.read().get(Address::new(2, 0)), 1);
        assert_eq!(listener.read().get(Address::new(1, 0)), 0);

        // The revoked sink is dropped the next time the old side publishes.
        assert_eq!(old.sink_count(), 1);
        old.publish(&pulse(3));
        assert_eq!(old.sink_count(), 0);
    }

    #[test]
    fn one_broadcaster_fans_out_to_many_listeners() {
        let mut broadcaster = Broadcaster::new();
        let mut listeners: Vec<Listener> = (0..4).map(|_| Listener::new()).collect();
        for listener in &mut listeners {
            broadcaster.register(listener.rebind());
        }

        broadcaster.publish(&pulse(7));
        for listener in &mut listeners {
            listener.refresh();
            assert_eq!(listener.read().get(Address::new(7, 0)), 1);
        }
    }
}
