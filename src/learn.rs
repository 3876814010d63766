use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::signal::{Address, Signal};

/// One bipolar weighted connection; the leaf Hebbian learner.
///
/// The weight is either -1 or +1 and starts at -1. Correlated activity
/// accumulates in `correlation_sum` through +3:-1 incremental steps; once the
/// sum clears the configured threshold the weight locks to +1 and never
/// reverts.
#[derive(Debug, Clone)]
pub struct Synapse {
    correlation_sum: i32,
    weight: i32,
}

impl Synapse {
    pub fn new() -> Self {
        Self {
            correlation_sum: 0,
            weight: -1,
        }
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn correlation_sum(&self) -> i32 {
        self.correlation_sum
    }

    /// The associational product of the incoming strength and the weight.
    /// Pure; evocation never mutates the synapse.
    pub fn evoke(&self, association: i32) -> i32 {
        association * self.weight
    }

    /// One correlative Hebbian step. A locked (+1) weight is never revisited;
    /// an unlocked weight accumulates `4*association*training - association`
    /// and locks once the sum exceeds `threshold`.
    pub fn train(&mut self, training: i32, association: i32, threshold: i32) {
        if self.weight > 0 {
            return;
        }
        self.correlation_sum += 4 * association * training - association;
        if self.correlation_sum > threshold {
            self.weight = 1;
        }
    }
}

impl Default for Synapse {
    fn default() -> Self {
        Self::new()
    }
}

/// A single neuron: a lazily grown map of synapses tested against one
/// associative signal per evocation.
///
/// The neuron fires when the synaptic sum is positive. When it fails to fire
/// in the presence of a training strength (mismatch + novelty), every touched
/// synapse trains itself toward the association.
#[derive(Debug, Clone)]
pub struct Neuron {
    synapses: HashMap<Address, Synapse>,
    axon: i32,
    matched: bool,
    novel: bool,
    learning_enabled: bool,
}

impl Neuron {
    pub fn new() -> Self {
        Self {
            synapses: HashMap::new(),
            axon: 0,
            matched: false,
            novel: false,
            learning_enabled: true,
        }
    }

    /// Test the neuron against `associative` and return the activation sum.
    ///
    /// A synapse is grown for every unseen associative line; a synapse grown
    /// this call sits out this call's sum. Training runs only when `learning`
    /// and the neuron's own switch are both on, the sum failed to go positive,
    /// and a training strength is present.
    pub fn evoke(&mut self, training: i32, associative: &Signal, threshold: i32, learning: bool) -> i32 {
        let mut sum = 0;
        for (address, strength) in associative.iter() {
            match self.synapses.get(&address) {
                Some(synapse) => sum += synapse.evoke(strength),
                None => {
                    self.synapses.insert(address, Synapse::new());
                }
            }
        }

        self.novel = false;
        if learning && self.learning_enabled && sum <= 0 && training != 0 {
            self.novel = true;
            for (address, strength) in associative.iter() {
                if let Some(synapse) = self.synapses.get_mut(&address) {
                    synapse.train(training, strength, threshold);
                }
            }
        }

        // Match when the firing state and the training strength agree in
        // polarity; zero counts as non-positive on both sides.
        self.matched = (sum > 0) == (training > 0);
        self.axon = sum;
        sum
    }

    /// The activation produced by the latest evocation.
    pub fn axon(&self) -> i32 {
        self.axon
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn novel(&self) -> bool {
        self.novel
    }

    pub fn set_learning(&mut self, enabled: bool) {
        self.learning_enabled = enabled;
    }

    pub fn learning(&self) -> bool {
        self.learning_enabled
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    pub fn synapse(&self, address: Address) -> Option<&Synapse> {
        self.synapses.get(&address)
    }

    /// How many synapses have locked their weight. In a bipolar system this
    /// is the synapse count plus the true sum of weights.
    pub fn learned_lines(&self) -> i32 {
        let weight_sum: i32 = self.synapses.values().map(|s| s.weight()).sum();
        self.synapses.len() as i32 + weight_sum
    }
}

impl Default for Neuron {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared knobs for a learning group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Whether the main signal reappears in the output underneath the
    /// evoked activations.
    pub pass_through: bool,
    /// Threshold for synaptic locking inside this group's neurons.
    pub correlation_threshold: i32,
    /// When set, the composed output undergoes a saturating winner-take-all
    /// with this gap before leaving the group.
    pub winner_take_all: Option<i32>,
    /// Master learning switch for the group's neurons.
    pub learning: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            pass_through: false,
            correlation_threshold: 4,
            winner_take_all: None,
            learning: true,
        }
    }
}

impl GroupConfig {
    pub fn with_pass_through(mut self, enabled: bool) -> Self {
        self.pass_through = enabled;
        self
    }

    pub fn with_correlation_threshold(mut self, threshold: i32) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn with_winner_take_all(mut self, gap: i32) -> Self {
        self.winner_take_all = Some(gap);
        self
    }

    pub fn with_learning(mut self, enabled: bool) -> Self {
        self.learning = enabled;
        self
    }
}

/// The atomic unit of learning: anything that can associate two signals and
/// re-emit a main pattern from the association alone.
pub trait Learner: Send {
    fn id(&self) -> &str;
    /// The firing pattern produced by the latest evocation.
    fn pattern(&self) -> &Signal;
    fn evoke(&mut self, main: &Signal, association: &Signal) -> Signal;
    /// Matches minus mismatches over the latest evocation.
    fn match_level(&self) -> i32;
    /// Novelty events minus settled neurons over the latest evocation.
    fn novelty_level(&self) -> i32;
}

/// A set of neurons keyed by main-signal address, all fed the same
/// associative signal.
///
/// A group associates two signals of either 1->N or N->1 shape. For M->N
/// association without interference, use [`AdvancedGroup`].
#[derive(Debug)]
pub struct Group {
    id: String,
    pub cfg: GroupConfig,
    neurons: HashMap<Address, Neuron>,
    pattern: Signal,
}

impl Group {
    pub fn new(id: impl Into<String>, cfg: GroupConfig) -> Self {
        let id = id.into();
        let pattern = Signal::new(id.clone());
        Self {
            id,
            cfg,
            neurons: HashMap::new(),
            pattern,
        }
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn neuron(&self, address: Address) -> Option<&Neuron> {
        self.neurons.get(&address)
    }

    /// A unit-strength line for every neuron whose latest evocation matched.
    pub fn match_pattern(&self) -> Signal {
        let mut pattern = Signal::new(format!("{}-match", self.id));
        for (address, neuron) in &self.neurons {
            if neuron.matched() {
                pattern.set(*address, 1);
            }
        }
        pattern
    }

    /// A unit-strength line for every neuron whose latest evocation mismatched.
    pub fn mismatch_pattern(&self) -> Signal {
        let mut pattern = Signal::new(format!("{}-mismatch", self.id));
        for (address, neuron) in &self.neurons {
            if !neuron.matched() {
                pattern.set(*address, 1);
            }
        }
        pattern
    }

    /// A unit-strength line for every neuron that trained during the latest
    /// evocation.
    pub fn novelty_pattern(&self) -> Signal {
        let mut pattern = Signal::new(format!("{}-novelty", self.id));
        for (address, neuron) in &self.neurons {
            if neuron.novel() {
                pattern.set(*address, 1);
            }
        }
        pattern
    }
}

impl Learner for Group {
    fn id(&self) -> &str {
        &self.id
    }

    fn pattern(&self) -> &Signal {
        &self.pattern
    }

    /// Test the group for an associative evocation pattern.
    ///
    /// Neurons are grown sequentially for unseen main addresses, then every
    /// neuron is evaluated in parallel against the shared associative signal
    /// and rejoined at a barrier. Positive activations accumulate into the
    /// output at their address; accumulation is plain addition and therefore
    /// independent of completion order.
    fn evoke(&mut self, main: &Signal, association: &Signal) -> Signal {
        let mut pattern = if self.cfg.pass_through {
            main.clone()
        } else {
            Signal::new(main.id())
        };

        // Growth happens strictly before dispatch; the neuron map is never
        // mutated concurrently.
        for address in main.addresses() {
            self.neurons.entry(address).or_insert_with(Neuron::new);
        }

        let threshold = self.cfg.correlation_threshold;
        let learning = self.cfg.learning;
        self.neurons.par_iter_mut().for_each(|(address, neuron)| {
            neuron.evoke(main.get(*address), association, threshold, learning);
        });

        for (address, neuron) in &self.neurons {
            if neuron.axon() > 0 {
                pattern.adjust(*address, neuron.axon());
            }
        }

        if let Some(gap) = self.cfg.winner_take_all {
            pattern.winner_take_all_saturating(gap);
        }
        self.pattern = pattern.clone();
        pattern
    }

    fn match_level(&self) -> i32 {
        self.neurons
            .values()
            .map(|n| if n.matched() { 1 } else { -1 })
            .sum()
    }

    fn novelty_level(&self) -> i32 {
        self.neurons
            .values()
            .map(|n| if n.novel() { 1 } else { -1 })
            .sum()
    }
}

/// A group preceded by a "grandmother" stage mapping N associative lines down
/// to one mutually exclusive line, so M->N associations resolve without
/// interference.
///
/// One grandmother neuron exists per learned association pattern. A
/// grandmother whose synapses have finished learning is frozen, and a fresh
/// one is grown as soon as no existing line evokes.
#[derive(Debug)]
pub struct AdvancedGroup {
    group: Group,
    grandmothers: Vec<Neuron>,
    /// Threshold for synaptic locking in the grandmother stage.
    pub grandmother_threshold: i32,
}

impl AdvancedGroup {
    pub fn new(id: impl Into<String>, cfg: GroupConfig) -> Self {
        Self {
            group: Group::new(id, cfg),
            grandmothers: vec![Neuron::new()],
            grandmother_threshold: cfg.correlation_threshold,
        }
    }

    pub fn cfg(&self) -> &GroupConfig {
        &self.group.cfg
    }

    pub fn cfg_mut(&mut self) -> &mut GroupConfig {
        &mut self.group.cfg
    }

    pub fn grandmother_count(&self) -> usize {
        self.grandmothers.len()
    }
}

impl Learner for AdvancedGroup {
    fn id(&self) -> &str {
        self.group.id()
    }

    fn pattern(&self) -> &Signal {
        self.group.pattern()
    }

    fn evoke(&mut self, main: &Signal, association: &Signal) -> Signal {
        let mut collapsed = Signal::new(format!("{}-grandmother", self.group.id()));

        let threshold = self.grandmother_threshold;
        let learning = self.group.cfg.learning;
        self.grandmothers.par_iter_mut().for_each(|neuron| {
            neuron.evoke(1, association, threshold, learning);
        });
        for (line, neuron) in self.grandmothers.iter().enumerate() {
            if neuron.axon() > 0 {
                collapsed.adjust(Address::new(line as i32, 0), neuron.axon());
            }
        }
        collapsed.winner_take_all(0);

        // The newest grandmother learns one pattern, then freezes. Grow a
        // fresh one only once the frozen set no longer evokes anything.
        if let Some(newest) = self.grandmothers.last_mut() {
            if newest.learned_lines() > 0 {
                newest.set_learning(false);
                if collapsed.is_empty() {
                    self.grandmothers.push(Neuron::new());
                }
            }
        }

        self.group.evoke(main, &collapsed)
    }

    fn match_level(&self) -> i32 {
        self.group.match_level()
    }

    fn novelty_level(&self) -> i32 {
        self.group.novelty_level()
    }
}

/// A group that feeds its own most recent output back as its association.
///
/// A partial main cue evokes against the remembered output of the previous
/// evocation, reconstructing the full learned pattern over repeated cycles.
/// Runs indefinitely; there is no terminal state.
#[derive(Debug)]
pub struct AutoAssociativeMemory {
    group: Group,
    last: Signal,
}

impl AutoAssociativeMemory {
    pub fn new(id: impl Into<String>, cfg: GroupConfig) -> Self {
        let group = Group::new(id, cfg);
        let last = Signal::new(group.id());
        Self { group, last }
    }

    pub fn id(&self) -> &str {
        self.group.id()
    }

    pub fn cfg(&self) -> &GroupConfig {
        &self.group.cfg
    }

    pub fn cfg_mut(&mut self) -> &mut GroupConfig {
        &mut self.group.cfg
    }

    pub fn pattern(&self) -> &Signal {
        self.group.pattern()
    }

    /// Evoke against the remembered output of the previous call.
    pub fn evoke(&mut self, main: &Signal) -> Signal {
        let association = self.last.clone();
        let out = self.group.evoke(main, &association);
        self.last = out.clone();
        out
    }
}
