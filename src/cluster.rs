use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::learn::{Group, GroupConfig, Learner};
use crate::signal::Signal;

/// A set of groups, one per distinct associative source, competing to explain
/// the same main signal.
///
/// Each group only ever sees the associative signal of its own source, so
/// unrelated sources cannot cross-talk through shared synapses. Evocation
/// runs every matched group in parallel and then selects the single strongest
/// firing pattern; the historical sum-then-sharpen aggregation is deliberately
/// not used here.
#[derive(Debug)]
pub struct Cluster {
    id: String,
    pub cfg: GroupConfig,
    groups: BTreeMap<String, Group>,
}

impl Cluster {
    pub fn new(id: impl Into<String>, cfg: GroupConfig) -> Self {
        Self {
            id: id.into(),
            cfg,
            groups: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, source: &str) -> Option<&Group> {
        self.groups.get(source)
    }

    /// Evoke every group whose source supplied an associative signal and
    /// return the strongest firing pattern.
    ///
    /// Groups are grown sequentially for unseen sources before the parallel
    /// dispatch. Selection walks the group map in its stable id order, so an
    /// exact-strength tie resolves to the lexicographically first source on
    /// every run.
    pub fn evoke(&mut self, main: &Signal, associates: &[(&str, &Signal)]) -> Signal {
        for (source, _) in associates {
            if !self.groups.contains_key(*source) {
                let group_id = format!("{}:{}", self.id, source);
                self.groups
                    .insert((*source).to_string(), Group::new(group_id, self.cfg));
            }
        }

        let mut jobs: Vec<(&mut Group, &Signal)> = self
            .groups
            .iter_mut()
            .filter_map(|(source, group)| {
                associates
                    .iter()
                    .find(|(id, _)| *id == source.as_str())
                    .map(|(_, association)| (group, *association))
            })
            .collect();
        jobs.par_iter_mut().for_each(|(group, association)| {
            group.evoke(main, association);
        });

        // Strict competitive selection: only sources evoked this call take
        // part, and a pattern must be strictly stronger to displace the
        // current winner.
        let mut winner = Signal::new(format!("{}:evocation", self.id));
        let mut best = 0;
        for (source, group) in &self.groups {
            if !associates.iter().any(|(id, _)| *id == source.as_str()) {
                continue;
            }
            let strength = group.pattern().strength();
            if strength > best {
                best = strength;
                winner = group.pattern().clone();
            }
        }
        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Address;

    fn signal(id: &str, lines: &[((i32, i32), i32)]) -> Signal {
        let mut s = Signal::new(id);
        for ((x, y), v) in lines {
            s.set(Address::new(*x, *y), *v);
        }
        s
    }

    #[test]
    fn cluster_grows_one_group_per_source() {
        let mut cluster = Cluster::new("c", GroupConfig::default());
        let main = signal("main", &[((0, 0), 1)]);
        let a = signal("a", &[((1, 0), 1)]);
        let b = signal("b", &[((2, 0), 1)]);

        cluster.evoke(&main, &[("vision", &a), ("audition", &b)]);
        assert_eq!(cluster.group_count(), 2);

        // Same sources again: no further growth.
        cluster.evoke(&main, &[("vision", &a), ("audition", &b)]);
        assert_eq!(cluster.group_count(), 2);
    }

    #[test]
    fn cluster_returns_the_strongest_source() {
        let cfg = GroupConfig::default().with_correlation_threshold(1);
        let mut cluster = Cluster::new("c", cfg);
        let main = signal("main", &[((0, 0), 1)]);

        // "wide" locks two synapses for the main line, "narrow" locks one.
        let wide = signal("w", &[((0, 0), 1), ((1, 0), 1)]);
        let narrow = signal("n", &[((5, 0), 1)]);
        for _ in 0..2 {
            cluster.evoke(&main, &[("wide", &wide), ("narrow", &narrow)]);
        }

        let out = cluster.evoke(&main, &[("wide", &wide), ("narrow", &narrow)]);
        assert_eq!(out, signal("main", &[((0, 0), 2)]));
    }

    #[test]
    fn cluster_tie_break_is_stable_across_runs() {
        let main = signal("main", &[((0, 0), 1)]);
        let a = signal("a", &[((1, 0), 1)]);
        let b = signal("b", &[((2, 0), 1)]);

        let mut winners = Vec::new();
        for _ in 0..20 {
            let cfg = GroupConfig::default().with_correlation_threshold(1);
            let mut cluster = Cluster::new("c", cfg);
            // Both sources lock one synapse each: identical strength.
            for _ in 0..3 {
                cluster.evoke(&main, &[("beta", &b), ("alpha", &a)]);
            }
            winners.push(cluster.evoke(&main, &[("beta", &b), ("alpha", &a)]));
        }
        // The lexicographically first source wins the tie, every run.
        for w in &winners {
            assert_eq!(w, &winners[0]);
        }
    }

    #[test]
    fn cluster_with_no_matching_source_yields_empty() {
        let mut cluster = Cluster::new("c", GroupConfig::default());
        let main = signal("main", &[((0, 0), 1)]);

        let out = cluster.evoke(&main, &[]);
        assert!(out.is_empty());
        assert_eq!(out.id(), "c:evocation");
    }

    #[test]
    fn stale_groups_do_not_compete() {
        let cfg = GroupConfig::default()
            .with_correlation_threshold(1)
            .with_pass_through(true);
        let mut cluster = Cluster::new("c", cfg);
        let main = signal("main", &[((0, 0), 1)]);
        let a = signal("a", &[((1, 0), 1)]);
        let b = signal("b", &[((2, 0), 3)]);

        // "beta" learns the stronger association and holds the stronger
        // stale pattern.
        for _ in 0..3 {
            cluster.evoke(&main, &[("alpha", &a), ("beta", &b)]);
        }
        assert!(cluster.group("beta").unwrap().pattern().strength() > 2);

        // "beta" supplied no signal this call, so its stale pattern sits the
        // competition out even though it is stronger.
        let out = cluster.evoke(&main, &[("alpha", &a)]);
        assert_eq!(out.get(Address::new(0, 0)), 2);
    }
}
