//! Timed and permanent stat modifiers
//!
//! Every stat an entity exposes (speed, jump force) is owned by one
//! `StatModifierEngine`. Nothing else writes the raw value: pickups go
//! through `apply`, readers go through `current_value`.
//!
//! Timed modifiers are scheduled expiries swept by `tick`, there is no
//! waiting or suspension involved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Slack when comparing the engine clock against an expiry time, so that
/// stepping by exactly `d` in fixed increments always expires a `d` boost.
const EXPIRY_EPSILON: f64 = 1e-6;
/// Extra slack per second of duration. f32 step sizes are off by a relative
/// ~2e-8, so the shortfall after `d` seconds of steps grows with `d`.
const EXPIRY_RELATIVE_EPSILON: f64 = 1e-7;

/// A named numeric attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stat {
    Speed,
    JumpForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierKind {
    Additive,
    Multiplicative,
}

impl ModifierKind {
    #[inline]
    pub fn apply(self, value: f32, magnitude: f32) -> f32 {
        match self {
            ModifierKind::Additive => value + magnitude,
            ModifierKind::Multiplicative => value * magnitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModifierDuration {
    Permanent,
    /// Seconds. Non-positive values expire on the next tick.
    Timed(f32),
}

/// How an expiring modifier is undone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RevertPolicy {
    /// Refold the base value over the modifiers still active, in the order
    /// they were applied. Overlapping boosts keep their contributions.
    #[default]
    Recompute,
    /// Restore the value seen right before the modifier was applied.
    /// Only correct when boosts never overlap; later boosts that are still
    /// active get wiped.
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModifierHandle(pub u32);

/// One applied modifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatModifier {
    pub handle: ModifierHandle,
    pub stat: Stat,
    pub kind: ModifierKind,
    pub magnitude: f32,
    pub duration: ModifierDuration,
    /// Engine clock when applied (seconds)
    pub applied_at: f64,
    /// Stat value immediately before this modifier was applied
    pub baseline_snapshot: f32,
}

impl StatModifier {
    pub fn expires_at(&self) -> Option<f64> {
        match self.duration {
            ModifierDuration::Permanent => None,
            ModifierDuration::Timed(d) => Some(self.applied_at + d.max(0.0) as f64),
        }
    }

    fn is_due(&self, clock: f64) -> bool {
        let ModifierDuration::Timed(d) = self.duration else {
            return false;
        };
        let d = d.max(0.0) as f64;
        let slack = EXPIRY_EPSILON.max(EXPIRY_RELATIVE_EPSILON * d);
        clock + slack >= self.applied_at + d
    }

    fn is_permanent(&self) -> bool {
        matches!(self.duration, ModifierDuration::Permanent)
    }
}

/// Reported by `tick` for each modifier that ran out
#[derive(Debug, Clone)]
pub struct Expired {
    pub modifier: StatModifier,
    /// Stat value after the revert
    pub restored: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct StatTrack {
    /// Designer base plus every permanent modifier already folded in
    base: f32,
    /// Resolved value read by gameplay
    value: f32,
}

/// Owns the stats of a single entity and the modifiers layered on them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatModifierEngine {
    stats: BTreeMap<Stat, StatTrack>,
    /// Modifiers still tracked, in application order
    layers: Vec<StatModifier>,
    clock: f64,
    policy: RevertPolicy,
    next_handle: u32,
}

impl Default for StatModifierEngine {
    fn default() -> Self {
        Self::new(RevertPolicy::default())
    }
}

impl StatModifierEngine {
    pub fn new(policy: RevertPolicy) -> Self {
        Self {
            stats: BTreeMap::new(),
            layers: Vec::new(),
            clock: 0.0,
            policy,
            next_handle: 1,
        }
    }

    /// Builder: register a stat with its designer base value
    pub fn with_base(mut self, stat: Stat, value: f32) -> Self {
        self.set_base(stat, value);
        self
    }

    /// Replace the designer base of a stat and re-resolve it
    pub fn set_base(&mut self, stat: Stat, value: f32) {
        self.stats.entry(stat).or_default().base = value;
        self.refold(stat);
    }

    pub fn policy(&self) -> RevertPolicy {
        self.policy
    }

    /// Seconds advanced through `tick` so far
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Resolved value of a stat (0 for stats never registered)
    pub fn current_value(&self, stat: Stat) -> f32 {
        self.stats.get(&stat).map(|t| t.value).unwrap_or(0.0)
    }

    /// Base value with permanent modifiers folded in, ignoring timed ones
    pub fn base_value(&self, stat: Stat) -> f32 {
        self.stats.get(&stat).map(|t| t.base).unwrap_or(0.0)
    }

    /// Timed modifiers waiting to expire, in application order
    pub fn pending(&self) -> impl Iterator<Item = &StatModifier> {
        self.layers.iter().filter(|m| !m.is_permanent())
    }

    /// Seconds left on a timed modifier, `None` if it is gone or permanent
    pub fn remaining(&self, handle: ModifierHandle) -> Option<f32> {
        self.layers
            .iter()
            .find(|m| m.handle == handle)
            .and_then(|m| m.expires_at())
            .map(|at| (at - self.clock).max(0.0) as f32)
    }

    /// Apply a modifier on top of the stat's current value. Never fails.
    pub fn apply(
        &mut self,
        stat: Stat,
        kind: ModifierKind,
        magnitude: f32,
        duration: ModifierDuration,
    ) -> ModifierHandle {
        let handle = ModifierHandle(self.next_handle);
        self.next_handle += 1;

        let has_layer = self.layers.iter().any(|m| m.stat == stat);
        let track = self.stats.entry(stat).or_default();
        let baseline_snapshot = track.value;
        let value = kind.apply(baseline_snapshot, magnitude);
        track.value = value;

        match (duration, self.policy) {
            // Nothing underneath to expire, fold straight into the base
            (ModifierDuration::Permanent, _) if !has_layer => track.base = value,
            (ModifierDuration::Permanent, RevertPolicy::Snapshot) => {}
            _ => self.layers.push(StatModifier {
                handle,
                stat,
                kind,
                magnitude,
                duration,
                applied_at: self.clock,
                baseline_snapshot,
            }),
        }

        handle
    }

    /// Advance the clock and revert every timed modifier that ran out
    pub fn tick(&mut self, dt: f32) -> Vec<Expired> {
        if dt.is_finite() && dt > 0.0 {
            self.clock += dt as f64;
        }
        let clock = self.clock;

        // Newest first, so snapshot reverts unwind in reverse application order
        let mut expired = Vec::new();
        let mut i = self.layers.len();
        while i > 0 {
            i -= 1;
            if self.layers[i].is_due(clock) {
                let modifier = self.layers.remove(i);
                let restored = self.revert(&modifier);
                expired.push(Expired { modifier, restored });
            }
        }
        expired.reverse();
        expired
    }

    /// Drop all pending expiries without reverting anything.
    ///
    /// Used when the owning entity is destroyed. Returns how many were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending().count();
        for track in self.stats.values_mut() {
            track.base = track.value;
        }
        self.layers.clear();
        dropped
    }

    fn revert(&mut self, modifier: &StatModifier) -> f32 {
        match self.policy {
            RevertPolicy::Recompute => {
                self.refold(modifier.stat);
                self.compact(modifier.stat);
            }
            RevertPolicy::Snapshot => {
                if let Some(track) = self.stats.get_mut(&modifier.stat) {
                    track.value = modifier.baseline_snapshot;
                    if !self.layers.iter().any(|m| m.stat == modifier.stat) {
                        track.base = track.value;
                    }
                }
            }
        }
        self.current_value(modifier.stat)
    }

    fn refold(&mut self, stat: Stat) {
        let Some(track) = self.stats.get_mut(&stat) else {
            return;
        };
        track.value = self
            .layers
            .iter()
            .filter(|m| m.stat == stat)
            .fold(track.base, |v, m| m.kind.apply(v, m.magnitude));
    }

    /// Fold leading permanent layers into the base once nothing timed sits under them
    fn compact(&mut self, stat: Stat) {
        while let Some(pos) = self.layers.iter().position(|m| m.stat == stat) {
            if !self.layers[pos].is_permanent() {
                break;
            }
            let m = self.layers.remove(pos);
            if let Some(track) = self.stats.get_mut(&stat) {
                track.base = m.kind.apply(track.base, m.magnitude);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;

    fn speed_engine(policy: RevertPolicy) -> StatModifierEngine {
        StatModifierEngine::new(policy).with_base(Stat::Speed, 10.0)
    }

    #[test]
    fn test_additive_boost_reverts_after_exact_duration() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(10.0));
        assert_eq!(engine.current_value(Stat::Speed), 15.0);

        let expired = engine.tick(10.0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].restored, 10.0);
        assert_eq!(engine.current_value(Stat::Speed), 10.0);
    }

    #[test]
    fn test_additive_boost_reverts_in_fixed_steps() {
        for policy in [RevertPolicy::Recompute, RevertPolicy::Snapshot] {
            let mut engine = speed_engine(policy);
            engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(1.0));

            // 49 steps: still boosted
            for _ in 0..49 {
                assert!(engine.tick(SIM_DT).is_empty());
            }
            assert_eq!(engine.current_value(Stat::Speed), 15.0);

            // 50th step lands exactly on the duration
            assert_eq!(engine.tick(SIM_DT).len(), 1);
            assert_eq!(engine.current_value(Stat::Speed), 10.0);
        }
    }

    #[test]
    fn test_long_boost_expires_on_its_last_step() {
        for duration in [60.0, 1000.0] {
            let mut engine = speed_engine(RevertPolicy::Recompute);
            engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(duration));

            let steps = (duration / 0.02).round() as usize;
            for _ in 0..steps - 1 {
                assert!(engine.tick(SIM_DT).is_empty());
            }
            assert_eq!(engine.current_value(Stat::Speed), 15.0);
            assert_eq!(engine.tick(SIM_DT).len(), 1, "{duration}s boost");
            assert_eq!(engine.current_value(Stat::Speed), 10.0);
        }
    }

    #[test]
    fn test_permanent_stacked_on_permanent_folds_into_base() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Additive, 2.0, ModifierDuration::Permanent);
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 2.0, ModifierDuration::Permanent);
        assert_eq!(engine.base_value(Stat::Speed), 24.0);
        assert_eq!(engine.pending().count(), 0);

        // A permanent layered over a pending boost is tracked until the boost ends
        engine.apply(Stat::Speed, ModifierKind::Additive, 1.0, ModifierDuration::Timed(1.0));
        engine.apply(Stat::Speed, ModifierKind::Additive, 1.0, ModifierDuration::Permanent);
        assert_eq!(engine.base_value(Stat::Speed), 24.0);
        assert_eq!(engine.current_value(Stat::Speed), 26.0);
        engine.tick(1.0);
        assert_eq!(engine.base_value(Stat::Speed), 25.0);
    }

    #[test]
    fn test_permanent_multiplier_never_reverts() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 1.5, ModifierDuration::Permanent);
        for _ in 0..10_000 {
            assert!(engine.tick(SIM_DT).is_empty());
        }
        assert_eq!(engine.current_value(Stat::Speed), 15.0);
        assert_eq!(engine.base_value(Stat::Speed), 15.0);
        assert_eq!(engine.pending().count(), 0);
    }

    #[test]
    fn test_non_positive_duration_expires_next_tick() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(0.0));
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(-3.0));
        assert_eq!(engine.current_value(Stat::Speed), 20.0);

        let expired = engine.tick(0.0);
        assert_eq!(expired.len(), 2);
        assert_eq!(engine.current_value(Stat::Speed), 10.0);
    }

    #[test]
    fn test_overlapping_boosts_recompute() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(2.0));
        engine.tick(1.0);
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 2.0, ModifierDuration::Timed(2.0));
        assert_eq!(engine.current_value(Stat::Speed), 30.0);

        // First boost ends, second keeps its contribution
        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::Speed), 20.0);

        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::Speed), 10.0);
    }

    #[test]
    fn test_overlapping_boosts_snapshot_legacy() {
        let mut engine = speed_engine(RevertPolicy::Snapshot);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(2.0));
        engine.tick(1.0);
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 2.0, ModifierDuration::Timed(2.0));

        // Restores the pre-boost value and wipes the active multiplier
        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::Speed), 10.0);

        // Then restores its own stale snapshot
        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::Speed), 15.0);
    }

    #[test]
    fn test_snapshot_reverts_same_tick_in_reverse_order() {
        let mut engine = speed_engine(RevertPolicy::Snapshot);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(1.0));
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 2.0, ModifierDuration::Timed(1.0));
        let expired = engine.tick(1.0);
        assert_eq!(expired.len(), 2);
        assert_eq!(engine.current_value(Stat::Speed), 10.0);
    }

    #[test]
    fn test_permanent_during_timed_boost_survives_expiry() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(1.0));
        engine.apply(Stat::Speed, ModifierKind::Multiplicative, 2.0, ModifierDuration::Permanent);
        assert_eq!(engine.current_value(Stat::Speed), 30.0);

        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::Speed), 20.0);
        // Permanent layer got folded into the base
        assert_eq!(engine.base_value(Stat::Speed), 20.0);
    }

    #[test]
    fn test_stats_are_independent() {
        let mut engine = speed_engine(RevertPolicy::Recompute).with_base(Stat::JumpForce, 12.0);
        engine.apply(Stat::JumpForce, ModifierKind::Additive, 3.0, ModifierDuration::Timed(1.0));
        engine.apply(Stat::Speed, ModifierKind::Additive, 1.0, ModifierDuration::Timed(2.0));
        engine.tick(1.0);
        assert_eq!(engine.current_value(Stat::JumpForce), 12.0);
        assert_eq!(engine.current_value(Stat::Speed), 11.0);
    }

    #[test]
    fn test_discard_pending_keeps_value() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        let handle =
            engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(1.0));
        assert!(engine.remaining(handle).is_some());

        assert_eq!(engine.discard_pending(), 1);
        assert!(engine.remaining(handle).is_none());
        assert!(engine.tick(5.0).is_empty());
        assert_eq!(engine.current_value(Stat::Speed), 15.0);
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut engine = speed_engine(RevertPolicy::Recompute);
        let handle =
            engine.apply(Stat::Speed, ModifierKind::Additive, 5.0, ModifierDuration::Timed(10.0));
        engine.tick(4.0);
        let left = engine.remaining(handle).unwrap();
        assert!((left - 6.0).abs() < 1e-5);
    }

    #[derive(Debug, Clone)]
    struct Boost {
        wait: f32,
        kind: ModifierKind,
        magnitude: f32,
        duration: f32,
    }

    fn boost_strategy() -> impl Strategy<Value = Boost> {
        (
            0.0f32..3.0,
            prop_oneof![Just(ModifierKind::Additive), Just(ModifierKind::Multiplicative)],
            0.5f32..4.0,
            0.0f32..5.0,
        )
            .prop_map(|(wait, kind, magnitude, duration)| Boost {
                wait,
                kind,
                magnitude,
                duration,
            })
    }

    proptest! {
        #[test]
        fn prop_recompute_returns_to_base(boosts in prop::collection::vec(boost_strategy(), 0..12)) {
            let mut engine = speed_engine(RevertPolicy::Recompute);
            for b in &boosts {
                engine.tick(b.wait);
                engine.apply(Stat::Speed, b.kind, b.magnitude, ModifierDuration::Timed(b.duration));
            }
            engine.tick(10.0);
            prop_assert_eq!(engine.pending().count(), 0);
            prop_assert_eq!(engine.current_value(Stat::Speed), 10.0);
        }
    }
}
