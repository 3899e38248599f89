//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the master seed and the tick number.
//!
//! Each tick has a seed derived from (master_seed, tick). Each subsystem
//! draws from its own stream derived from (tick_seed, slot). This means:
//!   - The seed recorded at tick start reproduces every decision made
//!     during that tick.
//!   - Adding a new subsystem never changes existing subsystems' streams.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::{
    subsystem::{CalendarEvent, SubsystemSlot},
    types::Tick,
};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;
const CALENDAR_STREAM_STRIDE: u64 = 16;

/// A named, deterministic RNG for a single subsystem.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a subsystem RNG from a tick seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(tick_seed: u64, stream_index: u64) -> Self {
        let derived_seed = tick_seed ^ (stream_index.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n). Returns 0 when `n` is 0.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Seed source for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The seed every stream of `tick` derives from. Recorded in the
    /// ledger at the start of each tick.
    pub fn tick_seed(&self, tick: Tick) -> u64 {
        splitmix64(self.master_seed ^ (tick as u64).wrapping_mul(GOLDEN_GAMMA))
    }

    pub fn for_subsystem(&self, tick: Tick, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.tick_seed(tick), slot as u64).with_name(slot.name())
    }

    /// Stream for a calendar hook, distinct from the slot's update stream.
    pub fn for_calendar(&self, tick: Tick, slot: SubsystemSlot, event: CalendarEvent) -> SubsystemRng {
        let stream = (slot as u64) + CALENDAR_STREAM_STRIDE * (event as u64 + 1);
        SubsystemRng::new(self.tick_seed(tick), stream).with_name(slot.name())
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
