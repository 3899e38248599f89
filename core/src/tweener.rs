//! Entity interpolation buffer.
//!
//! Records where every entity stood before and after the most recent
//! tick so the presentation layer can draw them part-way between the two.
//! The world itself is never moved by interpolation.

use std::collections::BTreeMap;

use crate::types::{EntityId, EntityPosition, Position};

#[derive(Debug, Default, Clone)]
pub struct EntityTweener {
    pre:  BTreeMap<EntityId, Position>,
    post: BTreeMap<EntityId, Position>,
}

impl EntityTweener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture positions before a tick. Clears the previous pair.
    pub fn pre_tick(&mut self, positions: &[EntityPosition]) {
        self.reset();
        self.pre.extend(positions.iter().map(|p| (p.id, p.position)));
    }

    /// Capture positions after the tick.
    pub fn post_tick(&mut self, positions: &[EntityPosition]) {
        self.post.clear();
        self.post.extend(positions.iter().map(|p| (p.id, p.position)));
    }

    pub fn reset(&mut self) {
        self.pre.clear();
        self.post.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() || self.post.is_empty()
    }

    /// Interpolated positions at `alpha` between the captured pair.
    /// Entities that appeared or vanished during the tick are reported
    /// at their post-tick position, or not at all.
    pub fn tween(&self, alpha: f32) -> Vec<EntityPosition> {
        self.post
            .iter()
            .map(|(&id, &to)| {
                let position = match self.pre.get(&id) {
                    Some(&from) if from != to => from.lerp(to, alpha),
                    _ => to,
                };
                EntityPosition { id, position }
            })
            .collect()
    }
}
