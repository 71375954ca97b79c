//! Lock-on targeting sub-state

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ground_distance;
use crate::sim::pool::EntityHandle;

/// Something an ability can lock onto
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub handle: EntityHandle,
    pub position: Vec3,
}

/// Result of re-validating the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Kept,
    /// Selection vanished; the nearest survivor took its place
    Substituted,
    /// Nothing left to target
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetingSession {
    radius: f32,
    /// Sorted nearest first
    candidates: Vec<Target>,
    selected: usize,
}

/// Candidates within `radius` of the player that pass `valid`, nearest first
pub fn scan<F>(player_pos: Vec3, targets: &[Target], radius: f32, valid: F) -> Vec<Target>
where
    F: Fn(&Target) -> bool,
{
    let mut found: Vec<(f32, Target)> = targets
        .iter()
        .filter(|t| valid(*t))
        .map(|t| (ground_distance(player_pos, t.position), *t))
        .filter(|(d, _)| *d <= radius)
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    found.into_iter().map(|(_, t)| t).collect()
}

impl TargetingSession {
    /// Open a session, or `None` when nothing is in range
    pub fn start<F>(player_pos: Vec3, targets: &[Target], radius: f32, valid: F) -> Option<Self>
    where
        F: Fn(&Target) -> bool,
    {
        let candidates = scan(player_pos, targets, radius, valid);
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            radius,
            candidates,
            selected: 0,
        })
    }

    pub fn candidates(&self) -> &[Target] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&Target> {
        self.candidates.get(self.selected)
    }

    /// Step the selection, wrapping at both ends
    pub fn cycle(&mut self, direction: i32) -> Option<&Target> {
        let len = self.candidates.len() as i64;
        if len == 0 {
            return None;
        }
        let next = (self.selected as i64 + direction as i64).rem_euclid(len);
        self.selected = next as usize;
        self.selected()
    }

    /// Rescan and re-validate the current selection
    pub fn refresh<F>(&mut self, player_pos: Vec3, targets: &[Target], valid: F) -> RefreshOutcome
    where
        F: Fn(&Target) -> bool,
    {
        let previous = self.selected().map(|t| t.handle);
        self.candidates = scan(player_pos, targets, self.radius, valid);
        if self.candidates.is_empty() {
            self.selected = 0;
            return RefreshOutcome::Cancelled;
        }
        match previous.and_then(|h| self.candidates.iter().position(|t| t.handle == h)) {
            Some(idx) => {
                self.selected = idx;
                RefreshOutcome::Kept
            }
            None => {
                self.selected = 0;
                RefreshOutcome::Substituted
            }
        }
    }
}
