//! Power-up inventory and timed effects for one opponent

use smallvec::SmallVec;

use crate::race::constants::power_ups::*;
use crate::race::state::PowerUpKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub multiplier: f32,
    /// Seconds left
    pub remaining: f32,
}

impl ActiveEffect {
    fn for_kind(kind: PowerUpKind) -> Self {
        let (multiplier, remaining) = match kind {
            PowerUpKind::SpeedBoost => (SPEED_BOOST_MULTIPLIER, SPEED_BOOST_DURATION),
            PowerUpKind::Invincibility => (1.0, INVINCIBILITY_DURATION),
            PowerUpKind::Turbo => (TURBO_MULTIPLIER, TURBO_DURATION),
        };
        Self {
            kind,
            multiplier,
            remaining,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PowerUpState {
    inventory: SmallVec<[PowerUpKind; INVENTORY_CAPACITY]>,
    effects: SmallVec<[ActiveEffect; 3]>,
    cooldown: f32,
}

impl PowerUpState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pickup; false when the inventory is full
    pub fn collect(&mut self, kind: PowerUpKind) -> bool {
        if self.inventory.len() >= INVENTORY_CAPACITY {
            return false;
        }
        self.inventory.push(kind);
        true
    }

    /// Fire the oldest held item. No-op when empty or cooling down.
    pub fn activate(&mut self) -> Option<PowerUpKind> {
        if self.cooldown > 0.0 || self.inventory.is_empty() {
            return None;
        }
        let kind = self.inventory.remove(0);
        let effect = ActiveEffect::for_kind(kind);
        match self.effects.iter_mut().find(|e| e.kind == kind) {
            Some(existing) => *existing = effect,
            None => self.effects.push(effect),
        }
        self.cooldown = ACTIVATION_COOLDOWN;
        tracing::debug!(?kind, duration = effect.remaining, "Power-up activated");
        Some(kind)
    }

    /// Count down the cooldown and every active effect
    pub fn advance(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        for effect in self.effects.iter_mut() {
            effect.remaining -= dt;
        }
        self.effects.retain(|e| e.remaining > 0.0);
    }

    /// Strongest active speed effect (1.0 when none)
    pub fn speed_multiplier(&self) -> f32 {
        self.effects
            .iter()
            .map(|e| e.multiplier)
            .fold(1.0, f32::max)
    }

    pub fn is_invincible(&self) -> bool {
        self.effects.iter().any(|e| e.kind == PowerUpKind::Invincibility)
    }

    pub fn has_item(&self) -> bool {
        !self.inventory.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inventory.len() >= INVENTORY_CAPACITY
    }

    pub fn inventory(&self) -> &[PowerUpKind] {
        &self.inventory
    }

    pub fn effects(&self) -> &[ActiveEffect] {
        &self.effects
    }

    pub fn can_activate(&self) -> bool {
        self.cooldown <= 0.0 && self.has_item()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_capacity() {
        let mut state = PowerUpState::new();
        assert!(state.collect(PowerUpKind::Turbo));
        assert!(state.collect(PowerUpKind::SpeedBoost));
        assert!(!state.collect(PowerUpKind::Invincibility));
        assert!(state.is_full());
        assert_eq!(state.inventory(), &[PowerUpKind::Turbo, PowerUpKind::SpeedBoost]);
    }

    #[test]
    fn test_activate_empty_is_noop() {
        let mut state = PowerUpState::new();
        assert_eq!(state.activate(), None);
        assert!(state.effects().is_empty());
        assert_eq!(state.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_activation_cooldown() {
        let mut state = PowerUpState::new();
        state.collect(PowerUpKind::Turbo);
        state.collect(PowerUpKind::SpeedBoost);
        assert_eq!(state.activate(), Some(PowerUpKind::Turbo));
        assert_eq!(state.activate(), None);
        state.advance(1.0);
        assert_eq!(state.activate(), Some(PowerUpKind::SpeedBoost));
        assert_eq!(state.speed_multiplier(), 2.0);
    }

    #[test]
    fn test_effects_expire() {
        let mut state = PowerUpState::new();
        state.collect(PowerUpKind::Invincibility);
        state.activate();
        assert!(state.is_invincible());
        state.advance(4.9);
        assert!(state.is_invincible());
        state.advance(0.2);
        assert!(!state.is_invincible());
        assert!(state.effects().is_empty());
    }

    #[test]
    fn test_turbo_multiplier_and_duration() {
        let mut state = PowerUpState::new();
        state.collect(PowerUpKind::Turbo);
        state.activate();
        assert_eq!(state.speed_multiplier(), 1.5);
        state.advance(3.9);
        assert_eq!(state.speed_multiplier(), 1.5);
        state.advance(0.2);
        assert_eq!(state.speed_multiplier(), 1.0);
    }
}
