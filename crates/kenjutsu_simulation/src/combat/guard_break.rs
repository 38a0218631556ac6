//! Guard-break escalation
//!
//! ParryCounter считает подряд парированные удары игрока. На пороге T:
//! счётчик → 0 атомарно с событием, игрок в stun-lockout, парировавший враг
//! получает forced counter-attack, игрока отбрасывает от этого врага.

use bevy::prelude::*;

use crate::combat::stun::CombatCommand;
use crate::components::{Position, StunCause};
use crate::config::CombatConfig;
use crate::knockback::{Easing, KnockbackRequest};
use crate::logger;

/// Подряд парированные удары игрока (живёт на игроке)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct ParryCounter {
    pub count: u32,
}

impl ParryCounter {
    /// Засчитать parry. `true` — порог достигнут, счётчик уже сброшен.
    pub fn register_parry(&mut self, threshold: u32) -> bool {
        self.count += 1;
        if self.count >= threshold.max(1) {
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Event: guard break сработал
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardBreakTriggered {
    pub player: Entity,
    /// Враг, парировавший последний удар
    pub parried_by: Entity,
}

pub fn apply_guard_breaks(
    mut breaks: EventReader<GuardBreakTriggered>,
    positions: Query<&Position>,
    config: Res<CombatConfig>,
    mut combat_commands: EventWriter<CombatCommand>,
    mut knockbacks: EventWriter<KnockbackRequest>,
) {
    let tuning = &config.guard_break;

    for event in breaks.read() {
        combat_commands.write(CombatCommand::Stun {
            target: event.player,
            duration: tuning.lockout,
            cause: StunCause::GuardBreak,
        });
        combat_commands.write(CombatCommand::ForceCounterAttack {
            enemy: event.parried_by,
            target: event.player,
        });

        if let Ok(source) = positions.get(event.parried_by) {
            knockbacks.write(KnockbackRequest {
                source: source.0,
                target: event.player,
                distance: tuning.knockback.distance,
                duration: tuning.knockback.duration,
                easing: Easing::SmoothStep,
            });
        }

        logger::log_info(&format!(
            "🛡️💥 ECS: GUARD BREAK! {:?} broken by {:?}",
            event.player, event.parried_by
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_fires_once_at_threshold() {
        let mut counter = ParryCounter::default();
        assert!(!counter.register_parry(3));
        assert!(!counter.register_parry(3));
        assert!(counter.register_parry(3));
        assert_eq!(counter.count, 0);

        // Следующий цикл начинается с нуля
        assert!(!counter.register_parry(3));
        assert_eq!(counter.count, 1);
    }

    #[test]
    fn test_reset_breaks_the_chain() {
        let mut counter = ParryCounter::default();
        counter.register_parry(3);
        counter.register_parry(3);
        counter.reset();
        assert!(!counter.register_parry(3));
        assert_eq!(counter.count, 1);
    }

    #[test]
    fn test_zero_threshold_behaves_like_one() {
        let mut counter = ParryCounter::default();
        assert!(counter.register_parry(0));
        assert_eq!(counter.count, 0);
    }
}
