//! Enemy parry decision + forced counter-attack
//!
//! Parry врага — не окно, а один бросок на удар:
//! 1. "incoming attack" уведомление открывает readiness (0.5s)
//! 2. Удар во время readiness → Bernoulli(parry_chance), readiness закрывается
//! 3. Удачный бросок → ParryStance::Drawn до "parry-end"/stun/hold timeout
//!
//! Player parry window (defense.rs) — отдельный механизм, не путать.

use bevy::prelude::*;
use rand::Rng;

use crate::collaborators::{AnimationIntent, Intent};
use crate::combat::combo::ComboProfile;
use crate::combat::phase::{PhaseEvent, PhaseMarker};
use crate::components::{CombatFlag, CombatPhase, CombatState, LifeState, ParryStance, Window};
use crate::config::{CombatConfig, EnemyTuning};
use crate::logger;
use crate::spatial::SpatialIndex;

/// Отложенная forced counter-attack (warning → атака)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PendingCounter {
    pub target: Entity,
    pub warning: Window,
}

/// Решения врага: parry readiness, cooldown атаки, counter
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct EnemyBrain {
    pub parry_chance: f32,
    pub readiness_duration: f32,
    pub parry_hold: f32,
    pub attack_cooldown: f32,
    pub counter_warning_delay: f32,
    pub readiness: Window,
    pub cooldown: Window,
    pub counter: Option<PendingCounter>,
}

impl Default for EnemyBrain {
    fn default() -> Self {
        Self::from_tuning(&EnemyTuning::default())
    }
}

impl EnemyBrain {
    pub fn from_tuning(tuning: &EnemyTuning) -> Self {
        Self {
            parry_chance: tuning.parry_chance.clamp(0.0, 1.0),
            readiness_duration: tuning.readiness_window,
            parry_hold: tuning.parry_hold,
            attack_cooldown: tuning.attack_cooldown,
            counter_warning_delay: tuning.counter_warning_delay,
            readiness: Window::CLOSED,
            cooldown: Window::CLOSED,
            counter: None,
        }
    }

    pub fn open_readiness(&mut self) {
        let duration = self.readiness_duration;
        self.readiness.open(duration);
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_open()
    }

    /// Один бросок на удар. Readiness расходуется при любом исходе.
    pub fn draw_parry<R: Rng>(&mut self, rng: &mut R) -> bool {
        if !self.readiness.close() {
            return false;
        }
        rng.gen_bool(f64::from(self.parry_chance.clamp(0.0, 1.0)))
    }

    /// Stun/смерть/clash гасят всё, что враг собирался сделать
    pub fn interrupt(&mut self) {
        self.readiness.close();
        self.counter = None;
    }
}

/// Event: внешнее уведомление "по тебе сейчас ударят"
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingAttack {
    pub enemy: Entity,
}

/// Система: открыть readiness по уведомлению
pub fn process_incoming_attack_notices(
    mut notices: EventReader<IncomingAttack>,
    mut enemies: Query<(&CombatState, &mut EnemyBrain)>,
) {
    for notice in notices.read() {
        let Ok((state, mut brain)) = enemies.get_mut(notice.enemy) else {
            continue;
        };
        open_readiness_if_able(notice.enemy, state, &mut brain);
    }
}

/// Система: "parry-end" снимает drawn parry, "alert-enemies" будит врагов рядом
pub fn process_enemy_phase_events(
    mut phases: EventReader<PhaseEvent>,
    mut enemies: Query<(&mut CombatState, &mut EnemyBrain)>,
    index: Res<SpatialIndex>,
    config: Res<CombatConfig>,
) {
    for event in phases.read() {
        match event.marker {
            PhaseMarker::ParryEnd => {
                if let Ok((mut state, _)) = enemies.get_mut(event.entity) {
                    if matches!(state.parry, ParryStance::Drawn { .. }) {
                        state.parry = ParryStance::None;
                    }
                }
            }
            PhaseMarker::AlertEnemies => {
                let Some(origin) = index.position_of(event.entity) else {
                    continue;
                };
                for enemy in index.enemies_within(origin, config.enemy.alert_radius) {
                    if enemy == event.entity {
                        continue;
                    }
                    if let Ok((state, mut brain)) = enemies.get_mut(enemy) {
                        open_readiness_if_able(enemy, &state, &mut brain);
                    }
                }
            }
            _ => {}
        }
    }
}

fn open_readiness_if_able(enemy: Entity, state: &CombatState, brain: &mut EnemyBrain) {
    if state.get_flag(CombatFlag::Stunned) {
        logger::log(&format!("🛡️ {:?} stunned, readiness not opened", enemy));
        return;
    }
    if state.life != LifeState::Alive {
        return;
    }
    brain.open_readiness();
}

/// Система: таймеры врага + запуск forced counter-attack по истечении warning
pub fn tick_enemy_brains(
    clock: Res<crate::SimulationClock>,
    mut enemies: Query<(Entity, &mut EnemyBrain, &mut CombatState, &ComboProfile)>,
    mut intents: EventWriter<AnimationIntent>,
) {
    let delta = clock.delta;

    for (entity, mut brain, mut state, profile) in enemies.iter_mut() {
        brain.readiness.tick(delta);
        brain.cooldown.tick(delta);

        let Some(mut counter) = brain.counter else {
            continue;
        };

        counter.warning.tick(delta);
        if counter.warning.is_open() {
            brain.counter = Some(counter);
            continue;
        }

        brain.counter = None;

        // Forced counter обходит cooldown, но не lock/смерть
        if !state.is_actionable() {
            logger::log(&format!(
                "💥 {:?} counter-attack aborted (not actionable)",
                entity
            ));
            continue;
        }

        state.phase = CombatPhase::Attacking(profile.start());
        let cooldown = brain.attack_cooldown;
        brain.cooldown.open(cooldown);
        intents.write(AnimationIntent::new(entity, Intent::CounterAttack));
        intents.write(AnimationIntent::new(entity, Intent::Attack { step: 1 }));
        logger::log(&format!(
            "💥 ECS: {:?} forced counter-attack on {:?}",
            entity, counter.target
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn brain_with_chance(chance: f32) -> EnemyBrain {
        EnemyBrain::from_tuning(&EnemyTuning {
            parry_chance: chance,
            ..default()
        })
    }

    #[test]
    fn test_draw_requires_readiness() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = brain_with_chance(1.0);

        assert!(!brain.draw_parry(&mut rng));

        brain.open_readiness();
        assert!(brain.is_ready());
        assert!(brain.draw_parry(&mut rng));
    }

    #[test]
    fn test_draw_consumes_readiness_even_on_failure() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut brain = brain_with_chance(0.0);

        brain.open_readiness();
        assert!(!brain.draw_parry(&mut rng));
        assert!(!brain.is_ready());
    }

    #[test]
    fn test_readiness_expires() {
        let mut brain = brain_with_chance(1.0);
        brain.open_readiness();

        brain.readiness.tick(0.3);
        assert!(brain.is_ready());
        brain.readiness.tick(0.25);
        assert!(!brain.is_ready());
    }

    #[test]
    fn test_draw_rate_follows_chance() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut brain = brain_with_chance(0.5);

        let parried = (0..1000)
            .filter(|_| {
                brain.open_readiness();
                brain.draw_parry(&mut rng)
            })
            .count();

        assert!((400..600).contains(&parried), "parried {} of 1000", parried);
    }

    #[test]
    fn test_interrupt_clears_counter() {
        let mut brain = brain_with_chance(0.5);
        brain.open_readiness();
        brain.counter = Some(PendingCounter {
            target: Entity::PLACEHOLDER,
            warning: Window::opened(0.6),
        });

        brain.interrupt();

        assert!(!brain.is_ready());
        assert!(brain.counter.is_none());
    }
}
