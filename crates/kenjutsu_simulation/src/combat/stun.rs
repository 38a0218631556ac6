//! Cross-entity команды (stun, forced counter)
//!
//! Strike resolution никогда не трогает флаги атакующего напрямую: она пишет
//! CombatCommand, а apply_combat_commands применяет их после resolution,
//! до следующего тика.

use bevy::prelude::*;

use crate::collaborators::{AnimationIntent, Intent, MovementLockChanged};
use crate::combat::enemy::{EnemyBrain, PendingCounter};
use crate::components::{CombatState, LifeState, LockReason, StunCause, Window};
use crate::knockback::Motion;
use crate::logger;

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum CombatCommand {
    Stun {
        target: Entity,
        duration: f32,
        cause: StunCause,
    },
    /// Обходит cooldown/decision gating врага
    ForceCounterAttack { enemy: Entity, target: Entity },
}

pub fn apply_combat_commands(
    mut commands_in: EventReader<CombatCommand>,
    mut combatants: Query<(&mut CombatState, Option<&mut EnemyBrain>)>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for command in commands_in.read() {
        match *command {
            CombatCommand::Stun {
                target,
                duration,
                cause,
            } => {
                let Ok((mut state, brain)) = combatants.get_mut(target) else {
                    continue;
                };

                if state.life != LifeState::Alive {
                    logger::log(&format!("💫 {:?} not alive, stun dropped", target));
                    continue;
                }

                // Clash и finisher держат свой lock — stun их не перебивает
                if matches!(
                    state.lock,
                    Some(LockReason::Clashing { .. } | LockReason::Executing { .. })
                ) {
                    logger::log(&format!("💫 {:?} locked in encounter, stun dropped", target));
                    continue;
                }

                let already_locked = state.lock.is_some();
                state.stun(Window::opened(duration), cause);
                if let Some(mut brain) = brain {
                    brain.interrupt();
                }

                let intent = match cause {
                    StunCause::GuardBreak => Intent::GuardBreak,
                    StunCause::Parried | StunCause::Held => Intent::GetParried,
                };
                intents.write(AnimationIntent::new(target, intent));
                if !already_locked {
                    locks.write(MovementLockChanged {
                        entity: target,
                        locked: true,
                    });
                }
                logger::log(&format!(
                    "💫 ECS: {:?} stunned for {:.2}s ({:?})",
                    target, duration, cause
                ));
            }
            CombatCommand::ForceCounterAttack { enemy, target } => {
                let Ok((state, Some(mut brain))) = combatants.get_mut(enemy) else {
                    continue;
                };

                if state.life != LifeState::Alive {
                    continue;
                }

                let delay = brain.counter_warning_delay;
                brain.counter = Some(PendingCounter {
                    target,
                    warning: Window::opened(delay),
                });
                intents.write(AnimationIntent::new(enemy, Intent::CounterWarning));
                logger::log(&format!(
                    "💥 ECS: {:?} ordered to counter {:?} in {:.2}s",
                    enemy, target, delay
                ));
            }
        }
    }
}

/// Система: истечение stun'а
pub fn tick_stuns(
    clock: Res<crate::SimulationClock>,
    mut combatants: Query<(Entity, &mut CombatState, Option<&Motion>)>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for (entity, mut state, motion) in combatants.iter_mut() {
        let Some(LockReason::Stunned { window, .. }) = state.lock.as_mut() else {
            continue;
        };

        if window.tick(clock.delta) {
            state.lock = None;
            intents.write(AnimationIntent::new(entity, Intent::StunRecover));
            // Активный knockback сам снимет lock по завершении
            if !motion.is_some_and(Motion::is_locked) {
                locks.write(MovementLockChanged {
                    entity,
                    locked: false,
                });
            }
            logger::log(&format!("💫 ECS: {:?} recovered from stun", entity));
        }
    }
}
