//! Strike resolution
//!
//! Порядок (атомарно для одного удара):
//! 1. armor уже пробит → Absorbed (0 урона)
//! 2. armor цел → урон один раз, armor отмечен, без hit-reaction, return
//! 3. parrying (окно игрока или бросок врага) → Parried
//! 4. blocking → Blocked (урон × (1 − reduction))
//! 5. иначе → Landed
//! 6. health == 0 → Finishable (враг) / Dead (игрок)
//!
//! Эффекты на атакующего (stun, knockback) уходят командами, не прямой записью.

use bevy::prelude::*;
use rand::Rng;

use crate::collaborators::{AnimationIntent, Intent};
use crate::combat::combo::{cancel_combo, ArmorState};
use crate::combat::enemy::EnemyBrain;
use crate::combat::guard_break::{GuardBreakTriggered, ParryCounter};
use crate::combat::stun::CombatCommand;
use crate::components::{
    CombatFlag, CombatState, Health, LifeState, LockReason, ParryStance, Player, Position,
    StunCause, Window,
};
use crate::config::{CombatConfig, KnockbackParams};
use crate::finisher::CombatantFell;
use crate::knockback::{Easing, KnockbackRequest};
use crate::logger;
use crate::DeterministicRng;

/// Event: удар дошёл до defender'а (hit detection — на стороне host'а)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct StrikeEvent {
    /// None — снаряд/безымянный источник
    pub attacker: Option<Entity>,
    pub defender: Entity,
    pub damage: u32,
    /// Точка источника, если атакующего нет
    pub origin: Option<Vec2>,
    /// Перекрывает knockback по умолчанию для Blocked/Landed
    pub knockback: Option<KnockbackParams>,
}

impl StrikeEvent {
    pub fn melee(attacker: Entity, defender: Entity, damage: u32) -> Self {
        Self {
            attacker: Some(attacker),
            defender,
            damage,
            origin: None,
            knockback: None,
        }
    }

    pub fn projectile(defender: Entity, damage: u32, origin: Vec2) -> Self {
        Self {
            attacker: None,
            defender,
            damage,
            origin: Some(origin),
            knockback: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum StrikeOutcome {
    /// Удар по armor. `bleed_through` > 0 только у первого удара за combo.
    Absorbed { bleed_through: u32 },
    Parried,
    Blocked { damage: u32 },
    Landed { damage: u32 },
}

impl StrikeOutcome {
    pub fn damage(&self) -> u32 {
        match *self {
            StrikeOutcome::Absorbed { bleed_through } => bleed_through,
            StrikeOutcome::Parried => 0,
            StrikeOutcome::Blocked { damage } | StrikeOutcome::Landed { damage } => damage,
        }
    }
}

/// Event: итог resolution (journal, host)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct StrikeResolved {
    pub attacker: Option<Entity>,
    pub defender: Entity,
    pub outcome: StrikeOutcome,
    pub defender_fell: bool,
}

/// Численные правила resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeRules {
    pub block_damage_reduction: f32,
    pub armor_bleed_through: f32,
}

impl StrikeRules {
    pub fn from_config(config: &CombatConfig) -> Self {
        Self {
            block_damage_reduction: config.player.block_damage_reduction,
            armor_bleed_through: config.enemy.armor_bleed_through,
        }
    }
}

/// Defender-сторона удара
pub struct Defender<'a> {
    pub state: &'a mut CombatState,
    pub health: &'a mut Health,
    pub brain: Option<&'a mut EnemyBrain>,
    pub is_player: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub outcome: StrikeOutcome,
    /// Health дошёл до 0 на этом ударе (переход жизни уже выполнен)
    pub fell: bool,
    /// Combo defender'а прерван ударом
    pub interrupted: bool,
}

/// Классификация одного удара. Мутирует только defender'а.
pub fn classify_strike<R: Rng>(
    defender: Defender<'_>,
    damage: u32,
    rules: &StrikeRules,
    rng: &mut R,
) -> Classification {
    let Defender {
        state,
        health,
        brain,
        is_player,
    } = defender;

    // 1-2: armor
    let armored_bleed = match state.combo_mut() {
        Some(combo) => match combo.armor {
            ArmorState::Active { absorbed_hit: true } => Some(0),
            ArmorState::Active {
                absorbed_hit: false,
            } => {
                combo.armor = ArmorState::Active { absorbed_hit: true };
                Some(scale_damage(damage, rules.armor_bleed_through))
            }
            ArmorState::Inactive => None,
        },
        None => None,
    };

    if let Some(bleed) = armored_bleed {
        let applied = health.take_damage(bleed);
        return Classification {
            outcome: StrikeOutcome::Absorbed {
                bleed_through: applied,
            },
            fell: settle_death(state, health, is_player),
            interrupted: false,
        };
    }

    // 3: enemy one-shot draw (до проверки parrying)
    let mut interrupted = false;
    if let Some(brain) = brain {
        if !state.get_flag(CombatFlag::Stunned) && brain.draw_parry(rng) {
            interrupted = cancel_combo(state);
            state.parry = ParryStance::Drawn {
                hold: Window::opened(brain.parry_hold),
            };
        }
    }

    if state.parry.is_parrying() {
        return Classification {
            outcome: StrikeOutcome::Parried,
            fell: false,
            interrupted,
        };
    }

    // 4: block
    if state.get_flag(CombatFlag::Blocking) {
        let reduced = scale_damage(damage, 1.0 - rules.block_damage_reduction);
        let applied = health.take_damage(reduced);
        return Classification {
            outcome: StrikeOutcome::Blocked { damage: applied },
            fell: settle_death(state, health, is_player),
            interrupted,
        };
    }

    // 5: landed (armor уже исключён — прерываем combo)
    let applied = health.take_damage(damage);
    interrupted |= cancel_combo(state);
    Classification {
        outcome: StrikeOutcome::Landed { damage: applied },
        fell: settle_death(state, health, is_player),
        interrupted,
    }
}

/// damage × factor, округление к чётному на .5
pub fn scale_damage(damage: u32, factor: f32) -> u32 {
    let scaled = (damage as f32 * factor.clamp(0.0, 1.0)).round_ties_even();
    scaled.max(0.0) as u32
}

fn settle_death(state: &mut CombatState, health: &Health, is_player: bool) -> bool {
    if !health.is_depleted() || state.life != LifeState::Alive {
        return false;
    }
    if is_player {
        state.mark_dead();
    } else {
        state.enter_finishable();
    }
    true
}

/// Атакующий в момент удара
#[derive(Debug, Clone, Copy)]
struct AttackerInfo {
    entity: Entity,
    position: Vec2,
    is_player: bool,
}

/// Система: очередь ударов → классификация → команды/intents
#[allow(clippy::too_many_arguments)]
pub fn resolve_strikes(
    mut strikes: EventReader<StrikeEvent>,
    mut combatants: Query<(
        &mut CombatState,
        &mut Health,
        &Position,
        Has<Player>,
        Option<&mut EnemyBrain>,
    )>,
    mut counters: Query<&mut ParryCounter>,
    config: Res<CombatConfig>,
    mut rng: ResMut<DeterministicRng>,
    mut resolved: EventWriter<StrikeResolved>,
    mut combat_commands: EventWriter<CombatCommand>,
    mut guard_breaks: EventWriter<GuardBreakTriggered>,
    mut knockbacks: EventWriter<KnockbackRequest>,
    mut intents: EventWriter<AnimationIntent>,
    mut fallen: EventWriter<CombatantFell>,
) {
    let rules = StrikeRules::from_config(&config);

    for strike in strikes.read() {
        let defender = strike.defender;

        if strike.attacker == Some(defender) {
            logger::log_warning(&format!("⚠️ {:?} tried to strike itself", defender));
            continue;
        }

        // Defender должен быть жив и не в clash
        match combatants.get(defender) {
            Ok((state, ..)) if state.life != LifeState::Alive => {
                logger::log(&format!("⚔️ Strike on {:?} ignored ({:?})", defender, state.life));
                continue;
            }
            Ok((state, ..)) if state.get_flag(CombatFlag::Clashing) => {
                logger::log(&format!("⚔️ Strike on clashing {:?} ignored", defender));
                continue;
            }
            Ok(_) => {}
            Err(_) => {
                logger::log_warning(&format!("⚠️ Strike on unknown combatant {:?}", defender));
                continue;
            }
        }

        let attacker = match strike.attacker {
            Some(entity) => {
                let Ok((mut state, _, position, is_player, _)) = combatants.get_mut(entity) else {
                    logger::log_warning(&format!("⚠️ Strike from unknown attacker {:?}", entity));
                    continue;
                };
                if state.life != LifeState::Alive {
                    logger::log(&format!("⚔️ Strike from fallen {:?} ignored", entity));
                    continue;
                }
                if matches!(
                    state.lock,
                    Some(LockReason::Stunned { .. } | LockReason::Clashing { .. })
                ) {
                    logger::log(&format!("⚔️ Strike from locked {:?} ignored", entity));
                    continue;
                }
                // Один замах бьёт defender'а один раз
                if let Some(combo) = state.combo_mut() {
                    if !combo.register_swing_hit(defender) {
                        logger::log(&format!(
                            "⚔️ {:?} already struck {:?} this swing",
                            entity, defender
                        ));
                        continue;
                    }
                }
                Some(AttackerInfo {
                    entity,
                    position: position.0,
                    is_player,
                })
            }
            None => None,
        };

        let Ok((mut state, mut health, position, defender_is_player, brain)) =
            combatants.get_mut(defender)
        else {
            continue;
        };
        let defender_position = position.0;

        let classification = classify_strike(
            Defender {
                state: &mut state,
                health: &mut health,
                brain: brain.map(Mut::into_inner),
                is_player: defender_is_player,
            },
            strike.damage,
            &rules,
            &mut rng.rng,
        );
        let remaining_health = health.current;

        let source = attacker.map(|info| info.position).or(strike.origin);
        let attacker_is_player = attacker.is_some_and(|info| info.is_player);

        match classification.outcome {
            StrikeOutcome::Absorbed { bleed_through } => {
                if bleed_through > 0 {
                    intents.write(AnimationIntent::new(defender, Intent::HitEffect));
                    if attacker_is_player {
                        reset_counter(&mut counters, attacker);
                    }
                }
            }
            StrikeOutcome::Parried => {
                intents.write(AnimationIntent::new(defender, Intent::Parry));
                intents.write(AnimationIntent::new(defender, Intent::ParryEffect));

                if defender_is_player {
                    if let Ok(mut counter) = counters.get_mut(defender) {
                        counter.reset();
                    }
                    intents.write(AnimationIntent::new(defender, Intent::ParrySlowMotion));
                }

                match attacker {
                    Some(info) if info.is_player => {
                        let broke = counters
                            .get_mut(info.entity)
                            .map(|mut counter| counter.register_parry(config.guard_break.threshold))
                            .unwrap_or(false);

                        if broke {
                            guard_breaks.write(GuardBreakTriggered {
                                player: info.entity,
                                parried_by: defender,
                            });
                        } else {
                            combat_commands.write(CombatCommand::Stun {
                                target: info.entity,
                                duration: config.player.parried_stun,
                                cause: StunCause::Parried,
                            });
                            knockbacks.write(knockback_from(
                                defender_position,
                                info.entity,
                                config.player.parried_knockback,
                            ));
                        }
                    }
                    Some(info) => {
                        combat_commands.write(CombatCommand::Stun {
                            target: info.entity,
                            duration: config.enemy.parried_stun,
                            cause: StunCause::Parried,
                        });
                        knockbacks.write(knockback_from(
                            defender_position,
                            info.entity,
                            config.enemy.parried_knockback,
                        ));
                    }
                    None => {
                        logger::log(&format!(
                            "🛡️ {:?} parried a sourceless strike, nobody to stun",
                            defender
                        ));
                    }
                }
            }
            StrikeOutcome::Blocked { .. } => {
                intents.write(AnimationIntent::new(defender, Intent::BlockImpact));
                intents.write(AnimationIntent::new(defender, Intent::BlockEffect));

                if let (Some(source), false) = (source, classification.fell) {
                    let params = strike.knockback.unwrap_or(if defender_is_player {
                        config.player.block_knockback
                    } else {
                        config.enemy.hit_knockback
                    });
                    knockbacks.write(knockback_from(source, defender, params));
                }
                if attacker_is_player {
                    reset_counter(&mut counters, attacker);
                }
            }
            StrikeOutcome::Landed { .. } => {
                intents.write(AnimationIntent::new(defender, Intent::TakeDamage));
                intents.write(AnimationIntent::new(defender, Intent::HitEffect));

                if let (Some(source), false) = (source, classification.fell) {
                    let params = strike.knockback.unwrap_or(if defender_is_player {
                        config.player.hit_knockback
                    } else {
                        config.enemy.hit_knockback
                    });
                    knockbacks.write(knockback_from(source, defender, params));
                }
                if attacker_is_player {
                    reset_counter(&mut counters, attacker);
                }
            }
        }

        if classification.interrupted {
            intents.write(AnimationIntent::new(defender, Intent::AttackCancel));
        }

        if classification.fell {
            fallen.write(CombatantFell {
                entity: defender,
                is_player: defender_is_player,
            });
        }

        logger::log(&format!(
            "⚔️ ECS: {:?} → {:?}: {:?} (health {})",
            strike.attacker, defender, classification.outcome, remaining_health
        ));

        resolved.write(StrikeResolved {
            attacker: strike.attacker,
            defender,
            outcome: classification.outcome,
            defender_fell: classification.fell,
        });
    }
}

fn reset_counter(counters: &mut Query<&mut ParryCounter>, attacker: Option<AttackerInfo>) {
    if let Some(info) = attacker {
        if let Ok(mut counter) = counters.get_mut(info.entity) {
            counter.reset();
        }
    }
}

fn knockback_from(source: Vec2, target: Entity, params: KnockbackParams) -> KnockbackRequest {
    KnockbackRequest {
        source,
        target,
        distance: params.distance,
        duration: params.duration,
        easing: Easing::SmoothStep,
    }
}
