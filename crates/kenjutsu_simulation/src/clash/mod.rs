//! Clash encounter
//!
//! Внешний триггер (одновременные атаки) → lock обоих → prompt loop →
//! judgment:
//! - correct >= required_wins → defender finishable, атакующий в finisher
//! - иначе → асимметричный knockback, locks сняты, armor атакующего сброшен

use bevy::prelude::*;

use crate::collaborators::{AnimationIntent, CameraZoom, Intent, MovementLockChanged};
use crate::combat::combo::cancel_combo;
use crate::components::{CombatState, LockReason, ParryStance, Position};
use crate::config::{CombatConfig, KnockbackParams};
use crate::finisher::{BeginFinisher, EnterFinishable};
use crate::knockback::{Easing, KnockbackRequest, Motion};
use crate::logger;
use crate::{CombatSet, DeterministicRng, SimulationClock};

pub mod encounter;

pub use encounter::{ClashEncounter, ClashStage, ClashStep, ClashVerdict, PromptResult};

/// Event: начать clash
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClashRequest {
    pub attacker: Entity,
    pub defender: Entity,
}

/// Event: нажатая клавиша участника clash'а
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct ClashInput {
    pub entity: Entity,
    pub key: String,
}

/// Event: прервать clash без judgment (оба свободны, без knockback)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelClash {
    pub entity: Entity,
}

/// Event: итог encounter'а (ровно один на encounter)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClashJudged {
    pub attacker: Entity,
    pub defender: Entity,
    pub correct: u32,
    pub required: u32,
    pub verdict: ClashVerdict,
}

pub struct ClashPlugin;

impl Plugin for ClashPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ClashRequest>()
            .add_event::<ClashInput>()
            .add_event::<CancelClash>()
            .add_event::<ClashJudged>();

        app.add_systems(
            Update,
            (
                start_clashes,
                cancel_clashes,
                process_clash_inputs,
                advance_clash_encounters,
            )
                .chain()
                .in_set(CombatSet::Encounters),
        );
    }
}

/// Phase 1: lock
pub fn start_clashes(
    mut commands: Commands,
    mut requests: EventReader<ClashRequest>,
    mut states: Query<&mut CombatState>,
    config: Res<CombatConfig>,
    mut intents: EventWriter<AnimationIntent>,
    mut zooms: EventWriter<CameraZoom>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for request in requests.read() {
        let Ok([mut attacker, mut defender]) =
            states.get_many_mut([request.attacker, request.defender])
        else {
            logger::log_warning(&format!(
                "⚠️ Clash {:?} vs {:?}: invalid pair",
                request.attacker, request.defender
            ));
            continue;
        };

        if !attacker.is_actionable() || !defender.is_actionable() {
            logger::log(&format!(
                "⚔️ Clash {:?} vs {:?} refused: participant not actionable",
                request.attacker, request.defender
            ));
            continue;
        }

        // Combo атакующего (и его armor) живёт до judgment
        attacker.parry = ParryStance::None;
        attacker.lock = Some(LockReason::Clashing {
            opponent: Some(request.defender),
        });

        cancel_combo(&mut defender);
        defender.parry = ParryStance::None;
        defender.lock = Some(LockReason::Clashing {
            opponent: Some(request.attacker),
        });

        commands.spawn(ClashEncounter::new(
            request.attacker,
            request.defender,
            &config.clash,
        ));

        for entity in [request.attacker, request.defender] {
            intents.write(AnimationIntent::new(entity, Intent::ClashStart));
            locks.write(MovementLockChanged {
                entity,
                locked: true,
            });
        }
        zooms.write(CameraZoom {
            target: request.defender,
            duration: config.clash.estimated_duration(),
        });

        logger::log_info(&format!(
            "⚔️⚔️ ECS: CLASH {:?} vs {:?}",
            request.attacker, request.defender
        ));
    }
}

pub fn cancel_clashes(
    mut commands: Commands,
    mut cancels: EventReader<CancelClash>,
    encounters: Query<(Entity, &ClashEncounter)>,
    mut states: Query<&mut CombatState>,
    motions: Query<&Motion>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for cancel in cancels.read() {
        let Some((encounter_entity, encounter)) = encounters
            .iter()
            .find(|(_, encounter)| encounter.involves(cancel.entity))
        else {
            continue;
        };

        release_clash_lock(&mut states, &motions, &mut locks, encounter.attacker);
        release_clash_lock(&mut states, &motions, &mut locks, encounter.defender);
        commands.entity(encounter_entity).despawn();
        logger::log(&format!(
            "⚔️ Clash {:?} vs {:?} cancelled",
            encounter.attacker, encounter.defender
        ));
    }
}

/// Phase 2: ввод участника
pub fn process_clash_inputs(
    mut inputs: EventReader<ClashInput>,
    mut encounters: Query<&mut ClashEncounter>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for input in inputs.read() {
        let Some(mut encounter) = encounters
            .iter_mut()
            .find(|encounter| encounter.involves(input.entity))
        else {
            logger::log(&format!("⚔️ {:?} is not clashing, input ignored", input.entity));
            continue;
        };

        // Prompt'ы отвечает только атакующий
        if input.entity != encounter.attacker {
            logger::log(&format!(
                "⚔️ Clash input from defender {:?} ignored",
                input.entity
            ));
            continue;
        }

        match encounter.submit(&input.key) {
            Some(PromptResult::Correct) => {
                intents.write(AnimationIntent::new(encounter.attacker, Intent::ClashHit));
            }
            Some(_) => {
                intents.write(AnimationIntent::new(encounter.attacker, Intent::ClashMiss));
            }
            None => {
                logger::log(&format!("⚔️ No open prompt for {:?}", input.entity));
            }
        }
    }
}

/// Phase 2-3: prompt loop + judgment
#[allow(clippy::too_many_arguments)]
pub fn advance_clash_encounters(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<CombatConfig>,
    mut rng: ResMut<DeterministicRng>,
    mut encounters: Query<(Entity, &mut ClashEncounter)>,
    mut states: Query<&mut CombatState>,
    motions: Query<&Motion>,
    positions: Query<&Position>,
    mut judged: EventWriter<ClashJudged>,
    mut finishables: EventWriter<EnterFinishable>,
    mut finishers: EventWriter<BeginFinisher>,
    mut knockbacks: EventWriter<KnockbackRequest>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for (encounter_entity, mut encounter) in encounters.iter_mut() {
        let step = encounter.advance(clock.delta, &config.clash.prompts, &mut rng.rng);

        let verdict = match step {
            ClashStep::Waiting => continue,
            ClashStep::Prompted(key) => {
                intents.write(AnimationIntent::new(encounter.attacker, Intent::ClashPrompt { key }));
                continue;
            }
            ClashStep::Scored(_) => {
                intents.write(AnimationIntent::new(encounter.attacker, Intent::ClashMiss));
                continue;
            }
            ClashStep::Judged(verdict) => verdict,
        };

        let (attacker, defender) = (encounter.attacker, encounter.defender);

        match verdict {
            ClashVerdict::FinisherHandoff => {
                // Без обычного cleanup: атакующий остаётся locked до begin_finishers
                finishables.write(EnterFinishable { entity: defender });
                finishers.write(BeginFinisher {
                    attacker,
                    target: defender,
                });
            }
            ClashVerdict::PunishAndRelease => {
                let tuning = &config.clash;
                let attacker_position = positions.get(attacker).map(|p| p.0).ok();
                let defender_position = positions.get(defender).map(|p| p.0).ok();

                if let Some(source) = attacker_position {
                    knockbacks.write(clash_knockback(source, defender, tuning.loss_defender_knockback));
                }
                if let Some(source) = defender_position {
                    knockbacks.write(clash_knockback(source, attacker, tuning.loss_attacker_knockback));
                }

                release_clash_lock(&mut states, &motions, &mut locks, attacker);
                release_clash_lock(&mut states, &motions, &mut locks, defender);

                if let Ok(mut state) = states.get_mut(attacker) {
                    if cancel_combo(&mut state) {
                        intents.write(AnimationIntent::new(attacker, Intent::AttackCancel));
                    }
                }
                intents.write(AnimationIntent::new(attacker, Intent::ClashLost));
            }
        }

        judged.write(ClashJudged {
            attacker,
            defender,
            correct: encounter.correct,
            required: encounter.required_wins,
            verdict,
        });
        commands.entity(encounter_entity).despawn();

        logger::log_info(&format!(
            "⚔️⚔️ ECS: clash {:?} vs {:?} judged {:?} ({}/{})",
            attacker, defender, verdict, encounter.correct, encounter.required_wins
        ));
    }
}

/// Снять Clashing lock (идемпотентно)
fn release_clash_lock(
    states: &mut Query<&mut CombatState>,
    motions: &Query<&Motion>,
    locks: &mut EventWriter<MovementLockChanged>,
    entity: Entity,
) {
    let Ok(mut state) = states.get_mut(entity) else {
        return;
    };
    if matches!(state.lock, Some(LockReason::Clashing { .. })) {
        state.lock = None;
        if !motions.get(entity).is_ok_and(Motion::is_locked) {
            locks.write(MovementLockChanged {
                entity,
                locked: false,
            });
        }
    }
}

fn clash_knockback(source: Vec2, target: Entity, params: KnockbackParams) -> KnockbackRequest {
    KnockbackRequest {
        source,
        target,
        distance: params.distance,
        duration: params.duration,
        easing: Easing::SmoothStep,
    }
}
