//! Finisher / execution handshake
//!
//! Two-phase commit между атакующим и finishable defender'ом:
//! (a) enter_finishable — health 0 или выигранный clash: действия выключены,
//!     цель видна в SpatialIndex как finishable
//! (b) execute — после warp + анимации: finishable → dead, despawn через
//!     grace delay
//!
//! execute на не-finishable цели = лог + no-op (standalone и clash пути
//! могут прийти оба).

use bevy::prelude::*;

use crate::collaborators::{
    AnimationIntent, CameraZoom, Collaborators, Intent, MovementLockChanged,
};
use crate::combat::combo::cancel_combo;
use crate::components::{
    CombatFlag, CombatState, Facing, LifeState, LockReason, ParryStance, Player, Position,
    Window,
};
use crate::config::CombatConfig;
use crate::knockback::Motion;
use crate::logger;
use crate::spatial::{rebuild_spatial_index, SpatialIndex};
use crate::{CombatSet, SimulationClock};

// ============================================================================
// Events
// ============================================================================

/// Health дошёл до 0 в strike resolution (переход жизни уже выполнен)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatantFell {
    pub entity: Entity,
    pub is_player: bool,
}

/// Перевести живого участника в finishable (clash win)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterFinishable {
    pub entity: Entity,
}

/// Standalone finisher: атакующий ищет ближайшую finishable цель
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinisherRequest {
    pub attacker: Entity,
}

/// Начать finisher на конкретной цели (после scan или clash win)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeginFinisher {
    pub attacker: Entity,
    pub target: Entity,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub target: Entity,
    pub executor: Option<Entity>,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatantExecuted {
    pub target: Entity,
    pub executor: Option<Entity>,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatantRemoved {
    pub entity: Entity,
}

// ============================================================================
// Components
// ============================================================================

/// Атакующий проигрывает finisher на `target`
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct FinisherSequence {
    pub target: Entity,
    pub window: Window,
}

/// Entity будет удалена когда окно закроется
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct DespawnAfter {
    pub window: Window,
}

pub struct FinisherPlugin;

impl Plugin for FinisherPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CombatantFell>()
            .add_event::<EnterFinishable>()
            .add_event::<FinisherRequest>()
            .add_event::<BeginFinisher>()
            .add_event::<ExecuteRequest>()
            .add_event::<CombatantExecuted>()
            .add_event::<CombatantRemoved>();

        app.add_systems(
            Update,
            (
                announce_fallen,
                apply_enter_finishable,
                rebuild_spatial_index,
                process_finisher_requests,
                begin_finishers,
                advance_finisher_sequences,
                apply_executions,
                despawn_after_timeout,
            )
                .chain()
                .in_set(CombatSet::Finisher),
        );
    }
}

// ============================================================================
// Phase (a): enter finishable
// ============================================================================

fn announce_finishable(
    entity: Entity,
    intents: &mut EventWriter<AnimationIntent>,
    locks: &mut EventWriter<MovementLockChanged>,
) {
    intents.write(AnimationIntent::new(entity, Intent::EnterFinishable));
    locks.write(MovementLockChanged {
        entity,
        locked: true,
    });
    logger::log_info(&format!("☠️ ECS: {:?} is finishable", entity));
}

/// Side effects падения (переход жизни сделан в strike resolution)
pub fn announce_fallen(
    mut fallen: EventReader<CombatantFell>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for event in fallen.read() {
        if event.is_player {
            intents.write(AnimationIntent::new(event.entity, Intent::Death));
            locks.write(MovementLockChanged {
                entity: event.entity,
                locked: true,
            });
            logger::log_info(&format!("💀 ECS: player {:?} died", event.entity));
        } else {
            announce_finishable(event.entity, &mut intents, &mut locks);
        }
    }
}

pub fn apply_enter_finishable(
    mut requests: EventReader<EnterFinishable>,
    mut states: Query<&mut CombatState>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for request in requests.read() {
        let Ok(mut state) = states.get_mut(request.entity) else {
            continue;
        };

        match state.life {
            LifeState::Alive => {
                state.enter_finishable();
                announce_finishable(request.entity, &mut intents, &mut locks);
            }
            LifeState::Finishable => {
                logger::log(&format!("☠️ {:?} already finishable", request.entity));
            }
            LifeState::Dead => {
                logger::log(&format!("☠️ {:?} is dead, cannot become finishable", request.entity));
            }
        }
    }
}

// ============================================================================
// Warp + animation sequence
// ============================================================================

/// Scan: ближайшая finishable цель в радиусе
pub fn process_finisher_requests(
    mut requests: EventReader<FinisherRequest>,
    states: Query<&CombatState>,
    index: Res<SpatialIndex>,
    config: Res<CombatConfig>,
    collaborators: Res<Collaborators>,
    mut begins: EventWriter<BeginFinisher>,
) {
    for request in requests.read() {
        let Ok(state) = states.get(request.attacker) else {
            continue;
        };

        if !state.is_actionable() {
            logger::log(&format!("☠️ {:?} not actionable, finisher ignored", request.attacker));
            continue;
        }

        if !collaborators.is_grounded(request.attacker) {
            logger::log(&format!("☠️ {:?} airborne, finisher ignored", request.attacker));
            continue;
        }

        let Some(origin) = index.position_of(request.attacker) else {
            continue;
        };

        match index.nearest_finishable(origin, config.finisher.range, request.attacker) {
            Some(target) => {
                begins.write(BeginFinisher {
                    attacker: request.attacker,
                    target,
                });
            }
            None => {
                logger::log(&format!("☠️ No finishable target near {:?}", request.attacker));
            }
        }
    }
}

/// Warp атакующего к цели, lock, intents, camera zoom
#[allow(clippy::too_many_arguments)]
pub fn begin_finishers(
    mut commands: Commands,
    mut begins: EventReader<BeginFinisher>,
    mut participants: Query<(&mut CombatState, &mut Position, &mut Facing, &mut Motion)>,
    config: Res<CombatConfig>,
    mut intents: EventWriter<AnimationIntent>,
    mut zooms: EventWriter<CameraZoom>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for begin in begins.read() {
        let Ok([attacker, target]) = participants.get_many_mut([begin.attacker, begin.target])
        else {
            logger::log_warning(&format!(
                "⚠️ Finisher {:?} → {:?}: participant missing",
                begin.attacker, begin.target
            ));
            if let Ok((mut state, ..)) = participants.get_mut(begin.attacker) {
                release_stale_clash(&mut state, begin, &mut locks);
            }
            continue;
        };
        let (mut attacker_state, mut attacker_position, mut attacker_facing, mut motion) = attacker;
        let (target_state, target_position, ..) = target;

        if target_state.life != LifeState::Finishable {
            logger::log(&format!("☠️ {:?} no longer finishable, finisher skipped", begin.target));
            release_stale_clash(&mut attacker_state, begin, &mut locks);
            continue;
        }

        // Clash handoff: атакующий ещё в Clashing с этой целью
        let clash_handoff = matches!(
            attacker_state.lock,
            Some(LockReason::Clashing { opponent }) if opponent == Some(begin.target)
        );
        if attacker_state.life != LifeState::Alive
            || (!attacker_state.is_actionable() && !clash_handoff)
        {
            logger::log(&format!("☠️ {:?} cannot perform finisher now", begin.attacker));
            release_stale_clash(&mut attacker_state, begin, &mut locks);
            continue;
        }

        // Warp — явный writer позиции: активное смещение отменяется
        if motion.active.take().is_some() {
            logger::log(&format!("💨 {:?} displacement cancelled by finisher warp", begin.attacker));
        }

        let facing = Facing::toward(attacker_position.0.x, target_position.0.x);
        attacker_position.0 = Vec2::new(
            target_position.0.x - facing.sign() * config.finisher.warp_offset,
            attacker_position.0.y,
        );
        *attacker_facing = facing;

        cancel_combo(&mut attacker_state);
        attacker_state.parry = ParryStance::None;
        attacker_state.lock = Some(LockReason::Executing {
            target: Some(begin.target),
        });

        commands.entity(begin.attacker).insert(FinisherSequence {
            target: begin.target,
            window: Window::opened(config.finisher.duration),
        });

        intents.write(AnimationIntent::new(begin.attacker, Intent::PerformFinisher));
        intents.write(AnimationIntent::new(begin.target, Intent::ReceiveFinisher));
        zooms.write(CameraZoom {
            target: begin.target,
            duration: config.finisher.camera_zoom,
        });
        locks.write(MovementLockChanged {
            entity: begin.attacker,
            locked: true,
        });

        logger::log_info(&format!(
            "🗡️ ECS: {:?} performs finisher on {:?}{}",
            begin.attacker,
            begin.target,
            if clash_handoff { " (clash win)" } else { "" }
        ));
    }
}

/// Handoff не состоялся: clash lock атакующего больше ничего не держит
fn release_stale_clash(
    state: &mut CombatState,
    begin: &BeginFinisher,
    locks: &mut EventWriter<MovementLockChanged>,
) {
    let clashing_target = matches!(
        state.lock,
        Some(LockReason::Clashing { opponent }) if opponent == Some(begin.target)
    );
    if !clashing_target {
        return;
    }

    state.lock = None;
    locks.write(MovementLockChanged {
        entity: begin.attacker,
        locked: false,
    });
    logger::log(&format!("⚔️ {:?} released from stale clash lock", begin.attacker));
}

/// Конец анимации finisher'а → execute цели, атакующий свободен
pub fn advance_finisher_sequences(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    mut sequences: Query<(Entity, &mut FinisherSequence, &mut CombatState)>,
    mut executes: EventWriter<ExecuteRequest>,
    mut intents: EventWriter<AnimationIntent>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for (attacker, mut sequence, mut state) in sequences.iter_mut() {
        sequence.window.tick(clock.delta);
        if sequence.window.is_open() {
            continue;
        }

        commands.entity(attacker).remove::<FinisherSequence>();

        if matches!(state.lock, Some(LockReason::Executing { .. })) {
            state.lock = None;
        }

        if state.life != LifeState::Alive {
            logger::log(&format!("☠️ {:?} fell mid-finisher, execution aborted", attacker));
            continue;
        }

        executes.write(ExecuteRequest {
            target: sequence.target,
            executor: Some(attacker),
        });
        intents.write(AnimationIntent::new(attacker, Intent::FinisherComplete));
        locks.write(MovementLockChanged {
            entity: attacker,
            locked: false,
        });
    }
}

// ============================================================================
// Phase (b): execute
// ============================================================================

pub fn apply_executions(
    mut commands: Commands,
    mut requests: EventReader<ExecuteRequest>,
    mut states: Query<(&mut CombatState, Has<Player>)>,
    config: Res<CombatConfig>,
    mut executed: EventWriter<CombatantExecuted>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for request in requests.read() {
        let Ok((mut state, is_player)) = states.get_mut(request.target) else {
            continue;
        };

        if !state.get_flag(CombatFlag::Finishable) {
            logger::log(&format!(
                "☠️ execute({:?}) ignored: not finishable ({:?})",
                request.target, state.life
            ));
            continue;
        }

        state.mark_dead();
        intents.write(AnimationIntent::new(request.target, Intent::Executed));
        executed.write(CombatantExecuted {
            target: request.target,
            executor: request.executor,
        });

        // Игрок остаётся в мире мёртвым, враги уходят после grace
        if !is_player {
            commands.entity(request.target).insert(DespawnAfter {
                window: Window::opened(config.finisher.despawn_grace),
            });
        }

        logger::log_info(&format!("🗡️ ECS: {:?} executed", request.target));
    }
}

pub fn despawn_after_timeout(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    mut pending: Query<(Entity, &mut DespawnAfter)>,
    mut removed: EventWriter<CombatantRemoved>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for (entity, mut despawn) in pending.iter_mut() {
        despawn.window.tick(clock.delta);
        if despawn.window.is_open() {
            continue;
        }

        intents.write(AnimationIntent::new(entity, Intent::Despawn));
        removed.write(CombatantRemoved { entity });
        commands.entity(entity).despawn();
        logger::log(&format!("🗑️ ECS: {:?} despawned", entity));
    }
}
