//! Knockback / positional resolution
//!
//! Position — единственный ресурс, за который спорят несколько подсистем
//! (locomotion, knockback, lunge, finisher warp). Правило: один writer за раз.
//! Пока у entity активное смещение (Motion::active), locomotion позицию не
//! пишет (MovementLockChanged + CombatSimulation::set_position отказывает).
//!
//! Смещение только по горизонтали. В конце — snap ровно в end, без дрейфа.

use bevy::prelude::*;

use crate::collaborators::{AnimationIntent, Intent, MovementLockChanged};
use crate::combat::phase::{PhaseEvent, PhaseMarker};
use crate::components::{CombatState, Facing, Position};
use crate::config::CombatConfig;
use crate::logger;
use crate::{CombatSet, SimulationClock};

pub mod easing;

pub use easing::Easing;

/// Event: оттолкнуть `target` от `source`
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct KnockbackRequest {
    pub source: Vec2,
    pub target: Entity,
    pub distance: f32,
    pub duration: f32,
    pub easing: Easing,
}

/// Event: отменить активное смещение (позиция остаётся где есть)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelDisplacement {
    pub entity: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum DisplacementKind {
    Knockback,
    Lunge,
}

/// Активное смещение
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Displacement {
    pub kind: DisplacementKind,
    pub start: Vec2,
    pub end: Vec2,
    pub elapsed: f32,
    pub duration: f32,
    pub easing: Easing,
}

impl Displacement {
    /// Knockback: горизонтально от source, по умолчанию назад от взгляда
    /// если source ровно над/под target
    pub fn knockback(
        start: Vec2,
        source: Vec2,
        facing: Facing,
        distance: f32,
        duration: f32,
        easing: Easing,
    ) -> Self {
        let dx = start.x - source.x;
        let direction = if dx > 0.0 {
            1.0
        } else if dx < 0.0 {
            -1.0
        } else {
            facing.opposite().sign()
        };

        Self {
            kind: DisplacementKind::Knockback,
            start,
            end: Vec2::new(start.x + direction * distance.max(0.0), start.y),
            elapsed: 0.0,
            duration: duration.max(0.0),
            easing,
        }
    }

    pub fn lunge(start: Vec2, facing: Facing, distance: f32, duration: f32) -> Self {
        Self {
            kind: DisplacementKind::Lunge,
            start,
            end: Vec2::new(start.x + facing.sign() * distance.max(0.0), start.y),
            elapsed: 0.0,
            duration: duration.max(0.0),
            easing: Easing::EaseOut,
        }
    }

    /// Продвинуть на `delta`. Возвращает позицию и флаг завершения.
    pub fn advance(&mut self, delta: f32) -> (Vec2, bool) {
        self.elapsed += delta.max(0.0);
        if self.elapsed >= self.duration {
            return (self.end, true);
        }
        let t = self.easing.sample(self.elapsed / self.duration);
        let x = self.start.x + (self.end.x - self.start.x) * t;
        (Vec2::new(x, self.start.y), false)
    }
}

/// Владение позицией: Some — позицию пишет resolver
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Motion {
    pub active: Option<Displacement>,
}

impl Motion {
    pub fn is_locked(&self) -> bool {
        self.active.is_some()
    }
}

pub struct KnockbackPlugin;

impl Plugin for KnockbackPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<KnockbackRequest>()
            .add_event::<CancelDisplacement>();

        // advance до start: смещение, запрошенное в тике k, двигает с тика k+1
        app.add_systems(
            Update,
            (
                cancel_displacements,
                advance_displacements,
                start_knockbacks,
                start_lunges,
            )
                .chain()
                .in_set(CombatSet::Displacement),
        );
    }
}

/// Stun, clash, finisher или падение держат движение после конца смещения
fn held_by_state(state: Option<&CombatState>) -> bool {
    state.is_some_and(|state| !state.is_actionable())
}

pub fn cancel_displacements(
    mut cancels: EventReader<CancelDisplacement>,
    mut motions: Query<(&mut Motion, Option<&CombatState>)>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for cancel in cancels.read() {
        let Ok((mut motion, state)) = motions.get_mut(cancel.entity) else {
            continue;
        };
        if motion.active.take().is_some() {
            if !held_by_state(state) {
                locks.write(MovementLockChanged {
                    entity: cancel.entity,
                    locked: false,
                });
            }
            logger::log(&format!("💨 {:?} displacement cancelled", cancel.entity));
        }
    }
}

pub fn advance_displacements(
    clock: Res<SimulationClock>,
    mut movers: Query<(Entity, &mut Motion, &mut Position, Option<&CombatState>)>,
    mut locks: EventWriter<MovementLockChanged>,
) {
    for (entity, mut motion, mut position, state) in movers.iter_mut() {
        let Some(displacement) = motion.active.as_mut() else {
            continue;
        };

        let (next, finished) = displacement.advance(clock.delta);
        position.0 = next;

        if finished {
            motion.active = None;
            if !held_by_state(state) {
                locks.write(MovementLockChanged {
                    entity,
                    locked: false,
                });
            }
        }
    }
}

/// Knockback явно вытесняет любое активное смещение
pub fn start_knockbacks(
    mut requests: EventReader<KnockbackRequest>,
    mut movers: Query<(&mut Motion, &mut Position, &Facing, Option<&CombatState>)>,
    mut locks: EventWriter<MovementLockChanged>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for request in requests.read() {
        let Ok((mut motion, mut position, facing, state)) = movers.get_mut(request.target) else {
            continue;
        };

        let displacement = Displacement::knockback(
            position.0,
            request.source,
            *facing,
            request.distance,
            request.duration,
            request.easing,
        );

        let was_locked = motion.is_locked();
        if let Some(previous) = motion.active.take() {
            logger::log(&format!(
                "💨 {:?} {:?} pre-empted by knockback",
                request.target, previous.kind
            ));
        }

        intents.write(AnimationIntent::new(request.target, Intent::KnockbackEffect));

        if displacement.duration <= 0.0 {
            position.0 = displacement.end;
            if was_locked && !held_by_state(state) {
                locks.write(MovementLockChanged {
                    entity: request.target,
                    locked: false,
                });
            }
            continue;
        }

        motion.active = Some(displacement);
        if !was_locked {
            locks.write(MovementLockChanged {
                entity: request.target,
                locked: true,
            });
        }
    }
}

/// Lunge отклоняется, если позицией уже кто-то владеет
pub fn start_lunges(
    mut phases: EventReader<PhaseEvent>,
    mut movers: Query<(&mut Motion, &Position, &Facing)>,
    config: Res<CombatConfig>,
    mut locks: EventWriter<MovementLockChanged>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for event in phases.read() {
        if event.marker != PhaseMarker::Lunge {
            continue;
        }

        let Ok((mut motion, position, facing)) = movers.get_mut(event.entity) else {
            continue;
        };

        if motion.is_locked() {
            logger::log(&format!("💨 {:?} position locked, lunge refused", event.entity));
            continue;
        }

        let lunge = Displacement::lunge(
            position.0,
            *facing,
            config.lunge.distance,
            config.lunge.duration,
        );
        motion.active = Some(lunge);
        intents.write(AnimationIntent::new(event.entity, Intent::Lunge));
        locks.write(MovementLockChanged {
            entity: event.entity,
            locked: true,
        });
    }
}
