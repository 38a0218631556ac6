//! Внешние collaborators ядра
//!
//! Ядро ничего не рендерит и не двигает физику само. Оно пишет intent-события
//! (AnimationIntent, CameraZoom, MovementLockChanged), а dispatch система в
//! конце тика пересылает их в привязанные host'ом trait objects.
//!
//! Нет привязанного collaborator'а → intent пропускается (debug log),
//! тик продолжается.

use bevy::prelude::*;

use crate::logger;

/// Animation/effect sink: fire-and-forget
pub trait AnimationSink: Send + Sync {
    fn play(&self, entity: Entity, intent: &str);
}

/// Physics/locomotion collaborator
pub trait LocomotionDriver: Send + Sync {
    fn is_grounded(&self, entity: Entity) -> bool;
    fn lock_movement(&self, entity: Entity, locked: bool);
}

/// Camera collaborator: fire-and-forget
pub trait CameraRig: Send + Sync {
    fn zoom(&self, target: Entity, duration: f32);
}

/// Привязанные host'ом collaborators (любой может отсутствовать)
#[derive(Resource, Default)]
pub struct Collaborators {
    pub animation: Option<Box<dyn AnimationSink>>,
    pub locomotion: Option<Box<dyn LocomotionDriver>>,
    pub camera: Option<Box<dyn CameraRig>>,
}

impl Collaborators {
    /// Без locomotion driver'а считаем что все стоят на земле
    pub fn is_grounded(&self, entity: Entity) -> bool {
        self.locomotion
            .as_ref()
            .map_or(true, |driver| driver.is_grounded(entity))
    }
}

/// Именованные intents для animation/effect collaborator'а
#[derive(Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum Intent {
    Attack { step: u8 },
    ComboEnd,
    AttackCancel,
    Block,
    BlockRelease,
    TakeDamage,
    BlockImpact,
    Parry,
    GetParried,
    GuardBreak,
    StunRecover,
    CounterWarning,
    CounterAttack,
    ClashStart,
    ClashPrompt { key: String },
    ClashHit,
    ClashMiss,
    ClashLost,
    EnterFinishable,
    PerformFinisher,
    ReceiveFinisher,
    FinisherComplete,
    Executed,
    Death,
    Despawn,
    Lunge,
    // Эффекты (vfx/sfx), не анимации
    ParryEffect,
    BlockEffect,
    HitEffect,
    ParrySlowMotion,
    KnockbackEffect,
}

impl Intent {
    pub fn name(&self) -> String {
        let name = match self {
            Intent::Attack { step } => return format!("attack-{}", step),
            Intent::ClashPrompt { key } => return format!("clash-prompt-{}", key),
            Intent::ComboEnd => "combo-end",
            Intent::AttackCancel => "attack-cancel",
            Intent::Block => "block",
            Intent::BlockRelease => "block-release",
            Intent::TakeDamage => "take-damage",
            Intent::BlockImpact => "block-impact",
            Intent::Parry => "parry",
            Intent::GetParried => "get-parried",
            Intent::GuardBreak => "guard-break",
            Intent::StunRecover => "stun-recover",
            Intent::CounterWarning => "counter-warning",
            Intent::CounterAttack => "counter-attack",
            Intent::ClashStart => "clash-start",
            Intent::ClashHit => "clash-hit",
            Intent::ClashMiss => "clash-miss",
            Intent::ClashLost => "clash-lost",
            Intent::EnterFinishable => "enter-finishable",
            Intent::PerformFinisher => "perform-finisher",
            Intent::ReceiveFinisher => "receive-finisher",
            Intent::FinisherComplete => "finisher-complete",
            Intent::Executed => "executed",
            Intent::Death => "death",
            Intent::Despawn => "despawn",
            Intent::Lunge => "lunge",
            Intent::ParryEffect => "parry-effect",
            Intent::BlockEffect => "block-effect",
            Intent::HitEffect => "hit-effect",
            Intent::ParrySlowMotion => "parry-slowmo",
            Intent::KnockbackEffect => "knockback-effect",
        };
        name.to_string()
    }
}

/// Event: проиграть intent на entity
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AnimationIntent {
    pub entity: Entity,
    pub intent: Intent,
}

impl AnimationIntent {
    pub fn new(entity: Entity, intent: Intent) -> Self {
        Self { entity, intent }
    }
}

/// Event: camera zoom на цель
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CameraZoom {
    pub target: Entity,
    pub duration: f32,
}

/// Event: locomotion должен (пере)стать двигать entity
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementLockChanged {
    pub entity: Entity,
    pub locked: bool,
}

/// Пересылка intents в collaborators (последняя фаза тика)
pub fn dispatch_to_collaborators(
    mut intents: EventReader<AnimationIntent>,
    mut zooms: EventReader<CameraZoom>,
    mut locks: EventReader<MovementLockChanged>,
    collaborators: Res<Collaborators>,
) {
    for event in intents.read() {
        match collaborators.animation.as_ref() {
            Some(sink) => sink.play(event.entity, &event.intent.name()),
            None => logger::log(&format!(
                "🎬 No animation sink bound, skipped '{}' for {:?}",
                event.intent.name(),
                event.entity
            )),
        }
    }

    for zoom in zooms.read() {
        match collaborators.camera.as_ref() {
            Some(camera) => camera.zoom(zoom.target, zoom.duration),
            None => logger::log(&format!(
                "🎥 No camera bound, skipped zoom on {:?}",
                zoom.target
            )),
        }
    }

    for lock in locks.read() {
        match collaborators.locomotion.as_ref() {
            Some(driver) => driver.lock_movement(lock.entity, lock.locked),
            None => logger::log(&format!(
                "🏃 No locomotion bound, skipped lock_movement({:?}, {})",
                lock.entity, lock.locked
            )),
        }
    }
}
