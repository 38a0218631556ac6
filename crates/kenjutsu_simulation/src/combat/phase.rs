//! Phase-boundary callbacks от animation collaborator'а
//!
//! Host пересылает имя фазы строкой (`on_phase_event(entity, "damage-start")`),
//! ядро разбирает его один раз в PhaseMarker. Каждая подсистема читает
//! PhaseEvent своим EventReader'ом и реагирует только на свои маркеры.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PhaseMarker {
    /// Шаг combo доигран
    AttackComplete,
    /// Открыть damage window текущего замаха
    DamageStart,
    DamageEnd,
    /// Враг закончил parry анимацию
    ParryEnd,
    /// Замах игрока виден врагам (открывает readiness в радиусе)
    AlertEnemies,
    Lunge,
}

impl PhaseMarker {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "attack-complete" => Some(PhaseMarker::AttackComplete),
            "damage-start" => Some(PhaseMarker::DamageStart),
            "damage-end" => Some(PhaseMarker::DamageEnd),
            "parry-end" => Some(PhaseMarker::ParryEnd),
            "alert-enemies" => Some(PhaseMarker::AlertEnemies),
            "lunge" => Some(PhaseMarker::Lunge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseMarker::AttackComplete => "attack-complete",
            PhaseMarker::DamageStart => "damage-start",
            PhaseMarker::DamageEnd => "damage-end",
            PhaseMarker::ParryEnd => "parry-end",
            PhaseMarker::AlertEnemies => "alert-enemies",
            PhaseMarker::Lunge => "lunge",
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEvent {
    pub entity: Entity,
    pub marker: PhaseMarker,
}
