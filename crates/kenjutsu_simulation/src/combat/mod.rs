//! Combat resolution module
//!
//! ECS ответственность:
//! - Combo sequencer: шаги, damage window, super-armor
//! - Defense: block / parry stance, enemy parry readiness
//! - Strike resolution: armor → parry → block → landed
//! - Escalation: parry counter → guard break → forced counter-attack
//!
//! Host ответственность:
//! - Hitbox/hurtbox overlap → StrikeEvent
//! - Animation markers → PhaseEvent
//!
//! Порядок внутри тика: Timers → Input → Resolve → Escalate → Commands

use bevy::prelude::*;

use crate::CombatSet;

pub mod combo;
pub mod defense;
pub mod enemy;
pub mod guard_break;
pub mod phase;
pub mod strike;
pub mod stun;


// Re-export основных типов
pub use combo::{cancel_combo, ArmorState, AttackInput, ComboAdvance, ComboProfile, ComboState};
pub use defense::BlockInput;
pub use enemy::{EnemyBrain, IncomingAttack, PendingCounter};
pub use guard_break::{GuardBreakTriggered, ParryCounter};
pub use phase::{PhaseEvent, PhaseMarker};
pub use strike::{
    classify_strike, scale_damage, Classification, Defender, StrikeEvent, StrikeOutcome,
    StrikeResolved, StrikeRules,
};
pub use stun::CombatCommand;

/// Combat Plugin
///
/// Порядок выполнения:
/// 1. Timers — parry window, stun, enemy readiness/cooldown/counter warning
/// 2. Input — block, attack, animation markers, incoming-attack notices
/// 3. Resolve — StrikeEvent → StrikeResolved
/// 4. Escalate — GuardBreakTriggered → stun + forced counter
/// 5. Commands — CombatCommand (stun, forced counter)
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<AttackInput>()
            .add_event::<BlockInput>()
            .add_event::<PhaseEvent>()
            .add_event::<IncomingAttack>()
            .add_event::<StrikeEvent>()
            .add_event::<StrikeResolved>()
            .add_event::<CombatCommand>()
            .add_event::<GuardBreakTriggered>();

        app.add_systems(
            Update,
            (
                defense::tick_parry_stances,
                stun::tick_stuns,
                enemy::tick_enemy_brains,
            )
                .chain()
                .in_set(CombatSet::Timers),
        )
        .add_systems(
            Update,
            (
                defense::process_block_inputs,
                combo::process_attack_inputs,
                combo::process_combo_phase_events,
                enemy::process_incoming_attack_notices,
                enemy::process_enemy_phase_events,
            )
                .chain()
                .in_set(CombatSet::Input),
        )
        .add_systems(Update, strike::resolve_strikes.in_set(CombatSet::Resolve))
        .add_systems(Update, guard_break::apply_guard_breaks.in_set(CombatSet::Escalate))
        .add_systems(Update, stun::apply_combat_commands.in_set(CombatSet::Commands));
    }
}
