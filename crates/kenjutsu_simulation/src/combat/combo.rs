//! Combo & Armor sequencer
//!
//! State machine per attacker: Idle → Step1 → … → StepN → Idle.
//! - Переход Step_k → Step_k+1 только по "attack-complete" от анимации
//! - Armor (если профиль armored) живёт всё время combo: пока атакующий в
//!   combo, по нему проходит максимум один удар
//! - Отмена (stun, hit, block, проигранный clash) → сразу Idle, armor снят

use bevy::prelude::*;

use crate::collaborators::{AnimationIntent, Collaborators, Intent};
use crate::combat::enemy::EnemyBrain;
use crate::combat::phase::{PhaseEvent, PhaseMarker};
use crate::components::{CombatPhase, CombatState};
use crate::logger;

/// Armor текущего combo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum ArmorState {
    #[default]
    Inactive,
    Active { absorbed_hit: bool },
}

impl ArmorState {
    pub fn is_active(&self) -> bool {
        matches!(self, ArmorState::Active { .. })
    }
}

/// Состояние combo (живёт внутри CombatPhase::Attacking, step >= 1)
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct ComboState {
    pub step: u8,
    pub length: u8,
    pub armor: ArmorState,
    /// Damage window текущего замаха (host делает hit detection пока открыто)
    pub damage_window: bool,
    /// Кого уже ударил текущий замах
    pub struck: Vec<Entity>,
    /// Буферизованный ввод на следующий шаг
    pub chain_queued: bool,
}

/// Результат "attack-complete"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboAdvance {
    Next(u8),
    Finished,
}

impl ComboState {
    pub fn new(length: u8, armored: bool) -> Self {
        Self {
            step: 1,
            length: length.max(1),
            armor: if armored {
                ArmorState::Active {
                    absorbed_hit: false,
                }
            } else {
                ArmorState::Inactive
            },
            damage_window: false,
            struck: Vec::new(),
            chain_queued: false,
        }
    }

    /// Продвинуть combo. `auto_chain` — враги; игрок продолжает только с буфером.
    pub fn advance(&mut self, auto_chain: bool) -> ComboAdvance {
        let continues = auto_chain || self.chain_queued;
        if continues && self.step < self.length {
            self.step += 1;
            self.damage_window = false;
            self.struck.clear();
            self.chain_queued = false;
            ComboAdvance::Next(self.step)
        } else {
            ComboAdvance::Finished
        }
    }

    /// Зарегистрировать попадание замаха. `false` — этот defender уже получил
    /// удар от текущего замаха.
    pub fn register_swing_hit(&mut self, defender: Entity) -> bool {
        if self.struck.contains(&defender) {
            return false;
        }
        self.struck.push(defender);
        true
    }
}

/// Профиль combo участника (из config при spawn)
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct ComboProfile {
    pub length: u8,
    pub armored: bool,
    pub auto_chain: bool,
}

impl Default for ComboProfile {
    fn default() -> Self {
        Self {
            length: 1,
            armored: false,
            auto_chain: false,
        }
    }
}

impl ComboProfile {
    pub fn start(&self) -> ComboState {
        ComboState::new(self.length, self.armored)
    }
}

/// Event: ввод атаки (кнопка игрока или решение AI)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackInput {
    pub entity: Entity,
}

/// Отменить combo (→ Idle, armor снят). Возвращает true если combo был.
pub fn cancel_combo(state: &mut CombatState) -> bool {
    if matches!(state.phase, CombatPhase::Attacking(_)) {
        state.phase = CombatPhase::Idle;
        true
    } else {
        false
    }
}

/// Система: старт combo по вводу атаки
///
/// Preconditions (нарушение = лог + no-op):
/// - actionable (жив, нет lock)
/// - не блокирует
/// - на земле (locomotion collaborator)
/// - у врага — cooldown закрыт
pub fn process_attack_inputs(
    mut inputs: EventReader<AttackInput>,
    mut combatants: Query<(&mut CombatState, &ComboProfile, Option<&mut EnemyBrain>)>,
    collaborators: Res<Collaborators>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for input in inputs.read() {
        let Ok((mut state, profile, brain)) = combatants.get_mut(input.entity) else {
            logger::log_warning(&format!("⚠️ Attack input for unknown combatant {:?}", input.entity));
            continue;
        };

        if !state.is_actionable() {
            logger::log(&format!("⚔️ {:?} not actionable, attack ignored", input.entity));
            continue;
        }

        if let Some(combo) = state.combo_mut() {
            // Уже атакуем — буферизуем следующий шаг
            if !profile.auto_chain && combo.step < combo.length {
                combo.chain_queued = true;
            }
            continue;
        }

        if matches!(state.phase, CombatPhase::Blocking) {
            logger::log(&format!("⚔️ {:?} is blocking, attack ignored", input.entity));
            continue;
        }

        if !collaborators.is_grounded(input.entity) {
            logger::log(&format!("⚔️ {:?} airborne, attack ignored", input.entity));
            continue;
        }

        if let Some(mut brain) = brain {
            if brain.cooldown.is_open() {
                logger::log(&format!("⚔️ {:?} attack on cooldown", input.entity));
                continue;
            }
            let cooldown = brain.attack_cooldown;
            brain.cooldown.open(cooldown);
        }

        state.phase = CombatPhase::Attacking(profile.start());
        intents.write(AnimationIntent::new(input.entity, Intent::Attack { step: 1 }));
        logger::log(&format!(
            "⚔️ ECS: {:?} starts combo (length {}, armored {})",
            input.entity, profile.length, profile.armored
        ));
    }
}

/// Система: attack-complete / damage-start / damage-end
pub fn process_combo_phase_events(
    mut phases: EventReader<PhaseEvent>,
    mut combatants: Query<(&mut CombatState, &ComboProfile)>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for event in phases.read() {
        if !matches!(
            event.marker,
            PhaseMarker::AttackComplete | PhaseMarker::DamageStart | PhaseMarker::DamageEnd
        ) {
            continue;
        }

        let Ok((mut state, profile)) = combatants.get_mut(event.entity) else {
            continue;
        };

        // Clash / finisher замораживают combo
        if state.lock.is_some() {
            logger::log(&format!(
                "⚔️ {:?} locked, phase '{}' ignored",
                event.entity,
                event.marker.as_str()
            ));
            continue;
        }

        let Some(combo) = state.combo_mut() else {
            continue;
        };

        match event.marker {
            PhaseMarker::DamageStart => {
                combo.damage_window = true;
                combo.struck.clear();
            }
            PhaseMarker::DamageEnd => {
                combo.damage_window = false;
            }
            PhaseMarker::AttackComplete => match combo.advance(profile.auto_chain) {
                ComboAdvance::Next(step) => {
                    intents.write(AnimationIntent::new(event.entity, Intent::Attack { step }));
                }
                ComboAdvance::Finished => {
                    state.phase = CombatPhase::Idle;
                    intents.write(AnimationIntent::new(event.entity, Intent::ComboEnd));
                    logger::log(&format!("⚔️ ECS: {:?} combo finished", event.entity));
                }
            },
            _ => {}
        }
    }
}
