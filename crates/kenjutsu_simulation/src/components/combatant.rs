//! Combatant компоненты: Health, Facing, Position, CombatState (registry)
//!
//! Архитектура:
//! - Флаги боя (stunned, parrying, attacking, blocking, comboArmored,
//!   clashing, finishable, dead) не хранятся отдельными bool'ами
//! - Вместо этого по одному tagged enum на concern: CombatPhase, LockReason,
//!   LifeState, ParryStance. Флаг = производный предикат
//! - Невалидные комбинации (мёртвый + блокирует, armor без атаки)
//!   непредставимы или отклоняются в set_flag

use bevy::prelude::*;

use crate::combat::combo::{ArmorState, ComboProfile, ComboState};
use crate::combat::enemy::EnemyBrain;
use crate::combat::guard_break::ParryCounter;
use crate::components::Window;
use crate::knockback::Motion;

// ============================================================================
// Базовые компоненты участника
// ============================================================================

/// Участник боя (игрок или враг)
///
/// Required: CombatState, Health, Facing, Position, Motion, ComboProfile
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(CombatState, Health, Facing, Position, Motion, ComboProfile)]
pub struct Combatant;

/// Маркер игрока (ParryCounter живёт на игроке)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Combatant, ParryCounter)]
pub struct Player;

/// Маркер врага (решения parry/counter — в EnemyBrain)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Combatant, EnemyBrain)]
pub struct Enemy;

/// Health (целое, >= 0, clamp на 0)
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            current: 100,
            max: 100,
        }
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Нанести урон. Возвращает фактически снятое количество.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }
}

/// Направление взгляда (2D, только горизонталь)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// -1.0 для Left, +1.0 для Right
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Взгляд из `from_x` в сторону `to_x` (при равенстве — Right)
    pub fn toward(from_x: f32, to_x: f32) -> Self {
        if to_x < from_x {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// 2D позиция. Пишут: locomotion (host) или positional resolver, не оба сразу.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Position(pub Vec2);

// ============================================================================
// Combat state (registry)
// ============================================================================

/// Флаги registry (внешний контракт get_flag / set_flag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum CombatFlag {
    Stunned,
    Parrying,
    Attacking,
    Blocking,
    ComboArmored,
    Clashing,
    Finishable,
    Dead,
}

impl CombatFlag {
    pub const ALL: [CombatFlag; 8] = [
        CombatFlag::Stunned,
        CombatFlag::Parrying,
        CombatFlag::Attacking,
        CombatFlag::Blocking,
        CombatFlag::ComboArmored,
        CombatFlag::Clashing,
        CombatFlag::Finishable,
        CombatFlag::Dead,
    ];
}

/// Что делает участник (взаимоисключающе)
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub enum CombatPhase {
    #[default]
    Idle,
    Attacking(ComboState),
    Blocking,
}

/// Почему участник не может действовать
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum LockReason {
    /// Закрытое окно = удержание до явного снятия
    Stunned { window: Window, cause: StunCause },
    Clashing { opponent: Option<Entity> },
    /// Атакующий в finisher-последовательности
    Executing { target: Option<Entity> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum StunCause {
    Parried,
    GuardBreak,
    Held,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum LifeState {
    #[default]
    Alive,
    Finishable,
    Dead,
}

/// Parry: у игрока — физическое окно, у врага — результат одного броска
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum ParryStance {
    #[default]
    None,
    /// Окно игрока (открыто нажатием блока, отменяется отпусканием)
    Window(Window),
    /// Удачный бросок врага; `hold` — страховочное закрытие
    Drawn { hold: Window },
}

impl ParryStance {
    pub fn is_parrying(&self) -> bool {
        match self {
            ParryStance::None => false,
            ParryStance::Window(window) => window.is_open(),
            ParryStance::Drawn { .. } => true,
        }
    }
}

/// Registry state одного участника
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CombatState {
    pub phase: CombatPhase,
    pub lock: Option<LockReason>,
    pub life: LifeState,
    pub parry: ParryStance,
}

impl CombatState {
    pub fn get_flag(&self, flag: CombatFlag) -> bool {
        match flag {
            CombatFlag::Stunned => matches!(self.lock, Some(LockReason::Stunned { .. })),
            CombatFlag::Parrying => self.parry.is_parrying(),
            CombatFlag::Attacking => matches!(self.phase, CombatPhase::Attacking(_)),
            CombatFlag::Blocking => matches!(self.phase, CombatPhase::Blocking),
            CombatFlag::ComboArmored => self.combo().is_some_and(|combo| combo.armor.is_active()),
            CombatFlag::Clashing => matches!(self.lock, Some(LockReason::Clashing { .. })),
            CombatFlag::Finishable => self.life == LifeState::Finishable,
            CombatFlag::Dead => self.life == LifeState::Dead,
        }
    }

    /// Низкоуровневая запись флага.
    ///
    /// Возвращает `false` если переход невалиден (мёртвый/finishable
    /// принимает только переходы жизни, armor требует атаки и т.д.).
    pub fn set_flag(&mut self, flag: CombatFlag, value: bool) -> bool {
        if self.life != LifeState::Alive
            && !matches!(flag, CombatFlag::Finishable | CombatFlag::Dead)
        {
            return false;
        }

        match (flag, value) {
            (CombatFlag::Stunned, true) => {
                self.stun(Window::CLOSED, StunCause::Held);
                true
            }
            (CombatFlag::Stunned, false) => {
                if self.get_flag(CombatFlag::Stunned) {
                    self.lock = None;
                }
                true
            }
            (CombatFlag::Parrying, true) => {
                self.parry = ParryStance::Drawn {
                    hold: Window::CLOSED,
                };
                true
            }
            (CombatFlag::Parrying, false) => {
                self.parry = ParryStance::None;
                true
            }
            (CombatFlag::Attacking, true) => {
                if !self.get_flag(CombatFlag::Attacking) {
                    self.phase = CombatPhase::Attacking(ComboState::new(1, false));
                }
                true
            }
            (CombatFlag::Attacking, false) => {
                if self.get_flag(CombatFlag::Attacking) {
                    self.phase = CombatPhase::Idle;
                }
                true
            }
            (CombatFlag::Blocking, true) => {
                self.phase = CombatPhase::Blocking;
                true
            }
            (CombatFlag::Blocking, false) => {
                if self.get_flag(CombatFlag::Blocking) {
                    self.phase = CombatPhase::Idle;
                    self.parry = ParryStance::None;
                }
                true
            }
            (CombatFlag::ComboArmored, value) => match self.combo_mut() {
                Some(combo) => {
                    combo.armor = if value {
                        ArmorState::Active { absorbed_hit: false }
                    } else {
                        ArmorState::Inactive
                    };
                    true
                }
                // armor без активного combo непредставим
                None => !value,
            },
            (CombatFlag::Clashing, true) => {
                self.lock = Some(LockReason::Clashing { opponent: None });
                true
            }
            (CombatFlag::Clashing, false) => {
                if self.get_flag(CombatFlag::Clashing) {
                    self.lock = None;
                }
                true
            }
            (CombatFlag::Finishable, true) => {
                if self.life == LifeState::Dead {
                    return false;
                }
                self.enter_finishable();
                true
            }
            (CombatFlag::Finishable, false) => {
                if self.life == LifeState::Finishable {
                    self.life = LifeState::Alive;
                }
                true
            }
            (CombatFlag::Dead, true) => {
                self.mark_dead();
                true
            }
            // Смерть терминальна
            (CombatFlag::Dead, false) => self.life != LifeState::Dead,
        }
    }

    /// Может ли участник начать новое действие
    pub fn is_actionable(&self) -> bool {
        self.life == LifeState::Alive && self.lock.is_none()
    }

    pub fn combo(&self) -> Option<&ComboState> {
        match &self.phase {
            CombatPhase::Attacking(combo) => Some(combo),
            _ => None,
        }
    }

    pub fn combo_mut(&mut self) -> Option<&mut ComboState> {
        match &mut self.phase {
            CombatPhase::Attacking(combo) => Some(combo),
            _ => None,
        }
    }

    /// Stun: lock + отмена combo и parry
    pub fn stun(&mut self, window: Window, cause: StunCause) {
        self.lock = Some(LockReason::Stunned { window, cause });
        self.phase = CombatPhase::Idle;
        self.parry = ParryStance::None;
    }

    pub fn enter_finishable(&mut self) {
        self.life = LifeState::Finishable;
        self.phase = CombatPhase::Idle;
        self.lock = None;
        self.parry = ParryStance::None;
    }

    pub fn mark_dead(&mut self) {
        self.life = LifeState::Dead;
        self.phase = CombatPhase::Idle;
        self.lock = None;
        self.parry = ParryStance::None;
    }

    /// Снимок всех флагов (для логов и snapshot'ов)
    pub fn flags(&self) -> Vec<CombatFlag> {
        CombatFlag::ALL
            .into_iter()
            .filter(|flag| self.get_flag(*flag))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_at_zero() {
        let mut health = Health::new(30);
        assert_eq!(health.take_damage(20), 20);
        assert_eq!(health.take_damage(20), 10);
        assert_eq!(health.current, 0);
        assert!(health.is_depleted());

        health.heal(500);
        assert_eq!(health.current, 30);
    }

    #[test]
    fn test_facing_toward() {
        assert_eq!(Facing::toward(0.0, 3.0), Facing::Right);
        assert_eq!(Facing::toward(3.0, 0.0), Facing::Left);
        assert_eq!(Facing::Left.sign(), -1.0);
        assert_eq!(Facing::Left.opposite(), Facing::Right);
    }

    #[test]
    fn test_default_state_is_actionable() {
        let state = CombatState::default();
        assert!(state.is_actionable());
        assert!(state.flags().is_empty());
    }

    #[test]
    fn test_stun_blocks_actions_and_cancels_combo() {
        let mut state = CombatState::default();
        state.set_flag(CombatFlag::Attacking, true);
        state.set_flag(CombatFlag::Parrying, true);

        state.stun(Window::opened(1.5), StunCause::Parried);

        assert!(state.get_flag(CombatFlag::Stunned));
        assert!(!state.get_flag(CombatFlag::Attacking));
        assert!(!state.get_flag(CombatFlag::Parrying));
        assert!(!state.is_actionable());
    }

    #[test]
    fn test_armor_requires_active_combo() {
        let mut state = CombatState::default();
        assert!(!state.set_flag(CombatFlag::ComboArmored, true));
        assert!(!state.get_flag(CombatFlag::ComboArmored));

        state.set_flag(CombatFlag::Attacking, true);
        assert!(state.set_flag(CombatFlag::ComboArmored, true));
        assert!(state.get_flag(CombatFlag::ComboArmored));

        // Выход из атаки снимает armor
        state.set_flag(CombatFlag::Attacking, false);
        assert!(!state.get_flag(CombatFlag::ComboArmored));
    }

    #[test]
    fn test_blocking_replaces_attacking() {
        let mut state = CombatState::default();
        state.set_flag(CombatFlag::Attacking, true);
        state.set_flag(CombatFlag::Blocking, true);

        assert!(state.get_flag(CombatFlag::Blocking));
        assert!(!state.get_flag(CombatFlag::Attacking));
    }

    #[test]
    fn test_dead_state_rejects_action_flags() {
        let mut state = CombatState::default();
        state.set_flag(CombatFlag::Dead, true);

        assert!(!state.set_flag(CombatFlag::Blocking, true));
        assert!(!state.set_flag(CombatFlag::Stunned, true));
        assert!(!state.set_flag(CombatFlag::Dead, false));
        assert!(!state.set_flag(CombatFlag::Finishable, true));
        assert_eq!(state.flags(), vec![CombatFlag::Dead]);
    }

    #[test]
    fn test_finishable_clears_locks() {
        let mut state = CombatState::default();
        state.set_flag(CombatFlag::Clashing, true);
        state.set_flag(CombatFlag::Finishable, true);

        assert!(state.get_flag(CombatFlag::Finishable));
        assert!(!state.get_flag(CombatFlag::Clashing));
        assert!(!state.is_actionable());
    }

    #[test]
    fn test_held_stun_clears_on_demand() {
        let mut state = CombatState::default();
        state.set_flag(CombatFlag::Stunned, true);
        assert!(!state.is_actionable());

        state.set_flag(CombatFlag::Stunned, false);
        assert!(state.is_actionable());
    }
}
