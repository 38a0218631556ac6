//! ECS Components для участников боя
//!
//! - window: countdown таймер (parry, stun, readiness, cooldown)
//! - combatant: Health, Facing, Position, CombatState (phase + lock + life)

pub mod combatant;
pub mod window;

pub use combatant::*;
pub use window::*;
