//! Block + player parry window
//!
//! Нажатие блока: CombatPhase::Blocking + parry window (0.3s) у игрока.
//! Отпускание: окно отменяется (parrying=false), фаза → Idle.
//! Враги блокируют без окна: их parry — бросок в enemy.rs.

use bevy::prelude::*;

use crate::collaborators::{AnimationIntent, Intent};
use crate::combat::combo::cancel_combo;
use crate::components::{CombatPhase, CombatState, ParryStance, Player, Window};
use crate::config::CombatConfig;
use crate::logger;

/// Event: кнопка блока нажата/отпущена
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInput {
    pub entity: Entity,
    pub pressed: bool,
}

pub fn process_block_inputs(
    mut inputs: EventReader<BlockInput>,
    mut combatants: Query<(&mut CombatState, Has<Player>)>,
    config: Res<CombatConfig>,
    mut intents: EventWriter<AnimationIntent>,
) {
    for input in inputs.read() {
        let Ok((mut state, is_player)) = combatants.get_mut(input.entity) else {
            continue;
        };

        if input.pressed {
            if !state.is_actionable() {
                logger::log(&format!("🛡️ {:?} not actionable, block ignored", input.entity));
                continue;
            }

            if cancel_combo(&mut state) {
                intents.write(AnimationIntent::new(input.entity, Intent::AttackCancel));
            }

            state.phase = CombatPhase::Blocking;
            if is_player {
                state.parry = ParryStance::Window(Window::opened(config.player.parry_window));
            }
            intents.write(AnimationIntent::new(input.entity, Intent::Block));
        } else if matches!(state.phase, CombatPhase::Blocking) {
            state.phase = CombatPhase::Idle;
            state.parry = ParryStance::None;
            intents.write(AnimationIntent::new(input.entity, Intent::BlockRelease));
        }
    }
}

/// Система: parry window игрока и hold drawn parry врага
pub fn tick_parry_stances(
    clock: Res<crate::SimulationClock>,
    mut combatants: Query<(Entity, &mut CombatState)>,
) {
    for (entity, mut state) in combatants.iter_mut() {
        match &mut state.parry {
            ParryStance::None => {}
            ParryStance::Window(window) => {
                if window.tick(clock.delta) {
                    logger::log(&format!("🛡️ {:?} parry window closed", entity));
                }
            }
            ParryStance::Drawn { hold } => {
                if hold.tick(clock.delta) {
                    state.parry = ParryStance::None;
                }
            }
        }
    }
}
