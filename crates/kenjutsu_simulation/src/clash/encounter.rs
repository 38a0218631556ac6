//! ClashEncounter: prompt loop + judgment
//!
//! Resumable task, продвигается раз в тик:
//! Settling(delay) → Prompting(key, prompt_time) → Settling → … → Judged
//!
//! Judged — терминальное состояние, judgment происходит ровно один раз.

use bevy::prelude::*;
use rand::Rng;

use crate::components::Window;
use crate::config::ClashTuning;
use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ClashVerdict {
    /// Defender → finishable, атакующий сразу в finisher
    FinisherHandoff,
    /// Асимметричный knockback, locks сняты, armor атакующего сброшен
    PunishAndRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PromptResult {
    Correct,
    Incorrect,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Reflect)]
pub enum ClashStage {
    Settling { window: Window },
    Prompting { key: String, window: Window },
    Judged(ClashVerdict),
}

/// Что произошло на этом шаге
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClashStep {
    Waiting,
    Prompted(String),
    Scored(PromptResult),
    Judged(ClashVerdict),
}

/// Transient entity на время mini-game
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct ClashEncounter {
    pub attacker: Entity,
    pub defender: Entity,
    pub sequence_length: u32,
    pub required_wins: u32,
    pub prompt_time: f32,
    pub settle_delay: f32,
    pub correct: u32,
    pub resolved_prompts: u32,
    pub stage: ClashStage,
}

impl ClashEncounter {
    pub fn new(attacker: Entity, defender: Entity, tuning: &ClashTuning) -> Self {
        Self {
            attacker,
            defender,
            sequence_length: tuning.sequence_length,
            required_wins: tuning.required_wins,
            prompt_time: tuning.prompt_time,
            settle_delay: tuning.settle_delay,
            correct: 0,
            resolved_prompts: 0,
            // Первый prompt — на первом же шаге
            stage: ClashStage::Settling {
                window: Window::CLOSED,
            },
        }
    }

    pub fn involves(&self, entity: Entity) -> bool {
        self.attacker == entity || self.defender == entity
    }

    pub fn verdict(&self) -> Option<ClashVerdict> {
        match self.stage {
            ClashStage::Judged(verdict) => Some(verdict),
            _ => None,
        }
    }

    pub fn current_prompt(&self) -> Option<&str> {
        match &self.stage {
            ClashStage::Prompting { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Ввод игрока. None — сейчас нет открытого prompt'а.
    pub fn submit(&mut self, key: &str) -> Option<PromptResult> {
        let expected = self.current_prompt()?;
        let result = if expected.eq_ignore_ascii_case(key) {
            PromptResult::Correct
        } else {
            PromptResult::Incorrect
        };
        self.score(result);
        Some(result)
    }

    /// Один тик prompt loop'а
    pub fn advance<R: Rng>(&mut self, delta: f32, prompts: &[String], rng: &mut R) -> ClashStep {
        match &mut self.stage {
            ClashStage::Judged(_) => ClashStep::Waiting,
            ClashStage::Prompting { window, .. } => {
                window.tick(delta);
                if window.is_open() {
                    return ClashStep::Waiting;
                }
                self.score(PromptResult::Timeout);
                ClashStep::Scored(PromptResult::Timeout)
            }
            ClashStage::Settling { window } => {
                window.tick(delta);
                if window.is_open() {
                    return ClashStep::Waiting;
                }

                if self.resolved_prompts >= self.sequence_length {
                    let verdict = if self.correct >= self.required_wins {
                        ClashVerdict::FinisherHandoff
                    } else {
                        ClashVerdict::PunishAndRelease
                    };
                    return self.judge(verdict);
                }

                // Пустой набор — fail closed
                if prompts.is_empty() {
                    logger::log_error("⚔️ Clash prompt set is empty, encounter auto-lost");
                    return self.judge(ClashVerdict::PunishAndRelease);
                }

                let key = prompts[rng.gen_range(0..prompts.len())].clone();
                self.stage = ClashStage::Prompting {
                    key: key.clone(),
                    window: Window::opened(self.prompt_time),
                };
                ClashStep::Prompted(key)
            }
        }
    }

    fn score(&mut self, result: PromptResult) {
        self.resolved_prompts += 1;
        if result == PromptResult::Correct {
            self.correct += 1;
        }
        self.stage = ClashStage::Settling {
            window: Window::opened(self.settle_delay),
        };
    }

    fn judge(&mut self, verdict: ClashVerdict) -> ClashStep {
        self.stage = ClashStage::Judged(verdict);
        ClashStep::Judged(verdict)
    }
}
