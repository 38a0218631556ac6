//! Combat journal: упорядоченный аудит-лог исходов боя
//!
//! Recorder читает итоговые события тика (после всех фаз) и дописывает их
//! в `CombatJournal` в фиксированном порядке: strikes → falls → guard breaks →
//! clash judgments → executions → removals. Host забирает записи через
//! `CombatSimulation::drain_journal`.

use bevy::prelude::*;

use crate::clash::{ClashJudged, ClashVerdict};
use crate::combat::{GuardBreakTriggered, StrikeOutcome, StrikeResolved};
use crate::finisher::{CombatantExecuted, CombatantFell, CombatantRemoved};
use crate::SimulationClock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatRecord {
    Strike {
        tick: u64,
        attacker: Option<Entity>,
        defender: Entity,
        outcome: StrikeOutcome,
    },
    Fell {
        tick: u64,
        entity: Entity,
        is_player: bool,
    },
    GuardBreak {
        tick: u64,
        player: Entity,
        parried_by: Entity,
    },
    ClashJudged {
        tick: u64,
        attacker: Entity,
        defender: Entity,
        correct: u32,
        verdict: ClashVerdict,
    },
    Executed {
        tick: u64,
        target: Entity,
        executor: Option<Entity>,
    },
    Removed {
        tick: u64,
        entity: Entity,
    },
}

impl CombatRecord {
    pub fn tick(&self) -> u64 {
        match *self {
            CombatRecord::Strike { tick, .. }
            | CombatRecord::Fell { tick, .. }
            | CombatRecord::GuardBreak { tick, .. }
            | CombatRecord::ClashJudged { tick, .. }
            | CombatRecord::Executed { tick, .. }
            | CombatRecord::Removed { tick, .. } => tick,
        }
    }
}

#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct CombatJournal {
    records: Vec<CombatRecord>,
}

impl CombatJournal {
    pub fn push(&mut self, record: CombatRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CombatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn drain(&mut self) -> Vec<CombatRecord> {
        std::mem::take(&mut self.records)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn record_combat_journal(
    clock: Res<SimulationClock>,
    mut journal: ResMut<CombatJournal>,
    mut strikes: EventReader<StrikeResolved>,
    mut fallen: EventReader<CombatantFell>,
    mut guard_breaks: EventReader<GuardBreakTriggered>,
    mut clashes: EventReader<ClashJudged>,
    mut executions: EventReader<CombatantExecuted>,
    mut removals: EventReader<CombatantRemoved>,
) {
    let tick = clock.tick;

    for strike in strikes.read() {
        journal.push(CombatRecord::Strike {
            tick,
            attacker: strike.attacker,
            defender: strike.defender,
            outcome: strike.outcome,
        });
    }
    for fell in fallen.read() {
        journal.push(CombatRecord::Fell {
            tick,
            entity: fell.entity,
            is_player: fell.is_player,
        });
    }
    for guard_break in guard_breaks.read() {
        journal.push(CombatRecord::GuardBreak {
            tick,
            player: guard_break.player,
            parried_by: guard_break.parried_by,
        });
    }
    for clash in clashes.read() {
        journal.push(CombatRecord::ClashJudged {
            tick,
            attacker: clash.attacker,
            defender: clash.defender,
            correct: clash.correct,
            verdict: clash.verdict,
        });
    }
    for executed in executions.read() {
        journal.push(CombatRecord::Executed {
            tick,
            target: executed.target,
            executor: executed.executor,
        });
    }
    for removed in removals.read() {
        journal.push(CombatRecord::Removed {
            tick,
            entity: removed.entity,
        });
    }
}
