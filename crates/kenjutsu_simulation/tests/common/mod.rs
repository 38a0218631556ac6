//! Общие helpers для integration тестов: recording collaborators + setup

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use kenjutsu_simulation::{
    AnimationSink, CameraRig, CombatConfig, CombatRecord, CombatSimulation, Facing,
    LocomotionDriver,
};

pub const DT: f32 = 0.05;

/// Что ядро попросило у collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play(Entity, String),
    Zoom(Entity, f32),
    Lock(Entity, bool),
}

/// Записывает все вызовы (клон разделяет буфер)
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn played(&self, entity: Entity, intent: &str) -> bool {
        self.count(entity, intent) > 0
    }

    pub fn count(&self, entity: Entity, intent: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Play(e, name) if *e == entity && name == intent))
            .count()
    }

    pub fn zoomed(&self, target: Entity) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, Call::Zoom(e, _) if *e == target))
    }

    pub fn last_lock(&self, entity: Entity) -> Option<bool> {
        self.calls().iter().rev().find_map(|call| match call {
            Call::Lock(e, locked) if *e == entity => Some(*locked),
            _ => None,
        })
    }

    fn push(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl AnimationSink for Recorder {
    fn play(&self, entity: Entity, intent: &str) {
        self.push(Call::Play(entity, intent.to_string()));
    }
}

impl CameraRig for Recorder {
    fn zoom(&self, target: Entity, duration: f32) {
        self.push(Call::Zoom(target, duration));
    }
}

impl LocomotionDriver for Recorder {
    fn is_grounded(&self, _entity: Entity) -> bool {
        true
    }

    fn lock_movement(&self, entity: Entity, locked: bool) {
        self.push(Call::Lock(entity, locked));
    }
}

/// Дуэль: игрок в (0, 0) смотрит вправо, враг в (1.5, 0) смотрит влево
pub struct Duel {
    pub sim: CombatSimulation,
    pub player: Entity,
    pub enemy: Entity,
    pub recorder: Recorder,
}

impl Duel {
    pub fn new(config: CombatConfig) -> Self {
        Self::with_seed(config, 42)
    }

    pub fn with_seed(config: CombatConfig, seed: u64) -> Self {
        let mut sim = CombatSimulation::new(config, seed);
        let recorder = Recorder::default();
        sim.bind_animation_sink(Box::new(recorder.clone()));
        sim.bind_camera(Box::new(recorder.clone()));
        sim.bind_locomotion(Box::new(recorder.clone()));

        let player = sim.spawn_player(Vec2::new(0.0, 0.0), Facing::Right);
        let enemy = sim.spawn_enemy(Vec2::new(1.5, 0.0), Facing::Left);
        // Первый тик: spatial registry видит обоих
        sim.tick(DT);

        Self {
            sim,
            player,
            enemy,
            recorder,
        }
    }

    pub fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.sim.tick(DT);
        }
    }

    pub fn strikes(&self) -> Vec<CombatRecord> {
        self.sim
            .journal()
            .iter()
            .filter(|record| matches!(record, CombatRecord::Strike { .. }))
            .copied()
            .collect()
    }
}

/// Конфиг, где враг всегда парирует при открытой readiness
pub fn always_parry_config() -> CombatConfig {
    let mut config = CombatConfig::default();
    config.enemy.parry_chance = 1.0;
    config
}
