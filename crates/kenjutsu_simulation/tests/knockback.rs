//! Positional resolution: knockback, lunge, ownership of Position

mod common;

use bevy::prelude::*;
use common::{always_parry_config, Duel};
use kenjutsu_simulation::knockback::DisplacementKind;
use kenjutsu_simulation::*;

fn active_kind(duel: &Duel, entity: Entity) -> Option<DisplacementKind> {
    duel.sim
        .world()
        .get::<Motion>(entity)
        .and_then(|motion| motion.active)
        .map(|displacement| displacement.kind)
}

/// Конец knockback'а — ровно start + distance, без дрейфа
#[test]
fn test_knockback_lands_exactly() {
    let mut duel = Duel::new(CombatConfig::default());
    let enemy = duel.enemy;

    duel.sim
        .request_knockback(enemy, Vec2::ZERO, 2.0, 0.3, Easing::SmoothStep);
    duel.ticks(1);
    // Движение начинается со следующего тика
    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(1.5, 0.0)));
    assert!(duel.sim.is_position_locked(enemy));
    assert!(duel.recorder.played(enemy, "knockback-effect"));
    assert_eq!(duel.recorder.last_lock(enemy), Some(true));

    duel.ticks(3);
    let midway = duel.sim.position(enemy).map(|p| p.x).unwrap_or(f32::NAN);
    assert!(midway > 1.5 && midway < 3.5, "midway at {}", midway);

    duel.ticks(10);
    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(3.5, 0.0)));
    assert!(!duel.sim.is_position_locked(enemy));
    assert_eq!(duel.recorder.last_lock(enemy), Some(false));
}

/// Locomotion не пишет позицию, пока ей владеет resolver
#[test]
fn test_set_position_rejected_while_displaced() {
    let mut duel = Duel::new(CombatConfig::default());
    let enemy = duel.enemy;

    duel.sim
        .request_knockback(enemy, Vec2::ZERO, 1.0, 0.2, Easing::Linear);
    duel.ticks(1);

    assert!(!duel.sim.set_position(enemy, Vec2::new(10.0, 0.0)));
    duel.ticks(10);
    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(2.5, 0.0)));

    assert!(duel.sim.set_position(enemy, Vec2::new(10.0, 0.0)));
    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(10.0, 0.0)));
}

/// Lunge по facing, easing out, ровно на lunge.distance
#[test]
fn test_lunge_moves_along_facing() {
    let mut duel = Duel::new(CombatConfig::default());
    let player = duel.player;

    assert!(duel.sim.on_phase_event(player, "lunge"));
    duel.ticks(1);
    assert_eq!(active_kind(&duel, player), Some(DisplacementKind::Lunge));
    assert!(duel.recorder.played(player, "lunge"));

    duel.ticks(5);
    let x = duel.sim.position(player).map(|p| p.x).unwrap_or(f32::NAN);
    assert!((x - 0.6).abs() < 1e-6, "lunge ended at {}", x);
    assert!(!duel.sim.is_position_locked(player));
}

/// Lunge не перехватывает позицию у knockback'а
#[test]
fn test_lunge_refused_during_knockback() {
    let mut duel = Duel::new(CombatConfig::default());
    let player = duel.player;

    duel.sim
        .request_knockback(player, Vec2::new(1.0, 0.0), 1.0, 0.3, Easing::SmoothStep);
    duel.ticks(1);
    duel.sim.on_phase_event(player, "lunge");
    duel.ticks(1);

    assert_eq!(active_kind(&duel, player), Some(DisplacementKind::Knockback));
    assert!(!duel.recorder.played(player, "lunge"));

    duel.ticks(10);
    assert_eq!(duel.sim.position(player), Some(Vec2::new(-1.0, 0.0)));
}

/// Knockback вытесняет активный lunge и стартует с текущей позиции
#[test]
fn test_knockback_preempts_lunge() {
    let mut duel = Duel::new(CombatConfig::default());
    let player = duel.player;

    duel.sim.on_phase_event(player, "lunge");
    duel.ticks(2);
    let mid_lunge = duel.sim.position(player).map(|p| p.x).unwrap_or(f32::NAN);
    assert!(mid_lunge > 0.0 && mid_lunge < 0.6);

    duel.sim
        .request_knockback(player, Vec2::new(1.5, 0.0), 1.0, 0.2, Easing::SmoothStep);
    duel.ticks(1);

    let displacement = duel
        .sim
        .world()
        .get::<Motion>(player)
        .and_then(|motion| motion.active);
    let Some(displacement) = displacement else {
        panic!("knockback should own the position");
    };
    assert_eq!(displacement.kind, DisplacementKind::Knockback);
    assert_eq!(displacement.end.x, displacement.start.x - 1.0);

    duel.ticks(10);
    assert_eq!(duel.sim.position(player), Some(displacement.end));
    assert!(!duel.sim.is_position_locked(player));
}

/// Отмена: позиция замирает где есть, locomotion снова владеет ей
#[test]
fn test_cancel_knockback_freezes_position() {
    let mut duel = Duel::new(CombatConfig::default());
    let enemy = duel.enemy;

    duel.sim
        .request_knockback(enemy, Vec2::ZERO, 2.0, 0.5, Easing::Linear);
    duel.ticks(3);
    duel.sim.cancel_knockback(enemy);
    duel.ticks(1);

    let frozen = duel.sim.position(enemy);
    assert!(!duel.sim.is_position_locked(enemy));
    assert_eq!(duel.recorder.last_lock(enemy), Some(false));

    duel.ticks(10);
    assert_eq!(duel.sim.position(enemy), frozen);
    assert!(frozen.is_some_and(|p| p.x > 1.5 && p.x < 3.5));
}

/// Нулевая длительность — мгновенный snap без lock
#[test]
fn test_zero_duration_knockback_snaps() {
    let mut duel = Duel::new(CombatConfig::default());
    let enemy = duel.enemy;

    duel.sim
        .request_knockback(enemy, Vec2::new(3.0, 0.0), 1.0, 0.0, Easing::Linear);
    duel.ticks(1);

    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(0.5, 0.0)));
    assert!(!duel.sim.is_position_locked(enemy));
}

/// Movement lock снимается только когда его не держат ни stun, ни knockback
#[test]
fn test_movement_lock_outlives_shorter_owner() {
    let mut duel = Duel::new(always_parry_config());
    let (player, enemy) = (duel.player, duel.enemy);

    if let Some(mut counter) = duel.sim.world_mut().get_mut::<ParryCounter>(player) {
        counter.count = 2;
    }
    duel.sim.on_incoming_attack(enemy);
    duel.sim.on_attack_input(player);
    duel.ticks(1);
    duel.sim.on_phase_event(player, "damage-start");
    duel.sim.on_strike(player, enemy, 25);
    duel.ticks(1);
    assert!(duel.sim.get_flag(player, CombatFlag::Stunned));

    // Guard break knockback 0.3s кончился, lockout 1.5s ещё идёт
    duel.ticks(10);
    assert!(!duel.sim.is_position_locked(player));
    assert!(duel.sim.get_flag(player, CombatFlag::Stunned));
    assert_eq!(duel.recorder.last_lock(player), Some(true));

    // Новый knockback переживает stun
    duel.ticks(12);
    duel.sim
        .request_knockback(player, Vec2::ZERO, 1.0, 1.0, Easing::Linear);
    duel.ticks(13);
    assert!(!duel.sim.get_flag(player, CombatFlag::Stunned));
    assert!(duel.recorder.played(player, "stun-recover"));
    assert!(duel.sim.is_position_locked(player));
    assert_eq!(duel.recorder.last_lock(player), Some(true));

    duel.ticks(10);
    assert!(!duel.sim.is_position_locked(player));
    assert!(duel.sim.is_actionable(player));
    assert_eq!(duel.recorder.last_lock(player), Some(false));
}
