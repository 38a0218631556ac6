//! Clash encounter + finisher handshake integration tests
//!
//! Проверяем:
//! - judgment ровно один раз, handoff XOR punish
//! - handoff → finishable → execute → dead → despawn
//! - standalone finisher (scan + warp), execute no-op на не-finishable

mod common;

use bevy::prelude::*;
use common::Duel;
use kenjutsu_simulation::*;

fn prompt_of(duel: &mut Duel) -> Option<String> {
    let world = duel.sim.world_mut();
    let mut encounters = world.query::<&ClashEncounter>();
    encounters
        .iter(world)
        .next()
        .and_then(|encounter| encounter.current_prompt().map(String::from))
}

fn encounter_count(duel: &mut Duel) -> usize {
    let world = duel.sim.world_mut();
    world.query::<&ClashEncounter>().iter(world).count()
}

fn judgments(duel: &Duel) -> Vec<CombatRecord> {
    duel.sim
        .journal()
        .iter()
        .filter(|record| matches!(record, CombatRecord::ClashJudged { .. }))
        .copied()
        .collect()
}

/// Прогнать clash: `answers[i]` — правильно ли ответить на i-й prompt.
/// Prompt'ы сверх `answers` истекают без ввода.
fn run_clash(duel: &mut Duel, answers: &[bool]) -> CombatRecord {
    duel.sim.start_clash(duel.player, duel.enemy);

    let mut answered = 0;
    for _ in 0..400 {
        if let Some(judged) = judgments(duel).first() {
            return *judged;
        }

        if let Some(key) = prompt_of(duel) {
            if let Some(&correct) = answers.get(answered) {
                let input = if correct { key } else { "wrong".to_string() };
                duel.sim.on_clash_input(duel.player, &input);
                answered += 1;
            }
        }
        duel.ticks(1);
    }

    panic!("clash was never judged");
}

fn single_prompt_config() -> CombatConfig {
    let mut config = CombatConfig::default();
    config.clash.prompts = vec!["J".to_string()];
    config
}

fn verdict_of(record: &CombatRecord) -> Option<(u32, ClashVerdict)> {
    match record {
        CombatRecord::ClashJudged {
            correct, verdict, ..
        } => Some((*correct, *verdict)),
        _ => None,
    }
}

/// 3/4 правильных → handoff, defender finishable, затем execute → dead
#[test]
fn test_clash_win_hands_off_to_finisher() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    let judged = run_clash(&mut duel, &[true, false, true, true]);
    assert_eq!(verdict_of(&judged), Some((3, ClashVerdict::FinisherHandoff)));

    assert!(duel.sim.get_flag(enemy, CombatFlag::Finishable));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Clashing));
    assert!(!duel.sim.get_flag(player, CombatFlag::Clashing));
    assert!(matches!(
        duel.sim.state(player).and_then(|state| state.lock),
        Some(LockReason::Executing { target: Some(t) }) if t == enemy
    ));
    assert_eq!(encounter_count(&mut duel), 0);

    // Warp: target.x − facing × warp_offset
    let warped = duel.sim.position(player).map(|p| p.x).unwrap_or(f32::NAN);
    assert!((warped - 0.7).abs() < 1e-5, "player warped to {}", warped);
    assert!(duel.recorder.played(player, "clash-start"));
    assert!(duel.recorder.played(player, "clash-hit"));
    assert!(duel.recorder.played(player, "clash-miss"));
    assert!(duel.recorder.played(player, "perform-finisher"));
    assert!(duel.recorder.played(enemy, "receive-finisher"));
    assert!(duel.recorder.zoomed(enemy));

    // finisher.duration = 1.2s
    duel.ticks(30);
    assert!(duel.sim.get_flag(enemy, CombatFlag::Dead));
    assert!(duel.sim.is_actionable(player));
    assert!(duel.recorder.played(player, "finisher-complete"));
    assert!(duel.sim.journal().iter().any(|record| matches!(
        record,
        CombatRecord::Executed { target, executor: Some(e), .. } if *target == enemy && *e == player
    )));

    // despawn_grace = 3.0s
    duel.ticks(70);
    assert!(!duel.sim.is_alive_entity(enemy));
    assert!(duel.sim.journal().iter().any(|record| matches!(
        record,
        CombatRecord::Removed { entity, .. } if *entity == enemy
    )));
    assert_eq!(judgments(&duel).len(), 1);
}

/// 2/4 → punish: locks сняты, асимметричный knockback
#[test]
fn test_clash_loss_punishes_and_releases() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    let judged = run_clash(&mut duel, &[true, true, false, false]);
    assert_eq!(verdict_of(&judged), Some((2, ClashVerdict::PunishAndRelease)));

    assert!(!duel.sim.get_flag(player, CombatFlag::Clashing));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Clashing));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Finishable));
    assert!(duel.recorder.played(player, "clash-lost"));

    duel.ticks(10);
    assert_eq!(duel.sim.position(enemy), Some(Vec2::new(2.0, 0.0)));
    assert_eq!(duel.sim.position(player), Some(Vec2::new(-2.0, 0.0)));
    assert!(duel.sim.is_actionable(player));
    assert!(duel.sim.is_actionable(enemy));
    assert_eq!(judgments(&duel).len(), 1);
}

/// Clash loss сбрасывает armored combo атакующего
#[test]
fn test_clash_loss_ends_attacker_armor() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.on_attack_input(enemy);
    duel.ticks(1);
    assert!(duel.sim.get_flag(enemy, CombatFlag::ComboArmored));

    // Враг атакует, игрок — defender
    duel.sim.start_clash(enemy, player);
    for _ in 0..400 {
        if !judgments(&duel).is_empty() {
            break;
        }
        duel.ticks(1);
    }

    let judged = judgments(&duel);
    assert_eq!(judged.len(), 1);
    assert_eq!(verdict_of(&judged[0]), Some((0, ClashVerdict::PunishAndRelease)));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Attacking));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::ComboArmored));
    assert!(duel.recorder.played(enemy, "attack-cancel"));
}

/// Без ввода все prompt'ы истекают → loss с 0 правильных
#[test]
fn test_clash_timeouts_lose() {
    let mut duel = Duel::new(single_prompt_config());

    let judged = run_clash(&mut duel, &[]);
    assert_eq!(verdict_of(&judged), Some((0, ClashVerdict::PunishAndRelease)));
    assert_eq!(duel.recorder.count(duel.player, "clash-miss"), 4);
}

/// Ввод defender'а не засчитывается атакующему
#[test]
fn test_defender_input_does_not_score() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.start_clash(player, enemy);
    for _ in 0..400 {
        if !judgments(&duel).is_empty() {
            break;
        }
        if let Some(key) = prompt_of(&mut duel) {
            duel.sim.on_clash_input(enemy, &key);
        }
        duel.ticks(1);
    }

    let judged = judgments(&duel);
    assert_eq!(judged.len(), 1);
    assert_eq!(verdict_of(&judged[0]), Some((0, ClashVerdict::PunishAndRelease)));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Finishable));
    assert_eq!(duel.recorder.count(player, "clash-hit"), 0);
    assert_eq!(duel.recorder.count(player, "clash-miss"), 4);
}

/// Пустой набор prompts → мгновенный loss, без паники
#[test]
fn test_empty_prompt_set_fails_closed() {
    let mut config = CombatConfig::default();
    config.clash.prompts.clear();
    let mut duel = Duel::new(config);

    duel.sim.start_clash(duel.player, duel.enemy);
    duel.ticks(2);

    let judged = judgments(&duel);
    assert_eq!(judged.len(), 1);
    assert_eq!(verdict_of(&judged[0]), Some((0, ClashVerdict::PunishAndRelease)));
    assert!(duel.sim.is_actionable(duel.player));
}

/// Во время clash удары по участникам и stun игнорируются
#[test]
fn test_clashing_combatants_ignore_strikes() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.start_clash(player, enemy);
    duel.ticks(1);
    assert!(duel.sim.get_flag(player, CombatFlag::Clashing));
    assert!(duel.sim.get_flag(enemy, CombatFlag::Clashing));
    assert!(!duel.sim.is_actionable(player));

    duel.sim.on_projectile_strike(player, 30, Vec2::new(-5.0, 0.0));
    duel.sim.on_attack_input(player);
    duel.sim.on_block_input(enemy, true);
    duel.ticks(1);

    assert_eq!(duel.sim.health(player).map(|h| h.current), Some(100));
    assert!(!duel.sim.get_flag(player, CombatFlag::Attacking));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Blocking));
    assert!(duel.sim.get_flag(player, CombatFlag::Clashing));
}

/// Не-actionable участник не входит в clash
#[test]
fn test_clash_refused_for_stunned_participant() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.set_flag(enemy, CombatFlag::Stunned, true);
    duel.sim.start_clash(player, enemy);
    duel.ticks(2);

    assert!(!duel.sim.get_flag(player, CombatFlag::Clashing));
    assert_eq!(encounter_count(&mut duel), 0);
}

/// Отмена clash: locks сняты, judgment нет
#[test]
fn test_cancel_clash_releases_without_verdict() {
    let mut duel = Duel::new(single_prompt_config());
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.start_clash(player, enemy);
    duel.ticks(3);
    duel.sim.cancel_clash(enemy);
    duel.ticks(1);

    assert!(!duel.sim.get_flag(player, CombatFlag::Clashing));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Clashing));
    assert_eq!(encounter_count(&mut duel), 0);
    assert!(judgments(&duel).is_empty());
    assert_eq!(duel.sim.position(player), Some(Vec2::new(0.0, 0.0)));
    assert_eq!(duel.recorder.last_lock(player), Some(false));
}

fn finishable_duel() -> Duel {
    let mut config = CombatConfig::default();
    config.enemy.max_health = 20;
    let mut duel = Duel::new(config);

    let (player, enemy) = (duel.player, duel.enemy);
    duel.sim.on_strike(player, enemy, 25);
    duel.ticks(1);
    duel
}

/// Health 0 → finishable → standalone finisher → execute → despawn
#[test]
fn test_standalone_finisher_executes_target() {
    let mut duel = finishable_duel();
    let (player, enemy) = (duel.player, duel.enemy);

    assert_eq!(duel.sim.health(enemy).map(|h| h.current), Some(0));
    assert!(duel.sim.get_flag(enemy, CombatFlag::Finishable));
    assert!(!duel.sim.is_actionable(enemy));
    assert!(duel.recorder.played(enemy, "enter-finishable"));

    // Finishable не атакует и не парирует
    duel.sim.on_attack_input(enemy);
    duel.ticks(1);
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Attacking));

    duel.sim.request_finisher(player);
    duel.ticks(1);

    assert!(matches!(
        duel.sim.state(player).and_then(|state| state.lock),
        Some(LockReason::Executing { .. })
    ));
    assert!(duel.recorder.played(player, "perform-finisher"));
    assert_eq!(duel.recorder.last_lock(player), Some(true));

    duel.ticks(30);
    assert!(duel.sim.get_flag(enemy, CombatFlag::Dead));
    assert!(!duel.sim.get_flag(enemy, CombatFlag::Finishable));
    assert!(duel.recorder.played(enemy, "executed"));
    assert!(duel.sim.is_actionable(player));

    duel.ticks(70);
    assert!(!duel.sim.is_alive_entity(enemy));
    assert!(duel.recorder.played(enemy, "despawn"));
}

/// Нет finishable в радиусе → ничего не происходит
#[test]
fn test_finisher_without_target_is_noop() {
    let mut duel = Duel::new(CombatConfig::default());
    let player = duel.player;

    duel.sim.request_finisher(player);
    duel.ticks(1);
    assert!(duel.sim.is_actionable(player));
    assert!(!duel.recorder.played(player, "perform-finisher"));
}

/// Finishable цель вне range не выбирается
#[test]
fn test_finisher_respects_range() {
    let mut duel = finishable_duel();
    let player = duel.player;

    duel.ticks(10); // knockback/lock от удара уже не мешает
    assert!(duel.sim.set_position(player, Vec2::new(-5.0, 0.0)));
    duel.sim.request_finisher(player);
    duel.ticks(1);

    assert!(duel.sim.is_actionable(player));
    assert!(!duel.recorder.played(player, "perform-finisher"));
}

/// execute на живой цели → no-op
#[test]
fn test_execute_requires_finishable() {
    let mut duel = Duel::new(CombatConfig::default());
    let enemy = duel.enemy;

    duel.sim.execute(enemy);
    duel.ticks(1);

    assert!(!duel.sim.get_flag(enemy, CombatFlag::Dead));
    assert!(!duel
        .sim
        .journal()
        .iter()
        .any(|record| matches!(record, CombatRecord::Executed { .. })));
}

/// Двойной execute (standalone + прямой вызов) — один Executed
#[test]
fn test_double_execute_is_idempotent() {
    let mut duel = finishable_duel();
    let (player, enemy) = (duel.player, duel.enemy);

    duel.sim.request_finisher(player);
    duel.sim.execute(enemy);
    duel.sim.execute(enemy);
    duel.ticks(40);

    let executions = duel
        .sim
        .journal()
        .iter()
        .filter(|record| matches!(record, CombatRecord::Executed { .. }))
        .count();
    assert_eq!(executions, 1);
    assert!(duel.sim.get_flag(enemy, CombatFlag::Dead));
    assert!(duel.sim.is_actionable(player));
}
