//! Headless дуэль Kenjutsu
//!
//! Скриптованный бой игрок vs враг без рендера: печатает journal и итоговые
//! флаги. Конфиг можно передать путём к RON файлу первым аргументом.

use bevy::prelude::Vec2;
use kenjutsu_simulation::logger::{self, LogLevel};
use kenjutsu_simulation::{CombatConfig, CombatFlag, CombatSimulation, Facing};

const DELTA: f32 = 1.0 / 60.0;

fn load_config() -> CombatConfig {
    let Some(path) = std::env::args().nth(1) else {
        return CombatConfig::default();
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|text| CombatConfig::from_ron(&text).map_err(|err| err.to_string()));

    match parsed {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load {}: {}, using defaults", path, err);
            CombatConfig::default()
        }
    }
}

fn main() {
    let seed = 42;
    println!("Starting Kenjutsu headless duel (seed: {})", seed);

    let mut sim = CombatSimulation::new(load_config(), seed);
    logger::set_log_level(LogLevel::Info);

    let player = sim.spawn_player(Vec2::new(0.0, 0.0), Facing::Right);
    let enemy = sim.spawn_enemy(Vec2::new(1.5, 0.0), Facing::Left);
    let damage = sim.config().player.attack_damage;

    // Игрок атакует пока враг не станет finishable (или не кончатся тики)
    for tick in 0..600 {
        if sim.get_flag(enemy, CombatFlag::Finishable) {
            println!("Tick {}: enemy is finishable", tick);
            break;
        }

        if sim.is_actionable(player) && !sim.get_flag(player, CombatFlag::Attacking) {
            sim.on_attack_input(player);
            sim.on_incoming_attack(enemy);
        } else if sim.get_flag(player, CombatFlag::Attacking) {
            sim.on_phase_event(player, "damage-start");
            sim.on_strike(player, enemy, damage);
            sim.on_phase_event(player, "attack-complete");
        }

        sim.tick(DELTA);
    }

    sim.request_finisher(player);
    for _ in 0..400 {
        sim.tick(DELTA);
    }

    for record in sim.drain_journal() {
        println!("{:?}", record);
    }

    println!(
        "Duel complete! player health: {:?}, enemy present: {}",
        sim.health(player).map(|h| h.current),
        sim.is_alive_entity(enemy)
    );
}
