//! Host facade над ECS симуляцией
//!
//! Архитектура:
//! - Владеет Bevy App (симуляция + collaborators)
//! - Host (движок, тесты, headless demo) вызывает on_* методы → events в ECS
//! - Каждый кадр: tick(dt) → SimulationClock.delta → app.update()
//! - Отказ операции = `false` + лог, паник нет

use bevy::prelude::*;

use crate::clash::{CancelClash, ClashInput, ClashRequest};
use crate::collaborators::{AnimationSink, CameraRig, Collaborators, LocomotionDriver};
use crate::combat::{
    AttackInput, BlockInput, ComboProfile, EnemyBrain, IncomingAttack, ParryCounter, PhaseEvent,
    PhaseMarker, StrikeEvent,
};
use crate::components::{CombatFlag, CombatState, Enemy, Facing, Health, Player, Position};
use crate::config::CombatConfig;
use crate::finisher::{ExecuteRequest, FinisherRequest};
use crate::journal::{CombatJournal, CombatRecord};
use crate::knockback::{CancelDisplacement, Easing, KnockbackRequest, Motion};
use crate::logger;
use crate::{create_headless_app, SimulationClock};

/// Единственная точка входа host'а в ядро боя
pub struct CombatSimulation {
    app: App,
}

impl CombatSimulation {
    /// Конфиг чинится (sanitize), найденные проблемы уходят в warning лог
    pub fn new(mut config: CombatConfig, seed: u64) -> Self {
        for issue in config.sanitize() {
            logger::log_warning(&format!("⚠️ Combat config: {}", issue));
        }

        let mut app = create_headless_app(seed);
        app.insert_resource(config);

        logger::log_info(&format!("🎮 Combat simulation ready (seed: {})", seed));
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn config(&self) -> &CombatConfig {
        self.app.world().resource::<CombatConfig>()
    }

    // ========================================================================
    // Spawn
    // ========================================================================

    pub fn spawn_player(&mut self, position: Vec2, facing: Facing) -> Entity {
        let tuning = self.config().player.clone();
        let entity = self
            .app
            .world_mut()
            .spawn((
                Player,
                Position(position),
                facing,
                Health::new(tuning.max_health),
                ComboProfile {
                    length: tuning.combo_length,
                    armored: tuning.combo_armored,
                    auto_chain: false,
                },
            ))
            .id();

        logger::log(&format!("✅ Player spawned (entity: {:?})", entity));
        entity
    }

    pub fn spawn_enemy(&mut self, position: Vec2, facing: Facing) -> Entity {
        let tuning = self.config().enemy.clone();
        let entity = self
            .app
            .world_mut()
            .spawn((
                Enemy,
                Position(position),
                facing,
                Health::new(tuning.max_health),
                ComboProfile {
                    length: tuning.combo_length,
                    armored: tuning.combo_armored,
                    auto_chain: true,
                },
                EnemyBrain::from_tuning(&tuning),
            ))
            .id();

        logger::log(&format!("✅ Enemy spawned (entity: {:?})", entity));
        entity
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Один тик симуляции. Отрицательная/NaN delta считается нулевой.
    pub fn tick(&mut self, delta: f32) {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            logger::log_warning(&format!("⚠️ Invalid tick delta {}, using 0", delta));
            0.0
        };

        self.app.world_mut().resource_mut::<SimulationClock>().delta = delta;
        self.app.update();
    }

    pub fn tick_count(&self) -> u64 {
        self.app.world().resource::<SimulationClock>().tick
    }

    // ========================================================================
    // Input events (host → ECS)
    // ========================================================================

    /// Hitbox игрока/врага пересёкся с hurtbox'ом defender'а
    pub fn on_strike(&mut self, attacker: Entity, defender: Entity, damage: u32) {
        self.on_strike_with(StrikeEvent::melee(attacker, defender, damage));
    }

    pub fn on_strike_with(&mut self, strike: StrikeEvent) {
        self.app.world_mut().send_event(strike);
    }

    pub fn on_projectile_strike(&mut self, defender: Entity, damage: u32, origin: Vec2) {
        self.on_strike_with(StrikeEvent::projectile(defender, damage, origin));
    }

    pub fn on_block_input(&mut self, entity: Entity, pressed: bool) {
        self.app
            .world_mut()
            .send_event(BlockInput { entity, pressed });
    }

    pub fn on_attack_input(&mut self, entity: Entity) {
        self.app.world_mut().send_event(AttackInput { entity });
    }

    /// Маркер анимации по имени. Неизвестное имя → `false` + лог.
    pub fn on_phase_event(&mut self, entity: Entity, phase: &str) -> bool {
        let Some(marker) = PhaseMarker::parse(phase) else {
            logger::log_warning(&format!("⚠️ Unknown phase '{}' for {:?}", phase, entity));
            return false;
        };

        self.app.world_mut().send_event(PhaseEvent { entity, marker });
        true
    }

    /// "По врагу сейчас ударят" → окно parry readiness
    pub fn on_incoming_attack(&mut self, enemy: Entity) {
        self.app.world_mut().send_event(IncomingAttack { enemy });
    }

    pub fn start_clash(&mut self, attacker: Entity, defender: Entity) {
        self.app
            .world_mut()
            .send_event(ClashRequest { attacker, defender });
    }

    pub fn on_clash_input(&mut self, entity: Entity, key: &str) {
        self.app.world_mut().send_event(ClashInput {
            entity,
            key: key.to_string(),
        });
    }

    pub fn cancel_clash(&mut self, entity: Entity) {
        self.app.world_mut().send_event(CancelClash { entity });
    }

    pub fn request_finisher(&mut self, attacker: Entity) {
        self.app.world_mut().send_event(FinisherRequest { attacker });
    }

    /// Прямой execute (без finisher анимации)
    pub fn execute(&mut self, target: Entity) {
        self.app.world_mut().send_event(ExecuteRequest {
            target,
            executor: None,
        });
    }

    pub fn request_knockback(
        &mut self,
        target: Entity,
        source: Vec2,
        distance: f32,
        duration: f32,
        easing: Easing,
    ) {
        self.app.world_mut().send_event(KnockbackRequest {
            source,
            target,
            distance,
            duration,
            easing,
        });
    }

    pub fn cancel_knockback(&mut self, entity: Entity) {
        self.app
            .world_mut()
            .send_event(CancelDisplacement { entity });
    }

    // ========================================================================
    // Position (locomotion writer)
    // ========================================================================

    /// Запись позиции от locomotion. Отклоняется пока позицию держит resolver.
    pub fn set_position(&mut self, entity: Entity, position: Vec2) -> bool {
        let world = self.app.world_mut();
        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            return false;
        };

        if entity_mut.get::<Motion>().is_some_and(Motion::is_locked) {
            logger::log(&format!("💨 {:?} position locked by displacement", entity));
            return false;
        }

        match entity_mut.get_mut::<Position>() {
            Some(mut current) => {
                current.0 = position;
                true
            }
            None => false,
        }
    }

    pub fn set_facing(&mut self, entity: Entity, facing: Facing) -> bool {
        let world = self.app.world_mut();
        match world.get_mut::<Facing>(entity) {
            Some(mut current) => {
                *current = facing;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn bind_animation_sink(&mut self, sink: Box<dyn AnimationSink>) {
        self.app.world_mut().resource_mut::<Collaborators>().animation = Some(sink);
    }

    pub fn bind_locomotion(&mut self, driver: Box<dyn LocomotionDriver>) {
        self.app.world_mut().resource_mut::<Collaborators>().locomotion = Some(driver);
    }

    pub fn bind_camera(&mut self, camera: Box<dyn CameraRig>) {
        self.app.world_mut().resource_mut::<Collaborators>().camera = Some(camera);
    }

    // ========================================================================
    // Registry (get_flag / set_flag) + read accessors
    // ========================================================================

    pub fn get_flag(&self, entity: Entity, flag: CombatFlag) -> bool {
        self.state(entity)
            .is_some_and(|state| state.get_flag(flag))
    }

    /// Низкоуровневая запись флага. Невалидный переход → `false` + лог.
    pub fn set_flag(&mut self, entity: Entity, flag: CombatFlag, value: bool) -> bool {
        let Some(mut state) = self.app.world_mut().get_mut::<CombatState>(entity) else {
            logger::log_warning(&format!("⚠️ set_flag on unknown {:?}", entity));
            return false;
        };

        let accepted = state.set_flag(flag, value);
        if !accepted {
            logger::log(&format!(
                "⚔️ set_flag({:?}, {:?}, {}) refused",
                entity, flag, value
            ));
        }
        accepted
    }

    pub fn is_actionable(&self, entity: Entity) -> bool {
        self.state(entity).is_some_and(CombatState::is_actionable)
    }

    pub fn state(&self, entity: Entity) -> Option<&CombatState> {
        self.app.world().get::<CombatState>(entity)
    }

    pub fn health(&self, entity: Entity) -> Option<Health> {
        self.app.world().get::<Health>(entity).copied()
    }

    pub fn position(&self, entity: Entity) -> Option<Vec2> {
        self.app.world().get::<Position>(entity).map(|p| p.0)
    }

    pub fn facing(&self, entity: Entity) -> Option<Facing> {
        self.app.world().get::<Facing>(entity).copied()
    }

    pub fn parry_counter(&self, entity: Entity) -> Option<u32> {
        self.app
            .world()
            .get::<ParryCounter>(entity)
            .map(|counter| counter.count)
    }

    pub fn combo_step(&self, entity: Entity) -> Option<u8> {
        self.state(entity)
            .and_then(CombatState::combo)
            .map(|combo| combo.step)
    }

    /// Host делает hit detection только пока окно открыто
    pub fn is_damage_window_open(&self, entity: Entity) -> bool {
        self.state(entity)
            .and_then(CombatState::combo)
            .is_some_and(|combo| combo.damage_window)
    }

    /// Entity ещё существует в мире (не despawn'нута)
    pub fn is_alive_entity(&self, entity: Entity) -> bool {
        self.app.world().get_entity(entity).is_ok()
    }

    pub fn is_position_locked(&self, entity: Entity) -> bool {
        self.app
            .world()
            .get::<Motion>(entity)
            .is_some_and(Motion::is_locked)
    }

    pub fn journal(&self) -> &[CombatRecord] {
        self.app.world().resource::<CombatJournal>().records()
    }

    pub fn drain_journal(&mut self) -> Vec<CombatRecord> {
        self.app.world_mut().resource_mut::<CombatJournal>().drain()
    }
}
