//! Kenjutsu Simulation Core
//!
//! ECS-ядро боя на Bevy 0.16: tick-driven, детерминированное, headless.
//!
//! Архитектура:
//! - ECS = правила боя (registry, strike resolution, combo/armor, guard break,
//!   clash, finisher, knockback)
//! - Host = рендер, физика, hit detection, анимации (через collaborators)
//! - Host пишет input events и delta, ядро пишет intents и journal

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod clash;
pub mod collaborators;
pub mod combat;
pub mod components;
pub mod config;
pub mod finisher;
pub mod host;
pub mod journal;
pub mod knockback;
pub mod logger;
pub mod spatial;

// Re-export базовых типов для удобства
pub use clash::{ClashEncounter, ClashJudged, ClashPlugin, ClashVerdict};
pub use collaborators::{AnimationSink, CameraRig, Collaborators, Intent, LocomotionDriver};
pub use combat::{CombatPlugin, ParryCounter, StrikeEvent, StrikeOutcome};
pub use components::*;
pub use config::{CombatConfig, ConfigError, KnockbackParams};
pub use finisher::FinisherPlugin;
pub use host::CombatSimulation;
pub use journal::{CombatJournal, CombatRecord};
pub use knockback::{Easing, KnockbackPlugin, Motion};
pub use spatial::SpatialIndex;

/// Фазы тика (строго последовательно)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    /// Счётчик тика + spatial registry
    Clock,
    /// Окна: parry, stun, readiness, cooldown, counter warning
    Timers,
    /// Input events host'а и animation markers
    Input,
    Resolve,
    Escalate,
    /// Stun / forced counter команды
    Commands,
    /// Clash encounters
    Encounters,
    Finisher,
    /// Knockback / lunge
    Displacement,
    /// Intents → collaborators
    Dispatch,
    Journal,
}

/// Время симуляции. `delta` пишет host перед каждым `app.update()`.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    pub delta: f32,
    pub tick: u64,
    pub elapsed: f64,
}

pub fn advance_clock(mut clock: ResMut<SimulationClock>) {
    clock.tick += 1;
    clock.elapsed += f64::from(clock.delta);
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Детерминистичный RNG (seed по умолчанию, если host не задал свой)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app.init_resource::<CombatConfig>()
            .init_resource::<SimulationClock>()
            .init_resource::<SpatialIndex>()
            .init_resource::<Collaborators>()
            .init_resource::<CombatJournal>()
            .add_event::<collaborators::AnimationIntent>()
            .add_event::<collaborators::CameraZoom>()
            .add_event::<collaborators::MovementLockChanged>();

        app.configure_sets(
            Update,
            (
                CombatSet::Clock,
                CombatSet::Timers,
                CombatSet::Input,
                CombatSet::Resolve,
                CombatSet::Escalate,
                CombatSet::Commands,
                CombatSet::Encounters,
                CombatSet::Finisher,
                CombatSet::Displacement,
                CombatSet::Dispatch,
                CombatSet::Journal,
            )
                .chain(),
        );

        // Подсистемы
        app.add_plugins((CombatPlugin, ClashPlugin, FinisherPlugin, KnockbackPlugin));

        app.add_systems(
            Update,
            (advance_clock, spatial::rebuild_spatial_index)
                .chain()
                .in_set(CombatSet::Clock),
        )
        .add_systems(
            Update,
            collaborators::dispatch_to_collaborators.in_set(CombatSet::Dispatch),
        )
        .add_systems(
            Update,
            journal::record_combat_journal.in_set(CombatSet::Journal),
        );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(SimulationPlugin);

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    let mut snapshot = Vec::new();
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
