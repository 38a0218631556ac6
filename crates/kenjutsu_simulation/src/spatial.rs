//! Spatial registry
//!
//! Вместо глобальных "найди ближайшего врага / найди игрока" — явный
//! resource, пересобираемый из Position в начале тика (и перед finisher'ами).
//! Системы получают его через Res<SpatialIndex>.

use bevy::prelude::*;

use crate::components::{CombatState, LifeState, Player, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub position: Vec2,
    pub is_player: bool,
    pub life: LifeState,
}

#[derive(Resource, Debug, Default, Clone)]
pub struct SpatialIndex {
    entries: Vec<SpatialEntry>,
}

impl SpatialIndex {
    pub fn from_entries(mut entries: Vec<SpatialEntry>) -> Self {
        // Стабильный порядок для детерминизма tie-break'ов
        entries.sort_by_key(|entry| entry.entity);
        Self { entries }
    }

    pub fn entries(&self) -> &[SpatialEntry] {
        &self.entries
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec2> {
        self.entries
            .iter()
            .find(|entry| entry.entity == entity)
            .map(|entry| entry.position)
    }

    /// Ближайший finishable в радиусе (кроме `exclude`)
    pub fn nearest_finishable(&self, origin: Vec2, range: f32, exclude: Entity) -> Option<Entity> {
        self.nearest(origin, range, |entry| {
            entry.entity != exclude && entry.life == LifeState::Finishable
        })
    }

    /// Живые враги в радиусе
    pub fn enemies_within(&self, origin: Vec2, radius: f32) -> Vec<Entity> {
        self.entries
            .iter()
            .filter(|entry| {
                !entry.is_player
                    && entry.life == LifeState::Alive
                    && entry.position.distance(origin) <= radius
            })
            .map(|entry| entry.entity)
            .collect()
    }

    pub fn nearest(
        &self,
        origin: Vec2,
        range: f32,
        filter: impl Fn(&SpatialEntry) -> bool,
    ) -> Option<Entity> {
        self.entries
            .iter()
            .filter(|entry| filter(entry))
            .map(|entry| (entry.entity, entry.position.distance(origin)))
            .filter(|(_, distance)| *distance <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity)
    }
}

pub fn rebuild_spatial_index(
    mut index: ResMut<SpatialIndex>,
    combatants: Query<(Entity, &Position, &CombatState, Has<Player>)>,
) {
    let entries = combatants
        .iter()
        .map(|(entity, position, state, is_player)| SpatialEntry {
            entity,
            position: position.0,
            is_player,
            life: state.life,
        })
        .collect();
    *index = SpatialIndex::from_entries(entries);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32, x: f32, is_player: bool, life: LifeState) -> SpatialEntry {
        SpatialEntry {
            entity: Entity::from_raw(index),
            position: Vec2::new(x, 0.0),
            is_player,
            life,
        }
    }

    #[test]
    fn test_nearest_finishable_respects_range_and_life() {
        let index = SpatialIndex::from_entries(vec![
            entry(0, 0.0, true, LifeState::Alive),
            entry(1, 1.0, false, LifeState::Alive),
            entry(2, 2.0, false, LifeState::Finishable),
            entry(3, -1.5, false, LifeState::Finishable),
            entry(4, 0.5, false, LifeState::Dead),
        ]);

        let player = Entity::from_raw(0);
        assert_eq!(
            index.nearest_finishable(Vec2::ZERO, 2.5, player),
            Some(Entity::from_raw(3))
        );
        assert_eq!(index.nearest_finishable(Vec2::ZERO, 1.0, player), None);
    }

    #[test]
    fn test_enemies_within_skips_player_and_fallen() {
        let index = SpatialIndex::from_entries(vec![
            entry(0, 0.0, true, LifeState::Alive),
            entry(1, 3.0, false, LifeState::Alive),
            entry(2, 20.0, false, LifeState::Alive),
            entry(3, 1.0, false, LifeState::Finishable),
        ]);

        assert_eq!(index.enemies_within(Vec2::ZERO, 10.0), vec![Entity::from_raw(1)]);
        assert_eq!(index.position_of(Entity::from_raw(2)), Some(Vec2::new(20.0, 0.0)));
    }
}
