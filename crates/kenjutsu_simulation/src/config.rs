//! Combat tuning (RON)
//!
//! Все числа боя живут здесь. Загрузка из RON — единственный fallible API
//! ядра; остальное деградирует в "действие не произошло".

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse combat config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("`{field}` must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },
    #[error("clash prompt set is empty, every clash resolves as a loss")]
    EmptyPromptSet,
    #[error("clash needs {required} wins out of {length} prompts and can never be won")]
    UnreachableClash { required: u32, length: u32 },
}

/// Дистанция + длительность смещения
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
pub struct KnockbackParams {
    pub distance: f32,
    pub duration: f32,
}

impl KnockbackParams {
    pub const fn new(distance: f32, duration: f32) -> Self {
        Self { distance, duration }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: u32,
    pub attack_damage: u32,
    pub parry_window: f32,
    /// Доля урона, снимаемая блоком (0.5 = половина)
    pub block_damage_reduction: f32,
    pub parried_stun: f32,
    pub hit_knockback: KnockbackParams,
    pub block_knockback: KnockbackParams,
    pub parried_knockback: KnockbackParams,
    pub combo_length: u8,
    pub combo_armored: bool,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100,
            attack_damage: 25,
            parry_window: 0.3,
            block_damage_reduction: 0.5,
            parried_stun: 0.4,
            hit_knockback: KnockbackParams::new(1.0, 0.15),
            block_knockback: KnockbackParams::new(1.0, 0.15),
            parried_knockback: KnockbackParams::new(1.0, 0.15),
            combo_length: 2,
            combo_armored: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub max_health: u32,
    pub attack_damage: u32,
    pub attack_cooldown: f32,
    pub parry_chance: f32,
    pub readiness_window: f32,
    /// Страховка: drawn parry снимается сам, если "parry-end" не пришёл
    pub parry_hold: f32,
    pub parried_stun: f32,
    pub hit_knockback: KnockbackParams,
    pub parried_knockback: KnockbackParams,
    pub combo_length: u8,
    pub combo_armored: bool,
    /// Доля урона первого удара по armor
    pub armor_bleed_through: f32,
    pub alert_radius: f32,
    pub counter_warning_delay: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            max_health: 100,
            attack_damage: 20,
            attack_cooldown: 2.0,
            parry_chance: 0.5,
            readiness_window: 0.5,
            parry_hold: 0.4,
            parried_stun: 1.5,
            hit_knockback: KnockbackParams::new(0.5, 0.1),
            parried_knockback: KnockbackParams::new(1.0, 0.15),
            combo_length: 3,
            combo_armored: true,
            armor_bleed_through: 1.0,
            alert_radius: 10.0,
            counter_warning_delay: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardBreakTuning {
    pub threshold: u32,
    pub lockout: f32,
    pub knockback: KnockbackParams,
}

impl Default for GuardBreakTuning {
    fn default() -> Self {
        Self {
            threshold: 3,
            lockout: 1.5,
            knockback: KnockbackParams::new(3.0, 0.3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClashTuning {
    pub sequence_length: u32,
    pub required_wins: u32,
    pub prompt_time: f32,
    pub settle_delay: f32,
    pub prompts: Vec<String>,
    pub loss_defender_knockback: KnockbackParams,
    pub loss_attacker_knockback: KnockbackParams,
}

impl Default for ClashTuning {
    fn default() -> Self {
        Self {
            sequence_length: 4,
            required_wins: 3,
            prompt_time: 1.0,
            settle_delay: 0.25,
            prompts: ["Space", "J", "K", "L"].map(String::from).to_vec(),
            loss_defender_knockback: KnockbackParams::new(0.5, 0.15),
            loss_attacker_knockback: KnockbackParams::new(2.0, 0.3),
        }
    }
}

impl ClashTuning {
    /// Оценка длительности всего encounter'а (для camera zoom)
    pub fn estimated_duration(&self) -> f32 {
        self.sequence_length as f32 * (self.prompt_time + self.settle_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinisherTuning {
    pub range: f32,
    pub warp_offset: f32,
    pub duration: f32,
    pub despawn_grace: f32,
    pub camera_zoom: f32,
}

impl Default for FinisherTuning {
    fn default() -> Self {
        Self {
            range: 2.5,
            warp_offset: 0.8,
            duration: 1.2,
            despawn_grace: 3.0,
            camera_zoom: 1.2,
        }
    }
}

/// Полный набор параметров боя
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub guard_break: GuardBreakTuning,
    pub clash: ClashTuning,
    pub finisher: FinisherTuning,
    pub lunge: KnockbackParams,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            enemy: EnemyTuning::default(),
            guard_break: GuardBreakTuning::default(),
            clash: ClashTuning::default(),
            finisher: FinisherTuning::default(),
            lunge: KnockbackParams::new(0.6, 0.12),
        }
    }
}

impl CombatConfig {
    /// Парсинг RON. Отсутствующие поля берутся из defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Первая найденная проблема (если есть)
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Все проблемы конфига без изменения самого конфига
    pub fn issues(&self) -> Vec<ConfigError> {
        self.clone().sanitize()
    }

    /// Чинит значения вне диапазона (возврат к defaults) и возвращает список
    /// найденных проблем.
    ///
    /// Пустой набор prompts и недостижимый clash не чинятся: в runtime это
    /// гарантированный проигрыш clash'а.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let defaults = CombatConfig::default();
        let mut check = Checker::default();

        let player = &mut self.player;
        check.fraction("player.block_damage_reduction", &mut player.block_damage_reduction, defaults.player.block_damage_reduction);
        check.non_negative("player.parry_window", &mut player.parry_window, defaults.player.parry_window);
        check.non_negative("player.parried_stun", &mut player.parried_stun, defaults.player.parried_stun);
        check.knockback("player.hit_knockback", &mut player.hit_knockback, defaults.player.hit_knockback);
        check.knockback("player.block_knockback", &mut player.block_knockback, defaults.player.block_knockback);
        check.knockback("player.parried_knockback", &mut player.parried_knockback, defaults.player.parried_knockback);
        check.at_least_one("player.combo_length", &mut player.combo_length, defaults.player.combo_length);
        check.at_least_one_u32("player.max_health", &mut player.max_health, defaults.player.max_health);

        let enemy = &mut self.enemy;
        check.fraction("enemy.parry_chance", &mut enemy.parry_chance, defaults.enemy.parry_chance);
        check.fraction("enemy.armor_bleed_through", &mut enemy.armor_bleed_through, defaults.enemy.armor_bleed_through);
        check.non_negative("enemy.attack_cooldown", &mut enemy.attack_cooldown, defaults.enemy.attack_cooldown);
        check.non_negative("enemy.readiness_window", &mut enemy.readiness_window, defaults.enemy.readiness_window);
        check.non_negative("enemy.parry_hold", &mut enemy.parry_hold, defaults.enemy.parry_hold);
        check.non_negative("enemy.parried_stun", &mut enemy.parried_stun, defaults.enemy.parried_stun);
        check.non_negative("enemy.alert_radius", &mut enemy.alert_radius, defaults.enemy.alert_radius);
        check.non_negative("enemy.counter_warning_delay", &mut enemy.counter_warning_delay, defaults.enemy.counter_warning_delay);
        check.knockback("enemy.hit_knockback", &mut enemy.hit_knockback, defaults.enemy.hit_knockback);
        check.knockback("enemy.parried_knockback", &mut enemy.parried_knockback, defaults.enemy.parried_knockback);
        check.at_least_one("enemy.combo_length", &mut enemy.combo_length, defaults.enemy.combo_length);
        check.at_least_one_u32("enemy.max_health", &mut enemy.max_health, defaults.enemy.max_health);

        let guard_break = &mut self.guard_break;
        check.at_least_one_u32("guard_break.threshold", &mut guard_break.threshold, defaults.guard_break.threshold);
        check.non_negative("guard_break.lockout", &mut guard_break.lockout, defaults.guard_break.lockout);
        check.knockback("guard_break.knockback", &mut guard_break.knockback, defaults.guard_break.knockback);

        let clash = &mut self.clash;
        check.non_negative("clash.prompt_time", &mut clash.prompt_time, defaults.clash.prompt_time);
        check.non_negative("clash.settle_delay", &mut clash.settle_delay, defaults.clash.settle_delay);
        check.knockback("clash.loss_defender_knockback", &mut clash.loss_defender_knockback, defaults.clash.loss_defender_knockback);
        check.knockback("clash.loss_attacker_knockback", &mut clash.loss_attacker_knockback, defaults.clash.loss_attacker_knockback);
        if clash.prompts.is_empty() {
            check.issues.push(ConfigError::EmptyPromptSet);
        }
        if clash.required_wins > clash.sequence_length {
            check.issues.push(ConfigError::UnreachableClash {
                required: clash.required_wins,
                length: clash.sequence_length,
            });
        }

        let finisher = &mut self.finisher;
        check.non_negative("finisher.range", &mut finisher.range, defaults.finisher.range);
        check.non_negative("finisher.warp_offset", &mut finisher.warp_offset, defaults.finisher.warp_offset);
        check.non_negative("finisher.duration", &mut finisher.duration, defaults.finisher.duration);
        check.non_negative("finisher.despawn_grace", &mut finisher.despawn_grace, defaults.finisher.despawn_grace);
        check.non_negative("finisher.camera_zoom", &mut finisher.camera_zoom, defaults.finisher.camera_zoom);

        check.knockback("lunge", &mut self.lunge, defaults.lunge);

        check.issues
    }
}

#[derive(Default)]
struct Checker {
    issues: Vec<ConfigError>,
}

impl Checker {
    fn fraction(&mut self, field: &'static str, value: &mut f32, default: f32) {
        if !(0.0..=1.0).contains(&*value) {
            self.issues.push(ConfigError::OutOfRange { field, value: *value });
            *value = default;
        }
    }

    fn non_negative(&mut self, field: &'static str, value: &mut f32, default: f32) {
        // NaN тоже не проходит
        if value.is_nan() || *value < 0.0 {
            self.issues.push(ConfigError::Negative { field, value: *value });
            *value = default;
        }
    }

    fn knockback(&mut self, field: &'static str, value: &mut KnockbackParams, default: KnockbackParams) {
        let invalid = |v: f32| v.is_nan() || v < 0.0;
        let bad = [value.distance, value.duration].into_iter().find(|v| invalid(*v));
        if let Some(bad) = bad {
            self.issues.push(ConfigError::Negative { field, value: bad });
            *value = default;
        }
    }

    fn at_least_one(&mut self, field: &'static str, value: &mut u8, default: u8) {
        if *value == 0 {
            self.issues.push(ConfigError::Zero { field });
            *value = default;
        }
    }

    fn at_least_one_u32(&mut self, field: &'static str, value: &mut u32, default: u32) {
        if *value == 0 {
            self.issues.push(ConfigError::Zero { field });
            *value = default;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_ron_partial_overrides() {
        let config = CombatConfig::from_ron(
            r#"(
                guard_break: (threshold: 5),
                clash: (prompts: ["A", "B"], required_wins: 2),
            )"#,
        )
        .expect("valid ron");

        assert_eq!(config.guard_break.threshold, 5);
        assert_eq!(config.guard_break.lockout, 1.5);
        assert_eq!(config.clash.prompts, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(config.clash.required_wins, 2);
        assert_eq!(config.clash.sequence_length, 4);
        assert_eq!(config.player.parry_window, 0.3);
    }

    #[test]
    fn test_from_ron_reports_parse_errors() {
        let result = CombatConfig::from_ron("(player: (parry_window: \"soon\"))");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_sanitize_repairs_out_of_range_values() {
        let mut config = CombatConfig::default();
        config.enemy.parry_chance = 1.7;
        config.player.parry_window = -0.1;
        config.guard_break.threshold = 0;

        let issues = config.sanitize();

        assert_eq!(issues.len(), 3);
        assert_eq!(config.enemy.parry_chance, 0.5);
        assert_eq!(config.player.parry_window, 0.3);
        assert_eq!(config.guard_break.threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_prompts_reported_but_kept() {
        let mut config = CombatConfig::default();
        config.clash.prompts.clear();

        let issues = config.sanitize();

        assert!(matches!(issues.as_slice(), [ConfigError::EmptyPromptSet]));
        assert!(config.clash.prompts.is_empty());
    }

    #[test]
    fn test_unreachable_clash_reported() {
        let mut config = CombatConfig::default();
        config.clash.required_wins = 9;

        let error = config.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "clash needs 9 wins out of 4 prompts and can never be won"
        );
    }
}
