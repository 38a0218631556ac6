//! Response curves для смещений

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum Easing {
    Linear,
    /// 3t² − 2t³
    #[default]
    SmoothStep,
    /// Быстрый старт, мягкая остановка (lunge)
    EaseOut,
}

impl Easing {
    /// t ∈ [0, 1] → [0, 1], f(0) = 0, f(1) = 1
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}
