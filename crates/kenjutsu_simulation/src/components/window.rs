//! Window: countdown с open/closed предикатом
//!
//! Используется всеми таймерами боя (parry window, readiness, stun,
//! clash prompt, finisher sequence). Продвигается ровно один раз за тик
//! владеющей системой.

use bevy::prelude::*;

/// Countdown-окно
///
/// Инварианты:
/// - `remaining` монотонно не растёт пока окно открыто
/// - `close()` идемпотентен
/// - окно с duration <= 0 никогда не бывает открытым
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct Window {
    duration: f32,
    remaining: f32,
}

impl Window {
    pub const CLOSED: Window = Window {
        duration: 0.0,
        remaining: 0.0,
    };

    /// Новое открытое окно
    pub fn opened(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self {
            duration,
            remaining: duration,
        }
    }

    /// (Пере)открыть окно на полную длительность
    pub fn open(&mut self, duration: f32) {
        *self = Self::opened(duration);
    }

    pub fn is_open(&self) -> bool {
        self.remaining > 0.0
    }

    /// Продвинуть окно на `delta` секунд.
    ///
    /// Возвращает `true` ровно на том тике, на котором окно закрылось.
    pub fn tick(&mut self, delta: f32) -> bool {
        if !self.is_open() || delta <= 0.0 {
            return false;
        }

        self.remaining = (self.remaining - delta).max(0.0);
        !self.is_open()
    }

    /// Явная отмена. Возвращает `true` если окно было открыто.
    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        self.remaining = 0.0;
        was_open
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn elapsed(&self) -> f32 {
        self.duration - self.remaining
    }

    /// 0.0 при открытии → 1.0 при закрытии
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed() / self.duration).clamp(0.0, 1.0)
    }
}
