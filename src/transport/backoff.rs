//! Capped exponential backoff with a wall-clock budget.
//!
//! The delay after failure `n` is `initial × multiplier^n`, capped at
//! `max_interval`, then randomized within `± randomization_factor`. Once the
//! time already spent plus the next delay would exceed `max_elapsed`, the
//! backoff is exhausted and [`ExponentialBackoff::next_backoff`] returns `None`.

use rand::Rng;
use std::time::{Duration, Instant};

use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    max_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_elapsed: Duration,
    started: Instant,
}

impl ExponentialBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            current: config.initial_interval(),
            max_interval: config.max_interval(),
            multiplier: config.multiplier.max(1.0),
            randomization_factor: config.randomization_factor.clamp(0.0, 1.0),
            max_elapsed: config.max_elapsed(),
            started: Instant::now(),
        }
    }

    /// Delay to wait before the next attempt, or `None` once the budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.randomize(self.current);
        self.grow();

        if self.started.elapsed() + delay > self.max_elapsed {
            return None;
        }
        Some(delay)
    }

    fn grow(&mut self) {
        let next = self.current.as_secs_f64() * self.multiplier;
        self.current = if !next.is_finite() || next > self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        };
    }

    fn randomize(&self, base: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return base;
        }
        let delta = base.as_secs_f64() * self.randomization_factor;
        let low = base.as_secs_f64() - delta;
        let high = base.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}
