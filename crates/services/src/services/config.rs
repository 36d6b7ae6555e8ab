//! Environment-driven settings for the editing services.

use std::time::Duration;

use db::{models::plan_meal::PlanMeal, ordering::OrderedFamily};
use tracing::warn;

const DEFAULT_MEAL_DEBOUNCE_MS: u64 = 3000;
const DEFAULT_REORDER_DEBOUNCE_MS: u64 = 750;

/// Debounce windows for client-side reorder reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub meal_debounce: Duration,
    pub default_debounce: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            meal_debounce: Duration::from_millis(DEFAULT_MEAL_DEBOUNCE_MS),
            default_debounce: Duration::from_millis(DEFAULT_REORDER_DEBOUNCE_MS),
        }
    }
}

impl ReconcileConfig {
    /// Read `MEAL_REORDER_DEBOUNCE_MS` and `REORDER_DEBOUNCE_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            meal_debounce: millis_from_env("MEAL_REORDER_DEBOUNCE_MS", DEFAULT_MEAL_DEBOUNCE_MS),
            default_debounce: millis_from_env("REORDER_DEBOUNCE_MS", DEFAULT_REORDER_DEBOUNCE_MS),
        }
    }

    pub fn debounce_for<F: OrderedFamily>(&self) -> Duration {
        if F::TABLE == PlanMeal::TABLE {
            self.meal_debounce
        } else {
            self.default_debounce
        }
    }
}

fn millis_from_env(key: &str, default: u64) -> Duration {
    let millis = match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring invalid debounce setting");
            default
        }),
        Err(_) => default,
    };
    Duration::from_millis(millis)
}
