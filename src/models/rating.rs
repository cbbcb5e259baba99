use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// A star rating, always a whole number from 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RatingValue(i32);

impl RatingValue {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(value: i64) -> AppResult<Self> {
        if !(i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            return Err(AppError::Validation(
                "Rating must be an integer between 1 and 5".to_string(),
            ));
        }
        Ok(Self(value as i32))
    }

    /// Accepts any whole JSON number, including `4.0`, and rejects
    /// fractional values like `4.5`
    pub fn from_json(value: &serde_json::Value) -> AppResult<Self> {
        let whole = value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|v| v.fract() == 0.0 && v.abs() <= i64::MAX as f64)
                .map(|v| v as i64)
        });

        match whole {
            Some(v) => Self::new(v),
            None => Err(AppError::Validation(
                "Rating must be an integer between 1 and 5".to_string(),
            )),
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Result of `rate_recipe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOutcome {
    /// True when no rating existed for this (user, recipe) pair before
    pub upserted: bool,
    pub rating: i32,
}

/// Aggregate over every rating of one recipe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatingStats {
    pub average: Option<f64>,
    pub count: i64,
    pub distribution: BTreeMap<i32, i64>,
}

impl RatingStats {
    /// Builds stats from a rating value -> count histogram
    pub fn from_distribution(distribution: BTreeMap<i32, i64>) -> Self {
        let count: i64 = distribution.values().sum();
        if count == 0 {
            return Self::default();
        }

        let total: i64 = distribution
            .iter()
            .map(|(rating, n)| i64::from(*rating) * n)
            .sum();

        Self {
            average: Some(total as f64 / count as f64),
            count,
            distribution,
        }
    }
}

/// Notification sent to the retraining consumer after a rating is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEvent {
    pub event_type: String,
    pub user_id: i64,
    pub recipe_id: i64,
    pub rating: i32,
    pub timestamp: DateTime<Utc>,
}

impl RatingEvent {
    pub const EVENT_TYPE: &'static str = "rating";

    pub fn new(user_id: i64, recipe_id: i64, rating: RatingValue) -> Self {
        Self {
            event_type: Self::EVENT_TYPE.to_string(),
            user_id,
            recipe_id,
            rating: rating.get(),
            timestamp: Utc::now(),
        }
    }
}
