//! Fuel-loss totals over recent periods

use crate::event::BrakingEvent;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Look-back period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn days(&self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
        }
    }
}

/// Totals for events inside one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FuelLossSummary {
    pub liters: f64,
    pub cost: f64,
    pub events: usize,
}

impl FuelLossSummary {
    /// Sum events whose timestamp falls in `(now - period, now]`
    pub fn for_period<'a>(
        events: impl IntoIterator<Item = &'a BrakingEvent>,
        period: Period,
        now: DateTime<Utc>,
    ) -> Self {
        let since = now - Duration::days(period.days());
        events
            .into_iter()
            .filter(|e| e.timestamp > since && e.timestamp <= now)
            .fold(Self::default(), |acc, e| Self {
                liters: acc.liters + e.fuel_used_liters,
                cost: acc.cost + e.fuel_cost,
                events: acc.events + 1,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn event(days_ago: i64, liters: f64, now: DateTime<Utc>) -> BrakingEvent {
        BrakingEvent {
            id: Uuid::new_v4(),
            timestamp: now - Duration::days(days_ago),
            deceleration_rate: 12.0,
            speed_at_detection: 30,
            speed_at_return: None,
            intensity: 0.4,
            fuel_used_liters: liters,
            fuel_cost: liters * 2.0,
            address: None,
            location: None,
        }
    }

    #[test]
    fn test_periods() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let events = vec![
            event(0, 0.01, now),
            event(3, 0.02, now),
            event(20, 0.04, now),
            event(200, 0.08, now),
            event(400, 0.16, now),
        ];

        let week = FuelLossSummary::for_period(&events, Period::Week, now);
        assert_eq!(week.events, 2);
        assert!((week.liters - 0.03).abs() < 1e-12);
        assert!((week.cost - 0.06).abs() < 1e-12);

        assert_eq!(FuelLossSummary::for_period(&events, Period::Month, now).events, 3);
        assert_eq!(FuelLossSummary::for_period(&events, Period::Year, now).events, 4);
    }

    #[test]
    fn test_empty() {
        let now = Utc::now();
        let events: Vec<BrakingEvent> = Vec::new();
        let summary = FuelLossSummary::for_period(&events, Period::Year, now);
        assert_eq!(summary, FuelLossSummary::default());
    }
}
