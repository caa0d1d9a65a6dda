//! Trip itineraries

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::stop::Stop;
use crate::value_objects::TransitMode;

/// One itinerary segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Transport mode, `Other` for walking segments
    pub mode: TransitMode,
    /// Service label ("R 10234", "Bus 201")
    pub service: String,
    /// Direction shown on the vehicle
    pub direction: Option<String>,
    /// Boarding stop
    pub origin: Stop,
    /// Alighting stop
    pub destination: Stop,
    /// Effective departure (predicted when known, else planned)
    pub departure_time: DateTime<FixedOffset>,
    /// Effective arrival (predicted when known, else planned)
    pub arrival_time: DateTime<FixedOffset>,
    /// Timetable departure
    pub scheduled_departure: DateTime<FixedOffset>,
    /// Timetable arrival
    pub scheduled_arrival: DateTime<FixedOffset>,
    /// Boarding platform
    pub platform: Option<String>,
    /// Whether real-time data backs the times
    #[serde(default)]
    pub real_time: bool,
    /// Walking segment between stops
    #[serde(default)]
    pub is_footpath: bool,
    /// Departure delay in minutes when real-time data is present
    pub delay_minutes: Option<i64>,
}

impl Leg {
    /// Leg duration in whole minutes
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.arrival_time - self.departure_time).num_minutes()
    }

    /// Arrival is not before departure
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.arrival_time >= self.departure_time
    }
}

/// Cheapest adult ticket for an itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareSummary {
    /// Ticket name
    pub name: String,
    /// Gross price
    pub price: f64,
    /// ISO currency code
    pub currency: String,
}

/// One itinerary candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    /// Door-to-door duration including waits
    pub duration_minutes: i64,
    /// Number of vehicle changes
    pub transfers: u32,
    /// Segments in chronological order
    pub legs: Vec<Leg>,
    /// Fare, when the upstream publishes one
    pub fare_summary: Option<FareSummary>,
    /// Departure of the first leg
    pub departure_time: DateTime<FixedOffset>,
    /// Arrival of the last leg
    pub arrival_time: DateTime<FixedOffset>,
    /// Legs had to be re-sorted
    #[serde(default)]
    pub ordering_corrected: bool,
    /// Interchange count reported by the upstream
    pub interchanges: Option<u32>,
}

impl TripPlan {
    /// Build a plan from legs, sorting them chronologically
    ///
    /// Returns `None` when there are no legs.
    #[must_use]
    pub fn from_legs(mut legs: Vec<Leg>, interchanges: Option<u32>) -> Option<Self> {
        let ordering_corrected = legs
            .windows(2)
            .any(|pair| pair[1].departure_time < pair[0].departure_time);
        if ordering_corrected {
            legs.sort_by_key(|leg| leg.departure_time);
        }

        let departure_time = legs.first()?.departure_time;
        let arrival_time = legs.iter().map(|l| l.arrival_time).max()?;
        let duration_minutes = Self::sum_duration(&legs);
        let transfers = interchanges.unwrap_or_else(|| Self::count_transfers(&legs));

        Some(Self {
            duration_minutes,
            transfers,
            legs,
            fare_summary: None,
            departure_time,
            arrival_time,
            ordering_corrected,
            interchanges,
        })
    }

    /// Attach a fare
    #[must_use]
    pub fn with_fare(mut self, fare: Option<FareSummary>) -> Self {
        self.fare_summary = fare;
        self
    }

    /// Leg durations plus the waits between consecutive legs
    fn sum_duration(legs: &[Leg]) -> i64 {
        let riding: i64 = legs.iter().map(|l| l.duration_minutes().max(0)).sum();
        let waiting: i64 = legs
            .windows(2)
            .map(|pair| (pair[1].departure_time - pair[0].arrival_time).num_minutes().max(0))
            .sum();
        riding + waiting
    }

    fn count_transfers(legs: &[Leg]) -> u32 {
        let vehicle_legs = legs.iter().filter(|l| !l.is_footpath).count();
        u32::try_from(vehicle_legs.saturating_sub(1)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn leg(dep: &str, arr: &str, footpath: bool) -> Leg {
        let departure_time = ts(dep);
        let arrival_time = ts(arr);
        Leg {
            mode: if footpath {
                TransitMode::Other
            } else {
                TransitMode::Train
            },
            service: "R".to_string(),
            direction: None,
            origin: Stop::new("1", "A").unwrap(),
            destination: Stop::new("2", "B").unwrap(),
            departure_time,
            arrival_time,
            scheduled_departure: departure_time,
            scheduled_arrival: arrival_time,
            platform: None,
            real_time: false,
            is_footpath: footpath,
            delay_minutes: None,
        }
    }

    #[test]
    fn leg_duration() {
        let l = leg("2024-05-16T14:30:00+02:00", "2024-05-16T15:10:00+02:00", false);
        assert_eq!(l.duration_minutes(), 40);
        assert!(l.is_monotonic());
    }

    #[test]
    fn duration_includes_waits() {
        let plan = TripPlan::from_legs(
            vec![
                leg("2024-05-16T14:00:00+02:00", "2024-05-16T14:30:00+02:00", false),
                leg("2024-05-16T14:40:00+02:00", "2024-05-16T15:00:00+02:00", false),
            ],
            None,
        )
        .unwrap();
        assert_eq!(plan.duration_minutes, 60);
        assert_eq!(plan.transfers, 1);
        assert!(!plan.ordering_corrected);
    }

    #[test]
    fn footpaths_do_not_count_as_transfers() {
        let plan = TripPlan::from_legs(
            vec![
                leg("2024-05-16T14:00:00+02:00", "2024-05-16T14:30:00+02:00", false),
                leg("2024-05-16T14:30:00+02:00", "2024-05-16T14:35:00+02:00", true),
                leg("2024-05-16T14:40:00+02:00", "2024-05-16T15:00:00+02:00", false),
            ],
            None,
        )
        .unwrap();
        assert_eq!(plan.transfers, 1);
    }

    #[test]
    fn upstream_interchanges_win() {
        let plan = TripPlan::from_legs(
            vec![leg(
                "2024-05-16T14:00:00+02:00",
                "2024-05-16T14:30:00+02:00",
                false,
            )],
            Some(2),
        )
        .unwrap();
        assert_eq!(plan.transfers, 2);
        assert_eq!(plan.interchanges, Some(2));
    }

    #[test]
    fn out_of_order_legs_are_sorted_and_flagged() {
        let plan = TripPlan::from_legs(
            vec![
                leg("2024-05-16T14:40:00+02:00", "2024-05-16T15:00:00+02:00", false),
                leg("2024-05-16T14:00:00+02:00", "2024-05-16T14:30:00+02:00", false),
            ],
            None,
        )
        .unwrap();
        assert!(plan.ordering_corrected);
        assert_eq!(plan.departure_time, ts("2024-05-16T14:00:00+02:00"));
        assert_eq!(plan.arrival_time, ts("2024-05-16T15:00:00+02:00"));
        assert!(plan.legs[0].departure_time < plan.legs[1].departure_time);
    }

    #[test]
    fn empty_legs_yield_none() {
        assert!(TripPlan::from_legs(Vec::new(), None).is_none());
    }
}
