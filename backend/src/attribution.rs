use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::accumulator::RunningTotals;
use crate::emission_factors::round2;
use crate::models::CityBreakdownEntry;

/// What happens to a city's recorded totals when the route comes back to it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CityTotalsPolicy {
    /// Totals stay frozen at the first sighting.
    #[default]
    FirstSeen,
    /// Position stays at the first sighting, totals follow the latest one.
    LastSeen,
}

/// Insertion-ordered map from city name to the totals recorded for it.
#[derive(Debug, Clone, Default)]
pub struct OrderedCities {
    order: Vec<String>,
    totals: HashMap<String, RunningTotals>,
}

impl OrderedCities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `city` unless it is already present. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, city: &str, totals: RunningTotals) -> bool {
        if self.totals.contains_key(city) {
            return false;
        }
        self.order.push(city.to_string());
        self.totals.insert(city.to_string(), totals);
        true
    }

    /// Records `city`, overwriting totals in place if it is already present.
    pub fn upsert(&mut self, city: &str, totals: RunningTotals) {
        if !self.insert_if_absent(city, totals) {
            self.totals.insert(city.to_string(), totals);
        }
    }

    pub fn record(&mut self, policy: CityTotalsPolicy, city: &str, totals: RunningTotals) {
        match policy {
            CityTotalsPolicy::FirstSeen => {
                self.insert_if_absent(city, totals);
            }
            CityTotalsPolicy::LastSeen => self.upsert(city, totals),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RunningTotals)> + '_ {
        self.order
            .iter()
            .filter_map(|city| self.totals.get(city).map(|t| (city.as_str(), t)))
    }

    /// Breakdown rows in first-seen order, rounded to 2 decimals.
    pub fn into_breakdown(self) -> Vec<CityBreakdownEntry> {
        self.iter()
            .map(|(city, totals)| CityBreakdownEntry {
                city: city.to_string(),
                distance_km: round2(totals.distance_km),
                ttw_kg: round2(totals.ttw_kg),
                wtt_kg: round2(totals.wtt_kg),
                wtw_kg: round2(totals.wtw_kg()),
            })
            .collect()
    }
}

/// Folds `(city, totals)` sightings, in route order, into a city breakdown.
pub fn build_breakdown<'a, I>(sightings: I, policy: CityTotalsPolicy) -> Vec<CityBreakdownEntry>
where
    I: IntoIterator<Item = (&'a str, RunningTotals)>,
{
    let mut cities = OrderedCities::new();
    for (city, totals) in sightings {
        cities.record(policy, city, totals);
    }
    cities.into_breakdown()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(distance_km: f64) -> RunningTotals {
        RunningTotals {
            distance_km,
            ttw_kg: distance_km * 0.09,
            wtt_kg: distance_km * 0.02,
        }
    }

    #[test]
    fn first_seen_order_and_frozen_totals() {
        let sightings = [
            ("Lyon", totals(10.0)),
            ("Lyon", totals(20.0)),
            ("Villeurbanne", totals(30.0)),
            ("Lyon", totals(40.0)),
            ("Vaulx-en-Velin", totals(50.0)),
        ];
        let breakdown = build_breakdown(sightings, CityTotalsPolicy::FirstSeen);

        let names: Vec<&str> = breakdown.iter().map(|e| e.city.as_str()).collect();
        assert_eq!(names, vec!["Lyon", "Villeurbanne", "Vaulx-en-Velin"]);
        assert_eq!(breakdown[0].distance_km, 10.0);
        assert_eq!(breakdown[0].ttw_kg, 0.9);
        assert_eq!(breakdown[0].wtt_kg, 0.2);
        assert_eq!(breakdown[0].wtw_kg, 1.1);
        assert_eq!(breakdown[2].distance_km, 50.0);
    }

    #[test]
    fn last_seen_keeps_position_but_updates_totals() {
        let sightings = [
            ("Lyon", totals(10.0)),
            ("Villeurbanne", totals(30.0)),
            ("Lyon", totals(40.0)),
        ];
        let breakdown = build_breakdown(sightings, CityTotalsPolicy::LastSeen);

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].city, "Lyon");
        assert_eq!(breakdown[0].distance_km, 40.0);
        assert_eq!(breakdown[1].distance_km, 30.0);
    }

    #[test]
    fn unknown_is_an_ordinary_city() {
        let sightings = [
            ("Unknown", totals(1.0)),
            ("Grenoble", totals(2.0)),
            ("Unknown", totals(3.0)),
        ];
        let breakdown = build_breakdown(sightings, CityTotalsPolicy::FirstSeen);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].city, "Unknown");
        assert_eq!(breakdown[0].distance_km, 1.0);
    }

    #[test]
    fn insert_if_absent_reports_insertion() {
        let mut cities = OrderedCities::new();
        assert!(cities.is_empty());
        assert!(cities.insert_if_absent("Annecy", totals(1.0)));
        assert!(!cities.insert_if_absent("Annecy", totals(2.0)));
        assert_eq!(cities.len(), 1);
        let (_, recorded) = cities.iter().next().unwrap();
        assert_eq!(recorded.distance_km, 1.0);
    }

    #[test]
    fn empty_route_has_empty_breakdown() {
        let sightings: Vec<(&str, RunningTotals)> = Vec::new();
        let breakdown = build_breakdown(sightings, CityTotalsPolicy::FirstSeen);
        assert!(breakdown.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_one_entry_per_city_in_first_seen_order(
                visits in prop::collection::vec(0usize..6, 0..60)
            ) {
                let names = ["A", "B", "C", "D", "E", "F"];
                let sightings: Vec<(&str, RunningTotals)> = visits
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (names[v], totals(i as f64)))
                    .collect();

                let mut expected: Vec<&str> = Vec::new();
                for (city, _) in &sightings {
                    if !expected.contains(city) {
                        expected.push(*city);
                    }
                }

                let breakdown = build_breakdown(sightings.clone(), CityTotalsPolicy::FirstSeen);
                let got: Vec<&str> = breakdown.iter().map(|e| e.city.as_str()).collect();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
