use geo::{Distance, Geodesic};
use geo_types::Point;

use crate::emission_factors::{compute, EmissionFactors, SegmentEmissions};
use crate::models::Coordinate;

/// Geodesic (WGS84 ellipsoid) distance between two coordinates in kilometres.
pub fn geodesic_km(a: Coordinate, b: Coordinate) -> f64 {
    let a = Point::new(a.lon, a.lat);
    let b = Point::new(b.lon, b.lat);
    Geodesic.distance(a, b) / 1000.0
}

/// Route totals as of the end of a segment. Never rounded while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningTotals {
    pub distance_km: f64,
    pub ttw_kg: f64,
    pub wtt_kg: f64,
}

impl RunningTotals {
    pub fn wtw_kg(&self) -> f64 {
        self.ttw_kg + self.wtt_kg
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStep {
    /// Index of the segment end point in the walked sequence.
    pub index: usize,
    pub end: Coordinate,
    pub distance_km: f64,
    pub emissions: SegmentEmissions,
    pub totals: RunningTotals,
}

/// Single forward walk over consecutive waypoints.
#[derive(Debug, Clone)]
pub struct SegmentAccumulator {
    factors: EmissionFactors,
    load_weight_ton: f64,
    totals: RunningTotals,
}

impl SegmentAccumulator {
    pub fn new(factors: EmissionFactors, load_weight_ton: f64) -> Self {
        Self {
            factors,
            load_weight_ton,
            totals: RunningTotals::default(),
        }
    }

    pub fn totals(&self) -> RunningTotals {
        self.totals
    }

    /// Adds the segment `from -> to` and returns its contribution.
    pub fn advance(&mut self, from: Coordinate, to: Coordinate) -> (f64, SegmentEmissions) {
        let distance_km = geodesic_km(from, to);
        let emissions = compute(self.factors, distance_km, self.load_weight_ton);
        self.totals.distance_km += distance_km;
        self.totals.ttw_kg += emissions.ttw_kg;
        self.totals.wtt_kg += emissions.wtt_kg;
        (distance_km, emissions)
    }

    /// Lazily walks every consecutive pair of `points`.
    pub fn walk<'a>(
        &'a mut self,
        points: &'a [Coordinate],
    ) -> impl Iterator<Item = SegmentStep> + 'a {
        points.windows(2).enumerate().map(move |(i, pair)| {
            let (distance_km, emissions) = self.advance(pair[0], pair[1]);
            SegmentStep {
                index: i + 1,
                end: pair[1],
                distance_km,
                emissions,
                totals: self.totals,
            }
        })
    }
}
