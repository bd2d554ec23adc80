use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::EngineError;
use crate::models::{Coordinate, EmissionProfile};

const CREATOR: &str = "greenroute";

/// What the exported track is labelled with.
#[derive(Debug, Clone, Copy)]
pub struct TrackSummary<'a> {
    pub profile: &'a EmissionProfile,
    pub distance_km: f64,
    pub wtw_kg: f64,
}

impl TrackSummary<'_> {
    /// `car/diesel 42.00 km`, or just `walk 3.10 km` when no fuel applies.
    fn title(&self) -> String {
        let profile = self.profile;
        if profile.fuel_type.is_empty() {
            format!("{} {:.2} km", profile.vehicle_type, self.distance_km)
        } else {
            format!(
                "{}/{} {:.2} km",
                profile.vehicle_type, profile.fuel_type, self.distance_km
            )
        }
    }
}

/// Base64 GPX 1.1 document with the simplified route as a single track.
pub fn encode_route_as_gpx(
    path: &[Coordinate],
    summary: TrackSummary<'_>,
) -> Result<String, EngineError> {
    let track = Track {
        name: Some(summary.title()),
        description: Some(format!("WTW {:.2} kg CO2e", summary.wtw_kg)),
        type_: Some(summary.profile.vehicle_type.clone()),
        segments: vec![TrackSegment {
            points: path
                .iter()
                .map(|c| Waypoint::new(Point::new(c.lon, c.lat)))
                .collect(),
        }],
        ..Default::default()
    };
    let document = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        tracks: vec![track],
        ..Default::default()
    };

    let mut xml = Vec::new();
    gpx::write(&document, &mut xml)?;
    Ok(BASE64.encode(xml))
}
