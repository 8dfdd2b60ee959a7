//! Spatial helpers: H3 cells are the location type for every entity.
//!
//! Distances are great-circle (Haversine) between cell centers; paths follow the
//! H3 grid. Serde helpers store cells as raw `u64` indices.

use h3o::{CellIndex, LatLng, Resolution};
use rand::Rng;

/// Resolution used when snapping coordinates to cells (~240m cell edge).
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Nine;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl Bounds {
    /// Berlin, Germany (approx).
    pub const BERLIN: Bounds = Bounds {
        lat_min: 52.34,
        lat_max: 52.68,
        lng_min: 13.08,
        lng_max: 13.76,
    };

    /// Draw a uniformly distributed cell inside the box.
    pub fn sample_cell<R: Rng + ?Sized>(&self, rng: &mut R, resolution: Resolution) -> Option<CellIndex> {
        let lat = if self.lat_max > self.lat_min {
            rng.gen_range(self.lat_min..self.lat_max)
        } else {
            self.lat_min
        };
        let lng = if self.lng_max > self.lng_min {
            rng.gen_range(self.lng_min..self.lng_max)
        } else {
            self.lng_min
        };
        cell_at(lat, lng, resolution)
    }
}

/// Snap a coordinate to its cell, `None` for invalid coordinates.
pub fn cell_at(lat: f64, lng: f64, resolution: Resolution) -> Option<CellIndex> {
    LatLng::new(lat, lng).ok().map(|ll| ll.to_cell(resolution))
}

/// Great-circle distance between two cell centers.
pub fn distance_km_between_cells(a: CellIndex, b: CellIndex) -> f64 {
    let a: LatLng = a.into();
    let b: LatLng = b.into();
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Cells along the grid path from `from` to `to`, both ends included.
/// `None` when H3 cannot build a local path (different faces, pentagon distortion).
pub fn grid_path(from: CellIndex, to: CellIndex) -> Option<Vec<CellIndex>> {
    let path = from.grid_path_cells(to).ok()?;
    let cells: Vec<CellIndex> = path.collect::<Result<_, _>>().ok()?;
    if cells.is_empty() {
        None
    } else {
        Some(cells)
    }
}

/// Serde helper: serialize a `CellIndex` as `u64`.
pub mod cell_serde {
    use h3o::CellIndex;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(cell: &CellIndex, ser: S) -> Result<S::Ok, S::Error> {
        u64::from(*cell).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<CellIndex, D::Error> {
        let raw = u64::deserialize(de)?;
        CellIndex::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Serde helper: serialize a `Vec<CellIndex>` as `Vec<u64>`.
pub mod cell_vec_serde {
    use h3o::CellIndex;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(cells: &[CellIndex], ser: S) -> Result<S::Ok, S::Error> {
        let raw: Vec<u64> = cells.iter().map(|c| u64::from(*c)).collect();
        raw.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<CellIndex>, D::Error> {
        let raw: Vec<u64> = Vec::<u64>::deserialize(de)?;
        raw.into_iter()
            .map(|v| CellIndex::try_from(v).map_err(serde::de::Error::custom))
            .collect()
    }
}
