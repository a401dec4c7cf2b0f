//! Hierarchical hexagonal binning of coordinates on the H3 grid.
//!
//! Cells are real H3 indexes, so bucket keys line up with any other H3 tooling
//! and neighbourhoods hold across the antimeridian and the poles. At
//! resolution 7 a cell is about 5 km² (roughly 1.2 km edge).

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

pub const MAX_RESOLUTION: u8 = 15;
pub const DEFAULT_RESOLUTION: u8 = 7;

/// An H3 cell. Displays and serializes as the usual hex index string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexCell(CellIndex);

impl HexCell {
    /// Cell containing (lat, lon), in degrees. Resolutions above
    /// [`MAX_RESOLUTION`] are clamped. `None` for non-finite coordinates.
    pub fn from_coords(lat: f64, lon: f64, resolution: u8) -> Option<Self> {
        let resolution = Resolution::try_from(resolution.min(MAX_RESOLUTION)).ok()?;
        let point = LatLng::new(lat, lon).ok()?;
        Some(Self(point.to_cell(resolution)))
    }

    pub fn resolution(&self) -> u8 {
        u8::from(self.0.resolution())
    }

    /// Center of the cell as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        let center = LatLng::from(self.0);
        (center.lat(), center.lng())
    }

    /// The ring of cells touching this one (five around a pentagon).
    pub fn neighbors(&self) -> Vec<HexCell> {
        self.0
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .filter(|c| *c != self.0)
            .map(HexCell)
            .collect()
    }

    /// Grid distance in cells. `None` across resolutions or when H3 cannot
    /// unfold the path (very distant cells, pentagon distortion).
    pub fn distance(&self, other: &HexCell) -> Option<u32> {
        if self.0.resolution() != other.0.resolution() {
            return None;
        }
        self.0.grid_distance(other.0).ok().and_then(|d| u32::try_from(d).ok())
    }
}

impl Ord for HexCell {
    fn cmp(&self, other: &Self) -> Ordering {
        u64::from(self.0).cmp(&u64::from(other.0))
    }
}

impl PartialOrd for HexCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for HexCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HexCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(lat: f64, lon: f64, res: u8) -> HexCell {
        HexCell::from_coords(lat, lon, res).unwrap()
    }

    fn same_or_adjacent(a: HexCell, b: HexCell) -> bool {
        a == b || a.neighbors().contains(&b)
    }

    #[test]
    fn test_deterministic() {
        let a = cell(37.7749, -122.4194, 7);
        assert_eq!(a, cell(37.7749, -122.4194, 7));
        assert_eq!(a.resolution(), 7);
        assert_eq!(a.to_string().len(), 15);
    }

    #[test]
    fn test_center_maps_back_to_cell() {
        for res in [0u8, 3, 7, 12] {
            let c = cell(-33.8688, 151.2093, res);
            let (lat, lon) = c.center();
            assert_eq!(cell(lat, lon, res), c);
        }
    }

    #[test]
    fn test_nearby_points_share_or_touch() {
        let base = cell(37.7749, -122.4194, 7);
        let near = cell(37.7752, -122.4190, 7);
        assert!(same_or_adjacent(base, near));
        assert!(base.distance(&near).unwrap() <= 1);
    }

    #[test]
    fn test_antimeridian_neighbours() {
        // about 22 m apart on either side of 180°
        let east = cell(0.0, 179.9999, 7);
        let west = cell(0.0, -179.9999, 7);
        assert!(same_or_adjacent(east, west));

        let fiji_a = cell(-16.5, 179.9999, 7);
        let fiji_b = cell(-16.5, -179.9999, 7);
        assert!(same_or_adjacent(fiji_a, fiji_b));
    }

    #[test]
    fn test_polar_neighbours() {
        let a = cell(89.9999, 0.0, 7);
        let b = cell(89.9999, 180.0, 7);
        assert!(same_or_adjacent(a, b));
    }

    #[test]
    fn test_finer_resolution_has_smaller_cells() {
        assert!(same_or_adjacent(cell(10.0, 10.0, 2), cell(10.05, 10.05, 2)));
        let fine = cell(10.0, 10.0, 10);
        assert!(fine.distance(&cell(10.05, 10.05, 10)).unwrap() > 1);
    }

    #[test]
    fn test_resolution_clamped() {
        assert_eq!(cell(1.0, 1.0, 200).resolution(), MAX_RESOLUTION);
    }

    #[test]
    fn test_non_finite_coordinates() {
        assert!(HexCell::from_coords(f64::INFINITY, 0.0, 7).is_none());
    }

    #[test]
    fn test_distance_across_resolutions() {
        let a = cell(1.0, 1.0, 3);
        assert!(a.distance(&cell(1.0, 1.0, 4)).is_none());
        assert_eq!(a.distance(&a), Some(0));
    }
}
