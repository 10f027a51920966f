//! Gridded ocean map
//!
//! Discretizes a lon/lat rectangle into width x height cells and tracks which
//! cells are land. The simulation core only reads this: grid dimensions, the
//! coordinate-to-cell mapping, and the enumerable set of water cells.

use crate::core::config::MapConfig;
use crate::core::error::Result;
use crate::core::types::LonLat;

/// Map extent with a land mask, row-major cell addressing
#[derive(Debug, Clone)]
pub struct OceanMap {
    width: usize,
    height: usize,
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
    /// true = land, cannot hold biology
    land: Vec<bool>,
}

impl OceanMap {
    /// All-water map over the given extent
    pub fn new(
        width: usize,
        height: usize,
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
    ) -> Self {
        Self {
            width,
            height,
            lon_min,
            lon_max,
            lat_min,
            lat_max,
            land: vec![false; width * height],
        }
    }

    pub fn from_config(config: &MapConfig) -> Result<Self> {
        let mut map = Self::new(
            config.width,
            config.height,
            config.lon_min,
            config.lon_max,
            config.lat_min,
            config.lat_max,
        );
        for cell in &config.land_cells {
            map.set_land(cell[0], cell[1]);
        }
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_land(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.land[y * self.width + x] = true;
        }
    }

    #[inline]
    pub fn is_water(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && !self.land[y * self.width + x]
    }

    /// Whether a coordinate falls inside the map extent
    pub fn contains(&self, pos: LonLat) -> bool {
        pos.lon >= self.lon_min
            && pos.lon <= self.lon_max
            && pos.lat >= self.lat_min
            && pos.lat <= self.lat_max
    }

    /// Convert a geographic coordinate to cell coordinates
    ///
    /// Returns `None` for coordinates outside the extent. Points exactly on
    /// the max edge map to the last cell.
    #[inline]
    pub fn coord_to_cell(&self, pos: LonLat) -> Option<(usize, usize)> {
        if !self.contains(pos) {
            return None;
        }
        let cell_w = (self.lon_max - self.lon_min) / self.width as f64;
        let cell_h = (self.lat_max - self.lat_min) / self.height as f64;
        let x = (((pos.lon - self.lon_min) / cell_w).floor() as usize).min(self.width - 1);
        let y = (((pos.lat - self.lat_min) / cell_h).floor() as usize).min(self.height - 1);
        Some((x, y))
    }

    /// Center of a cell in geographic coordinates
    pub fn cell_center(&self, x: usize, y: usize) -> LonLat {
        let cell_w = (self.lon_max - self.lon_min) / self.width as f64;
        let cell_h = (self.lat_max - self.lat_min) / self.height as f64;
        LonLat::new(
            self.lon_min + (x as f64 + 0.5) * cell_w,
            self.lat_min + (y as f64 + 0.5) * cell_h,
        )
    }

    /// Enumerate all cells that can hold biology, row-major order
    pub fn water_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.is_water(x, y))
    }

    /// Stable identity string for cache keying
    ///
    /// Covers the land mask as well as the extent: two maps with the same
    /// bounds but different land cells must not share cached grid sets, since
    /// on-water validation depends on the mask.
    pub fn extent_key(&self) -> String {
        let land: Vec<String> = self
            .land
            .iter()
            .enumerate()
            .filter(|(_, &masked)| masked)
            .map(|(i, _)| i.to_string())
            .collect();
        format!(
            "{}x{}:{}:{}:{}:{}:[{}]",
            self.width,
            self.height,
            self.lon_min,
            self.lon_max,
            self.lat_min,
            self.lat_max,
            land.join(",")
        )
    }
}
