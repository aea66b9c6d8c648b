//! Visual encodings for aggregated locations.
//!
//! Size follows a square-root scale of the cumulative total so the big
//! centres do not swamp the map. Brightness follows the yearly share,
//! with an opacity floor that keeps quiet places visible.

use crate::config::DisplayConfig;
use crate::models::{AggregatedLocation, MapPoint, Rgba};

/// Base violet used for every point.
const BASE_RGB: [u8; 3] = [139, 92, 246];

const ACTIVE_OUTLINE: Rgba = [255, 255, 255, 150];
const IDLE_OUTLINE: Rgba = [255, 255, 255, 30];

/// Parameters of the size and brightness scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    /// Metres per sqrt(edition).
    pub radius_scale: f64,
    pub min_opacity: u8,
    pub max_opacity: u8,
    /// Opacity added per percentage point of yearly share.
    pub opacity_gain: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            radius_scale: 600.0,
            min_opacity: 40,
            max_opacity: 255,
            opacity_gain: 8.0,
        }
    }
}

impl From<&DisplayConfig> for Scale {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            radius_scale: config.radius_scale,
            min_opacity: config.min_opacity,
            max_opacity: config.max_opacity,
            opacity_gain: config.opacity_gain,
        }
    }
}

impl Scale {
    /// Point radius for a cumulative total.
    pub fn radius(&self, cumulative_total: u64) -> f64 {
        (cumulative_total as f64).sqrt() * self.radius_scale
    }

    /// Opacity for a yearly share, never below the floor nor above the ceiling.
    pub fn opacity(&self, yearly_percent: f64) -> u8 {
        let floor = f64::from(self.min_opacity);
        let ceiling = f64::from(self.max_opacity.max(self.min_opacity));
        let raw = floor + yearly_percent.max(0.0) * self.opacity_gain;
        raw.min(ceiling).round() as u8
    }

    /// Fill color for a yearly share.
    pub fn fill_color(&self, yearly_percent: f64) -> Rgba {
        let [r, g, b] = BASE_RGB;
        [r, g, b, self.opacity(yearly_percent)]
    }

    /// Outline color: brighter for places active this year.
    pub fn line_color(&self, active: bool) -> Rgba {
        if active {
            ACTIVE_OUTLINE
        } else {
            IDLE_OUTLINE
        }
    }

    /// Map one aggregated location to a render-ready point.
    pub fn point(&self, location: &AggregatedLocation) -> MapPoint {
        MapPoint {
            place: location.place.clone(),
            position: [location.lng, location.lat],
            radius: self.radius(location.cumulative_total),
            fill_color: self.fill_color(location.yearly_percent),
            line_color: self.line_color(location.is_active()),
        }
    }

    /// Map a whole aggregation result.
    pub fn points(&self, locations: &[AggregatedLocation]) -> Vec<MapPoint> {
        locations.iter().map(|l| self.point(l)).collect()
    }
}
