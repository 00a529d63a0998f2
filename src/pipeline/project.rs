use crate::types::viz::{ProjectedPoint, Rect};

/// Fraction of each axis' range added as margin on both sides.
pub const DEFAULT_PADDING: f64 = 0.1;

/// A fitted lat/lng to pixel transform. The same transform can be applied
/// to points that were not part of the fit, e.g. lap markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub min_lng: f64,
    pub max_lat: f64,
    pub lng_range: f64,
    pub lat_range: f64,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Projection {
    /// Fits the bounding box of `points`, expanded by `padding`, into `rect`
    /// with a single scale factor. Returns `None` for an empty input.
    pub fn fit(points: &[(f64, f64)], rect: Rect, padding: f64) -> Option<Self> {
        let (first_lat, first_lng) = *points.first()?;

        let mut min_lat = first_lat;
        let mut max_lat = first_lat;
        let mut min_lng = first_lng;
        let mut max_lng = first_lng;
        for &(lat, lng) in &points[1..] {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            min_lng = min_lng.min(lng);
            max_lng = max_lng.max(lng);
        }

        let (min_lat, max_lat) = widen_degenerate(min_lat, max_lat);
        let (min_lng, max_lng) = widen_degenerate(min_lng, max_lng);

        let lat_padding = (max_lat - min_lat) * padding;
        let lng_padding = (max_lng - min_lng) * padding;
        let padded_lat_range = (max_lat - min_lat) + 2.0 * lat_padding;
        let padded_lng_range = (max_lng - min_lng) + 2.0 * lng_padding;

        let scale_x = rect.width / padded_lng_range;
        let scale_y = rect.height / padded_lat_range;
        let scale = scale_x.min(scale_y);

        let scaled_width = padded_lng_range * scale;
        let scaled_height = padded_lat_range * scale;

        Some(Self {
            min_lng: min_lng - lng_padding,
            max_lat: max_lat + lat_padding,
            lng_range: padded_lng_range,
            lat_range: padded_lat_range,
            scale,
            offset_x: rect.x + (rect.width - scaled_width) / 2.0,
            offset_y: rect.y + (rect.height - scaled_height) / 2.0,
        })
    }

    pub fn scaled_width(&self) -> f64 {
        self.lng_range * self.scale
    }

    pub fn scaled_height(&self) -> f64 {
        self.lat_range * self.scale
    }

    pub fn apply(&self, lat: f64, lng: f64) -> ProjectedPoint {
        // Pixel y grows downwards while latitude grows northwards.
        ProjectedPoint {
            x: self.offset_x + (lng - self.min_lng) / self.lng_range * self.scaled_width(),
            y: self.offset_y + (self.max_lat - lat) / self.lat_range * self.scaled_height(),
        }
    }
}

pub fn project(points: &[(f64, f64)], rect: Rect, padding: f64) -> Vec<ProjectedPoint> {
    let Some(projection) = Projection::fit(points, rect, padding) else {
        return Vec::new();
    };

    points
        .iter()
        .map(|&(lat, lng)| projection.apply(lat, lng))
        .collect()
}

pub fn project_default(points: &[(f64, f64)], rect: Rect) -> Vec<ProjectedPoint> {
    project(points, rect, DEFAULT_PADDING)
}

fn widen_degenerate(min: f64, max: f64) -> (f64, f64) {
    if max - min > 0.0 {
        (min, max)
    } else {
        (min - 0.5, min + 0.5)
    }
}
