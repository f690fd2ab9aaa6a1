//! Polyline representation for route geometries.
//!
//! Points are held decoded. The compact encoded-polyline format (precision
//! 1e5) is only handled at the boundary, when a directions response arrives.

use serde::{Deserialize, Serialize};

const PRECISION: f64 = 1e5;

/// A polyline representing a route geometry as decoded coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Creates a new Polyline from decoded `(lat, lng)` points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Decodes an encoded polyline string.
    ///
    /// Returns `None` if the string is truncated or contains bytes outside
    /// the encoding alphabet.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = encoded.as_bytes();
        let mut points = Vec::new();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;

        while index < bytes.len() {
            lat += next_value(bytes, &mut index)?;
            lng += next_value(bytes, &mut index)?;
            points.push((lat as f64 / PRECISION, lng as f64 / PRECISION));
        }

        Some(Self { points })
    }

    /// Encodes the points back into the compact string form.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let mut prev = (0i64, 0i64);
        for &(lat, lng) in &self.points {
            let lat = (lat * PRECISION).round() as i64;
            let lng = (lng * PRECISION).round() as i64;
            push_value(&mut out, lat - prev.0);
            push_value(&mut out, lng - prev.1);
            prev = (lat, lng);
        }
        out
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding region of all points, if any.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.points.iter().copied())
    }
}

fn next_value(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*index)?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return None;
        }
        *index += 1;
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}

fn push_value(out: &mut String, value: i64) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

/// Axis-aligned bounding region used for map framing and geocoder bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(southwest: (f64, f64), northeast: (f64, f64)) -> Self {
        Self {
            south: southwest.0,
            west: southwest.1,
            north: northeast.0,
            east: northeast.1,
        }
    }

    /// Smallest region containing every point. `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, (lat, lng): (f64, f64)) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lng);
        self.east = self.east.max(lng);
    }

    pub fn contains(&self, (lat, lng): (f64, f64)) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}
