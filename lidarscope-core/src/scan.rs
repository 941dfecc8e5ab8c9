//! Conversion of decoded sensor channel records into points
//!
//! A record carries one scan line of a single sensor channel: a list of
//! ranges spread evenly across the horizontal field of view at the channel's
//! fixed elevation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::point::Point3D;

/// Elevation information carried by a record.
///
/// A single number is the canonical form. Older sensors send one value per
/// channel; those are reduced to the entry for the record's own channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerticalFov {
    Single(f32),
    PerChannel(Vec<f32>),
}

impl VerticalFov {
    /// Elevation in degrees for `channel`.
    ///
    /// For the per-channel form this is `values[channel]`, falling back to
    /// the first entry when the channel is out of range.
    pub fn elevation_for(&self, channel: u32) -> Option<f32> {
        match self {
            VerticalFov::Single(angle) => Some(*angle),
            VerticalFov::PerChannel(values) => values
                .get(channel as usize)
                .or_else(|| values.first())
                .copied(),
        }
    }
}

impl Default for VerticalFov {
    fn default() -> Self {
        VerticalFov::Single(0.0)
    }
}

/// One channel's worth of ranges from a sensor frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel: u32,
    /// Horizontal field of view, degrees
    pub hfov: f32,
    #[serde(default)]
    pub vfov: VerticalFov,
    /// Ranges in metres, in azimuth order
    pub distances: Vec<f32>,
    /// Angular step between consecutive returns, degrees
    #[serde(default)]
    pub hresolution: Option<f32>,
    /// Maximum range of the sensor, metres
    #[serde(default)]
    pub max: Option<f32>,
    /// Explicit per-return azimuths, degrees
    #[serde(default)]
    pub azimuth: Option<Vec<f32>>,
    /// Per-return detection strength
    #[serde(default)]
    pub detection_data: Option<Vec<f32>>,
}

impl ChannelRecord {
    pub fn new(channel: u32, hfov: f32, elevation: f32, distances: Vec<f32>) -> Self {
        Self {
            channel,
            hfov,
            vfov: VerticalFov::Single(elevation),
            distances,
            hresolution: None,
            max: None,
            azimuth: None,
            detection_data: None,
        }
    }

    pub fn with_hresolution(mut self, hresolution: f32) -> Self {
        self.hresolution = Some(hresolution);
        self
    }

    pub fn with_max_range(mut self, max: f32) -> Self {
        self.max = Some(max);
        self
    }

    /// Angular step between returns: the explicit `hresolution` when
    /// present, otherwise the field of view spread so the first and last
    /// returns sit on its edges.
    pub fn angular_step(&self) -> Result<f32> {
        match self.hresolution {
            Some(step) if step.is_finite() => Ok(step),
            Some(step) => Err(Error::InvalidRecord(format!("hresolution must be finite, got {step}"))),
            None if self.distances.len() > 1 => Ok(self.hfov / (self.distances.len() - 1) as f32),
            None => Ok(0.0),
        }
    }

    /// Azimuth of return `index`, degrees
    pub fn azimuth_of(&self, index: usize, step: f32) -> Option<f32> {
        match &self.azimuth {
            Some(azimuths) => azimuths.get(index).copied(),
            None => Some(-self.hfov / 2.0 + index as f32 * step),
        }
    }

    /// Convert the record into world-space points.
    ///
    /// Returns with no range (zero, negative or non-finite distances) and
    /// returns beyond `max` are dropped. A return whose entry is missing from
    /// one of the parallel per-return arrays is skipped as malformed.
    pub fn to_points(&self) -> Result<Vec<Point3D>> {
        if !self.hfov.is_finite() {
            return Err(Error::InvalidRecord(format!("hfov must be finite, got {}", self.hfov)));
        }
        if self.distances.is_empty() {
            return Ok(Vec::new());
        }

        let step = self.angular_step()?;
        let elevation = self
            .vfov
            .elevation_for(self.channel)
            .filter(|angle| angle.is_finite())
            .ok_or_else(|| Error::InvalidRecord(format!("channel {} has no usable vfov", self.channel)))?;

        let mut points = Vec::with_capacity(self.distances.len());
        let mut malformed = 0usize;

        for (index, &distance) in self.distances.iter().enumerate() {
            let Some(azimuth) = self.azimuth_of(index, step) else {
                malformed += 1;
                continue;
            };
            let intensity = match &self.detection_data {
                Some(detections) => match detections.get(index) {
                    Some(&value) => Some(value.clamp(0.0, 255.0) as u8),
                    None => {
                        malformed += 1;
                        continue;
                    }
                },
                None => None,
            };

            if !distance.is_finite() || distance <= 0.0 {
                continue;
            }
            if self.max.is_some_and(|max| distance > max) {
                continue;
            }

            let mut point = Point3D::from_spherical(distance, azimuth, elevation, self.channel, index as u32);
            point.intensity = intensity;
            points.push(point);
        }

        if malformed > 0 {
            log::debug!("channel {}: skipped {malformed} malformed returns", self.channel);
        }

        Ok(points)
    }
}

/// Convert a whole frame of records, skipping records that cannot be converted
pub fn points_from_records(records: &[ChannelRecord]) -> Vec<Point3D> {
    let mut points = Vec::new();
    for record in records {
        match record.to_points() {
            Ok(converted) => points.extend(converted),
            Err(e) => log::warn!("dropping record: {e}"),
        }
    }
    points
}
