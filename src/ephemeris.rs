//! Position of the sun.
//!
//! Any source of sun positions can be plugged in through the [`Ephemeris`]
//! trait. [`Spa`] wraps the NREL Solar Position Algorithm.

use chrono::{DateTime, Utc};
use log::debug;
use ndarray::Array1;
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};

use crate::error::SnowOpticsError;

/// Position of the sun seen from the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunAngles {
    /// Solar zenith angle in radians
    pub zenith: f64,
    /// Solar azimuth angle in radians, clockwise from north
    pub azimuth: f64,
}

/// Something that knows where the sun is.
pub trait Ephemeris {
    /// Sun position at `time` for an observer at `longitude`, `latitude`
    /// (degrees, east and north positive).
    fn sun_angles(
        &self,
        longitude: f64,
        latitude: f64,
        time: DateTime<Utc>,
    ) -> Result<SunAngles, SnowOpticsError>;
}

/// Sun position from the NREL Solar Position Algorithm, with standard
/// atmospheric refraction and an estimated ΔT.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spa {
    /// Observer elevation above sea level in m
    pub elevation: f64,
}

impl Spa {
    /// SPA for an observer at `elevation` m.
    pub fn at_elevation(elevation: f64) -> Self {
        Self { elevation }
    }
}

impl Ephemeris for Spa {
    fn sun_angles(
        &self,
        longitude: f64,
        latitude: f64,
        time: DateTime<Utc>,
    ) -> Result<SunAngles, SnowOpticsError> {
        let delta_t = DeltaT::estimate_from_date_like(time)
            .map_err(|e| SnowOpticsError::SunPosition(e.to_string()))?;
        let position = spa::solar_position(
            time,
            latitude,
            longitude,
            self.elevation,
            delta_t,
            Some(RefractionCorrection::standard()),
        )
        .map_err(|e| SnowOpticsError::SunPosition(e.to_string()))?;

        Ok(SunAngles {
            zenith: position.zenith_angle().to_radians(),
            azimuth: position.azimuth().to_radians(),
        })
    }
}

/// Solar zenith and azimuth angles (radians) at each of `times`.
///
/// Fails with [`SnowOpticsError::MissingEphemeris`] when no ephemeris is
/// given.
pub fn compute_sun_position(
    ephemeris: Option<&dyn Ephemeris>,
    longitude: f64,
    latitude: f64,
    times: &[DateTime<Utc>],
) -> Result<(Array1<f64>, Array1<f64>), SnowOpticsError> {
    let ephemeris = ephemeris.ok_or(SnowOpticsError::MissingEphemeris)?;
    debug!(
        "computing {} sun positions at ({longitude}, {latitude})",
        times.len()
    );

    let mut sza = Array1::zeros(times.len());
    let mut saa = Array1::zeros(times.len());
    for (i, &time) in times.iter().enumerate() {
        let angles = ephemeris.sun_angles(longitude, latitude, time)?;
        sza[i] = angles.zenith;
        saa[i] = angles.azimuth;
    }
    Ok((sza, saa))
}
