//! Illumination and viewing geometry over a tilted facet.
//!
//! All angles are in radians. Zenith angles are measured from the vertical
//! of the horizontal plane, azimuths from north.

use std::f64::consts::FRAC_PI_2;

/// Below this cosine the local incidence is considered grazing.
const GRAZING_COSINE: f64 = 1e-6;

/// Inclination and orientation of a planar slope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Slope {
    /// Slope inclination, from 0 (flat) to π/2.
    pub inclination: f64,
    /// Azimuth the slope faces.
    pub aspect: f64,
}

impl Slope {
    /// A slope with the given inclination and aspect.
    pub fn new(inclination: f64, aspect: f64) -> Self {
        Self {
            inclination,
            aspect,
        }
    }

    /// Horizontal terrain.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Cosine of the angle between the slope normal and the direction
    /// `(zenith, azimuth)`.
    fn cos_local_zenith(&self, zenith: f64, azimuth: f64) -> f64 {
        zenith.cos() * self.inclination.cos()
            + zenith.sin() * self.inclination.sin() * (azimuth - self.aspect).cos()
    }
}

/// Geometry expressed in the frame of a slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGeometry {
    /// Local incidence zenith angle, NaN for grazing incidence.
    pub incidence_zenith: f64,
    /// Local viewing zenith angle, NaN when the observer is behind the slope.
    pub viewing_zenith: f64,
    /// Local relative azimuth between incidence and viewing.
    pub relative_azimuth: f64,
}

/// Effective solar zenith angle on a slope.
///
/// The cosine is clipped to [-1, 1] so that rounding around the normal does
/// not produce a NaN.
pub fn local_sza(sza: f64, saa: f64, slope: Slope) -> f64 {
    slope.cos_local_zenith(sza, saa).clamp(-1.0, 1.0).acos()
}

/// Local incidence and viewing zenith angles and relative azimuth on a
/// slope, following Dumont et al. 2011.
///
/// `theta_i`/`phi_i` are the incidence zenith and azimuth, `theta_v`/`phi_v`
/// those of the observer. Undefined local angles are NaN. When one of the
/// local zenith angles is at the slope normal the relative azimuth is 0.
pub fn local_viewing_angle(
    theta_i: f64,
    phi_i: f64,
    theta_v: f64,
    phi_v: f64,
    slope: Slope,
) -> LocalGeometry {
    let mut mu_i = slope.cos_local_zenith(theta_i, phi_i);
    if mu_i < GRAZING_COSINE {
        mu_i = f64::NAN;
    }
    let mu_v = slope.cos_local_zenith(theta_v, phi_v);

    let theta_i_eff = mu_i.acos();
    let mut theta_v_eff = mu_v.acos();
    // Observer behind the slope
    if theta_v_eff > FRAC_PI_2 {
        theta_v_eff = f64::NAN;
    }

    let numerator = theta_v.cos() * theta_i.cos()
        + theta_v.sin() * theta_i.sin() * (phi_v - phi_i).cos()
        - mu_i * mu_v;
    let denominator = theta_i_eff.sin() * theta_v_eff.sin();

    let relative_azimuth = if denominator == 0.0 {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0).acos()
    };

    LocalGeometry {
        incidence_zenith: theta_i_eff,
        viewing_zenith: theta_v_eff,
        relative_azimuth,
    }
}
