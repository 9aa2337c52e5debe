//! Bidirectional reflectance factor of snow.
//!
//! The zero-order reflectance `r0` of a semi-infinite non-absorbing medium
//! comes from Kokhanovsky and Breon 2012 (KB12). Absorption is added either
//! with the KB12 attenuation or with the y parameter of Malinka 2016 (M16).
//! The `_slope` variants first move the geometry into the frame of a tilted
//! facet, and undefined local angles propagate as NaN.

use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1, Zip};
use strum_macros::EnumString;

use crate::{
    albedo::g_function,
    constants::{IceIndex, OpticalConstants},
    error::SnowOpticsError,
    geometry::{local_viewing_angle, Slope},
    optics::{compute_malinka_y, Snow, RHO_ICE},
};

/// Convention of the relative azimuth angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
#[strum(
    serialize_all = "lowercase",
    parse_err_ty = SnowOpticsError,
    parse_err_fn = invalid_azimuth_convention
)]
pub enum AzimuthConvention {
    /// Forward scattering at 180°
    #[default]
    Angular,
    /// Forward scattering at 0°
    Vectorial,
}

fn invalid_azimuth_convention(name: &str) -> SnowOpticsError {
    SnowOpticsError::InvalidAzimuthConvention(name.to_string())
}

/// Illumination and viewing directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    /// Illumination zenith angle
    pub theta_i: f64,
    /// Illumination azimuth angle
    pub phi_i: f64,
    /// Viewing zenith angle
    pub theta_v: f64,
    /// Viewing azimuth angle
    pub phi_v: f64,
}

/// Absorption parameters of the KB12 BRF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kb12Parameters {
    /// Ratio of the absorption path length to the optical grain diameter,
    /// L = 13 d in KB12.
    pub x: f64,
    /// Term proportional to the mass concentration of pollutants, added to
    /// the imaginary index of ice.
    pub m: f64,
}

impl Default for Kb12Parameters {
    fn default() -> Self {
        Self { x: 13.0, m: 0.0 }
    }
}

/// Zero-order BRF `r0` from KB12 (doi:10.1109/LGRS.2012.2185775).
///
/// `phi` is the relative azimuth (illumination minus viewing) in the given
/// convention.
pub fn brf0_kb12(theta_i: f64, theta_v: f64, phi: f64, convention: AzimuthConvention) -> f64 {
    let phi = match convention {
        AzimuthConvention::Angular => PI - phi,
        AzimuthConvention::Vectorial => phi,
    };
    let (cos_i, cos_v) = (theta_i.cos(), theta_v.cos());

    // Scattering angle in degrees
    let theta = (-cos_i * cos_v + theta_i.sin() * theta_v.sin() * phi.cos())
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    let phase = 11.1 * (-0.087 * theta).exp() + 1.1 * (-0.014 * theta).exp();

    let rr = 1.247 + 1.186 * (cos_i + cos_v) + 5.157 * (cos_i * cos_v) + phase;
    rr / (4.0 * (cos_i + cos_v))
}

/// Snow BRF from KB12.
///
/// The absorption term is `sqrt(4π (k + M) / λ · x · 6 / (ρ_ice SSA))`, with
/// `k` the imaginary index of ice.
#[allow(clippy::too_many_arguments)]
pub fn brf_kb12<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    theta_i: f64,
    theta_v: f64,
    phi: f64,
    ssa: f64,
    ice_index: &IceIndex,
    parameters: Kb12Parameters,
    convention: AzimuthConvention,
) -> Result<Array1<f64>, SnowOpticsError> {
    let r = brf0_kb12(theta_i, theta_v, phi, convention);
    let escape = g_function(theta_i) * g_function(theta_v);

    let ni = ice_index.imaginary(constants, wavelengths)?;

    Ok(Zip::from(&wavelengths).and(&ni).map_collect(|&wl, &ni| {
        let gamma = 4.0 * PI * (ni + parameters.m) / wl;
        // Alpha = sqrt(gamma L) with L = x d and d = 6 / (rho_ice SSA)
        let alpha = (gamma * parameters.x * 6.0 / (RHO_ICE * ssa)).sqrt();
        r * (-alpha * escape / r).exp()
    }))
}

/// Snow BRF from M16 with `r0` from KB12.
pub fn brf_m16<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    theta_i: f64,
    theta_v: f64,
    phi: f64,
    snow: &Snow,
    convention: AzimuthConvention,
) -> Result<Array1<f64>, SnowOpticsError> {
    let r0 = brf0_kb12(theta_i, theta_v, phi, convention);
    let escape = g_function(theta_i) * g_function(theta_v);
    let y = compute_malinka_y(constants, wavelengths, snow)?;
    Ok(y.mapv_into(|y| r0 * (-y * escape / r0).exp()))
}

/// Snow BRF from KB12 on a tilted facet.
#[allow(clippy::too_many_arguments)]
pub fn brf_kb12_slope<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    geometry: ViewGeometry,
    slope: Slope,
    ssa: f64,
    ice_index: &IceIndex,
    parameters: Kb12Parameters,
    convention: AzimuthConvention,
) -> Result<Array1<f64>, SnowOpticsError> {
    let local = local_viewing_angle(
        geometry.theta_i,
        geometry.phi_i,
        geometry.theta_v,
        geometry.phi_v,
        slope,
    );
    brf_kb12(
        constants,
        wavelengths,
        local.incidence_zenith,
        local.viewing_zenith,
        local.relative_azimuth,
        ssa,
        ice_index,
        parameters,
        convention,
    )
}

/// Snow BRF from M16 on a tilted facet.
pub fn brf_m16_slope<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    geometry: ViewGeometry,
    slope: Slope,
    snow: &Snow,
    convention: AzimuthConvention,
) -> Result<Array1<f64>, SnowOpticsError> {
    let local = local_viewing_angle(
        geometry.theta_i,
        geometry.phi_i,
        geometry.theta_v,
        geometry.phi_v,
        slope,
    );
    brf_m16(
        constants,
        wavelengths,
        local.incidence_zenith,
        local.viewing_zenith,
        local.relative_azimuth,
        snow,
        convention,
    )
}
