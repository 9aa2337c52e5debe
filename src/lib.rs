//! Optical properties of snow
//!
//! Spectral albedo and bidirectional reflectance of snow from asymptotic
//! radiative transfer theories (Kokhanovsky and Zege 2004, Malinka 2016,
//! Kokhanovsky and Breon 2012), the albedo of snow on sloped terrain
//! (Picard et al. 2020), and the correction of measured albedo for the slope
//! of the surface.
//!
//! Refractive indices of ice and impurities are not bundled: they come from
//! an [`OpticalConstants`] implementation given by the caller. Likewise the
//! sun position comes from an [`Ephemeris`].
//!
//! Angles are in radians and wavelengths in meters unless stated otherwise.
//!
//! With the `python` feature, a subset of the functions is exposed as a
//! Python extension module.

pub mod albedo;
pub mod brf;
pub mod constants;
pub mod correction;
pub mod ephemeris;
pub mod error;
pub mod geometry;
pub mod optics;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod test_utils;

pub use albedo::{
    albedo_diffuse_kz04, albedo_diffuse_m16, albedo_direct_kz04, albedo_direct_kz04_slope,
    albedo_direct_m16, albedo_kz04, albedo_m16, albedo_p20_slope, extinction_kz04, g_function,
    SlopeModel, SlopeOptions,
};
pub use brf::{
    brf0_kb12, brf_kb12, brf_kb12_slope, brf_m16, brf_m16_slope, AzimuthConvention,
    Kb12Parameters, ViewGeometry,
};
pub use constants::{DustFormulation, IceIndex, OpticalConstants};
pub use correction::{
    albedo_correction_with_slope, albedo_correction_with_slope2,
    albedo_correction_without_slope, albedo_timeseries_correction, timeseries_model,
    TimeseriesOptions, TimeseriesRetrieval,
};
pub use ephemeris::{compute_sun_position, Ephemeris, Spa, SunAngles};
pub use error::SnowOpticsError;
pub use geometry::{local_sza, local_viewing_angle, LocalGeometry, Slope};
pub use optics::{Impurities, Impurity, Snow, Species};
