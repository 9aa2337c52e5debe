//! Spectral albedo of flat snow.
//!
//! Two asymptotic theories share the single-scattering core: Kokhanovsky and
//! Zege 2004 (KZ04, the "ART" theory) and Malinka 2016 (M16). Each offers a
//! direct albedo (collimated incidence at `sza`), a diffuse albedo, and the
//! total albedo mixing both with the diffuse fraction `r_difftot` of the
//! incoming radiation. Angles are in radians, wavelengths in meters.

mod slope;

#[cfg(test)]
mod tests;

pub use slope::{albedo_p20_slope, SlopeModel, SlopeOptions};

use ndarray::{Array1, ArrayView1, Zip};

use crate::{
    constants::OpticalConstants,
    error::SnowOpticsError,
    geometry::{local_sza, Slope},
    optics::{compute_alpha, compute_co_single_scattering_albedo, compute_malinka_y, Snow},
};

/// Escape function of Malinka 2016 (K₀ in the Kokhanovsky formalism).
pub fn g_function(theta: f64) -> f64 {
    3.0 / 7.0 * (1.0 + 2.0 * theta.cos())
}

/// Total albedo, KZ04.
pub fn albedo_kz04<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    snow: &Snow,
    r_difftot: f64,
) -> Result<Array1<f64>, SnowOpticsError> {
    let direct = albedo_direct_kz04(constants, wavelengths, sza, snow)?;
    let diffuse = albedo_diffuse_kz04(constants, wavelengths, snow)?;
    Ok(mix(&direct, &diffuse, r_difftot))
}

/// Diffuse albedo, KZ04, with impurities after Kokhanovsky et al. 2013.
pub fn albedo_diffuse_kz04<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let alpha = compute_alpha(constants, wavelengths, snow)?;
    Ok(alpha.mapv_into(|a| (-a.sqrt()).exp()))
}

/// Direct albedo, KZ04, with impurities after Kokhanovsky et al. 2013.
///
/// Fails when `cos(sza)` is negative, which usually means the angle was
/// given in degrees.
pub fn albedo_direct_kz04<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let cos_sza = sza.cos();
    if !(cos_sza >= 0.0) {
        return Err(SnowOpticsError::NegativeCosine(cos_sza));
    }
    let alpha = compute_alpha(constants, wavelengths, snow)?;
    Ok(alpha.mapv_into(|a| (-a.sqrt() * 3.0 / 7.0 * (1.0 + 2.0 * cos_sza)).exp()))
}

/// Direct albedo, KZ04, at the effective solar zenith angle of a slope.
pub fn albedo_direct_kz04_slope<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    saa: f64,
    snow: &Snow,
    slope: Slope,
) -> Result<Array1<f64>, SnowOpticsError> {
    albedo_direct_kz04(constants, wavelengths, local_sza(sza, saa, slope), snow)
}

/// Asymptotic flux extinction coefficient (AFEC) in 1/m, KZ04.
///
/// `rho` is the snow density in kg/m³.
pub fn extinction_kz04<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    rho: f64,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let cossalb = compute_co_single_scattering_albedo(constants, wavelengths, snow)?;
    let sigext = rho * snow.ssa / 2.0;
    Ok(cossalb.mapv_into(|c| sigext * (3.0 * c * (1.0 - snow.g)).sqrt()))
}

/// Total albedo, M16.
pub fn albedo_m16<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    snow: &Snow,
    r_difftot: f64,
) -> Result<Array1<f64>, SnowOpticsError> {
    let direct = albedo_direct_m16(constants, wavelengths, sza, snow)?;
    let diffuse = albedo_diffuse_m16(constants, wavelengths, snow)?;
    Ok(mix(&direct, &diffuse, r_difftot))
}

/// Direct albedo, M16.
pub fn albedo_direct_m16<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let y = compute_malinka_y(constants, wavelengths, snow)?;
    let escape = g_function(sza);
    Ok(y.mapv_into(|y| (-y * escape).exp()))
}

/// Diffuse albedo, M16.
pub fn albedo_diffuse_m16<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let y = compute_malinka_y(constants, wavelengths, snow)?;
    Ok(y.mapv_into(|y| (-y).exp()))
}

/// `(1 - r) · direct + r · diffuse`
fn mix(direct: &Array1<f64>, diffuse: &Array1<f64>, r_difftot: f64) -> Array1<f64> {
    Zip::from(direct)
        .and(diffuse)
        .map_collect(|&dir, &diff| (1.0 - r_difftot) * dir + r_difftot * diff)
}
