//! Single-scattering quantities.

use std::f64::consts::PI;

use log::debug;
use ndarray::{Array1, ArrayView1, Zip};

use super::{Snow, RHO_ICE};
use crate::{
    constants::{ensure_same_len, OpticalConstants},
    error::SnowOpticsError,
};

/// Compute the co-single-scattering albedo on the wavelength grid.
///
/// The ice contribution is `2 / (SSA ρ_ice) · B · 4π k / λ`, to which every
/// impurity adds `2 / SSA · c · MAC`.
pub fn compute_co_single_scattering_albedo<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let ni = snow.ice_index.imaginary(constants, wavelengths)?;

    // Ice absorption
    let mut cossalb = Zip::from(&wavelengths)
        .and(&ni)
        .map_collect(|&wl, &ni| 2.0 / (snow.ssa * RHO_ICE) * snow.b * (4.0 * PI * ni / wl));

    for impurity in snow.impurities.iter() {
        debug!(
            "adding {} at {:e} kg/kg",
            impurity.species, impurity.concentration
        );
        let mac = impurity.species.mass_absorption_cross_section(
            constants,
            wavelengths,
            impurity.density,
        )?;
        ensure_same_len("mass absorption cross-section", mac.len(), cossalb.len())?;
        cossalb.scaled_add(2.0 / snow.ssa * impurity.concentration, &mac);
    }

    Ok(cossalb)
}

/// Compute alpha, `16/3 · cossalb / (1 - g)`, from Kokhanovsky et al. 2013.
pub fn compute_alpha<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let cossalb = compute_co_single_scattering_albedo(constants, wavelengths, snow)?;
    Ok(cossalb.mapv_into(|c| 16.0 / 3.0 * c / (1.0 - snow.g)))
}

/// Compute y of Malinka 2016, `4 sqrt((1 - w0) / (3 (1 - w0 g)))` with `w0`
/// the single-scattering albedo.
pub fn compute_malinka_y<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    snow: &Snow,
) -> Result<Array1<f64>, SnowOpticsError> {
    let cossalb = compute_co_single_scattering_albedo(constants, wavelengths, snow)?;
    Ok(cossalb.mapv_into(|c| {
        let w0 = 1.0 - c;
        4.0 * ((1.0 - w0) / (3.0 * (1.0 - w0 * snow.g))).sqrt()
    }))
}

/// Translate the shape factors B and g into Libois' b.
pub fn compute_b(b: f64, g: f64) -> f64 {
    4.0 / 3.0 * (b / (1.0 - g)).sqrt()
}
