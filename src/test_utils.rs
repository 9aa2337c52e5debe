//! Analytic optical constants for deterministic tests.

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

use crate::{
    constants::{DustFormulation, OpticalConstants},
    error::SnowOpticsError,
};

/// Smooth stand-ins for the refractive index tables. The ice index grows
/// by two decades between 500 nm and 800 nm like the real one does.
#[derive(Debug, Default)]
pub(crate) struct AnalyticConstants;

pub(crate) fn ice_imaginary(wavelength: f64) -> f64 {
    1e-9 * 10f64.powf((wavelength * 1e9 - 500.0) / 150.0)
}

impl OpticalConstants for AnalyticConstants {
    fn ice_refractive_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        dataset: &str,
    ) -> Result<Array1<Complex64>, SnowOpticsError> {
        match dataset {
            "p2016" => Ok(wavelengths.mapv(|wl| Complex64::new(1.31, ice_imaginary(wl)))),
            _ => Err(SnowOpticsError::UnknownDataset(dataset.to_string())),
        }
    }

    fn soot_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        enhancement: f64,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Ok(wavelengths.mapv(|_| 0.79 * enhancement))
    }

    fn hulis_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Ok(wavelengths.mapv(|wl| 0.01 * (wl / 500e-9).powi(-6)))
    }

    fn dust_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        formulation: DustFormulation,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        let k = match formulation {
            DustFormulation::Default => 0.003,
            DustFormulation::Skiles2014 => 0.001,
        };
        Ok(wavelengths.mapv(|_| k))
    }

    fn dust_mass_absorption(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        formulation: &str,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        match formulation {
            "sahara" => Ok(wavelengths.mapv(|wl| 100.0 * (wl / 500e-9).powi(-3))),
            _ => Err(SnowOpticsError::UnknownDataset(formulation.to_string())),
        }
    }
}

/// Evenly spaced wavelengths in meters, given in nanometers.
pub(crate) fn wavelengths_nm(start: f64, stop: f64, num: usize) -> Array1<f64> {
    Array1::linspace(start * 1e-9, stop * 1e-9, num)
}
