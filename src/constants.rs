//! Optical constants consumed by the snow models.
//!
//! Refractive index tables and impurity absorption models are not part of
//! this crate. They come from an implementation of [`OpticalConstants`]
//! supplied by the caller, and every model function takes it as its first
//! argument.

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

use crate::error::SnowOpticsError;

/// Name of the default ice refractive index dataset (Picard et al. 2016).
pub const DEFAULT_ICE_DATASET: &str = "p2016";

/// Formulation of the dust imaginary refractive index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DustFormulation {
    /// The collaborator's default formulation
    Default,
    /// Skiles et al. 2014
    Skiles2014,
}

/// Spectral optical constants of ice and light-absorbing impurities.
///
/// All arrays are aligned to `wavelengths`, given in meters. An
/// implementation returns [`SnowOpticsError::UnknownDataset`] (or another
/// error) when it cannot serve a request.
pub trait OpticalConstants {
    /// Complex refractive index of ice from the named dataset.
    fn ice_refractive_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        dataset: &str,
    ) -> Result<Array1<Complex64>, SnowOpticsError>;

    /// Imaginary refractive index of soot (black carbon).
    fn soot_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        enhancement: f64,
    ) -> Result<Array1<f64>, SnowOpticsError>;

    /// Imaginary refractive index of humic-like substances.
    fn hulis_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SnowOpticsError>;

    /// Imaginary refractive index of mineral dust.
    fn dust_imaginary_index(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        formulation: DustFormulation,
    ) -> Result<Array1<f64>, SnowOpticsError>;

    /// Mass absorption efficiency of dust in m²/kg (Caponi et al. 2017),
    /// keyed by a free-form formulation name.
    fn dust_mass_absorption(
        &self,
        wavelengths: ArrayView1<'_, f64>,
        formulation: &str,
    ) -> Result<Array1<f64>, SnowOpticsError>;
}

/// Source of the imaginary refractive index of ice.
#[derive(Debug, Clone, PartialEq)]
pub enum IceIndex {
    /// Look the index up in a named dataset through [`OpticalConstants`]
    Dataset(String),
    /// A precomputed imaginary index, aligned to the wavelengths
    Imaginary(Array1<f64>),
}

impl Default for IceIndex {
    fn default() -> Self {
        IceIndex::Dataset(DEFAULT_ICE_DATASET.to_string())
    }
}

impl IceIndex {
    /// Resolve to the imaginary part of the ice refractive index.
    pub fn imaginary<C: OpticalConstants + ?Sized>(
        &self,
        constants: &C,
        wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        let ni = match self {
            IceIndex::Dataset(name) => constants
                .ice_refractive_index(wavelengths, name)?
                .mapv(|n| n.im),
            IceIndex::Imaginary(ni) => ni.clone(),
        };
        ensure_same_len("ice refractive index", ni.len(), wavelengths.len())?;
        Ok(ni)
    }
}

/// Check that a spectral quantity has the length of the wavelength grid.
pub(crate) fn ensure_same_len(
    what: &str,
    len: usize,
    expected: usize,
) -> Result<(), SnowOpticsError> {
    if len == expected {
        Ok(())
    } else {
        Err(SnowOpticsError::InconsistentInputs(format!(
            "{what} has length {len}, expected {expected}"
        )))
    }
}
