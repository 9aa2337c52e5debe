//! Python bindings
//!
//! NOTE: this module is only the interface between Rust and Python, the
//! models live in the other modules. Python callers pass the imaginary
//! refractive index of ice directly since there is no optical constants
//! database on this side.

use log::debug;
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::{
    albedo::{albedo_kz04, albedo_p20_slope, SlopeModel, SlopeOptions},
    constants::{DustFormulation, IceIndex, OpticalConstants},
    correction::{albedo_timeseries_correction, TimeseriesOptions},
    error::SnowOpticsError,
    geometry::{local_viewing_angle, Slope},
    optics::{Snow, DEFAULT_B, DEFAULT_G},
};

impl From<SnowOpticsError> for PyErr {
    fn from(e: SnowOpticsError) -> Self {
        PyValueError::new_err(e.to_string())
    }
}

/// Optical constants when only a precomputed ice index is available: every
/// lookup fails.
#[derive(Debug)]
struct PrecomputedOnly;

impl OpticalConstants for PrecomputedOnly {
    fn ice_refractive_index(
        &self,
        _wavelengths: ArrayView1<'_, f64>,
        dataset: &str,
    ) -> Result<Array1<Complex64>, SnowOpticsError> {
        Err(SnowOpticsError::UnknownDataset(dataset.to_string()))
    }

    fn soot_imaginary_index(
        &self,
        _wavelengths: ArrayView1<'_, f64>,
        _enhancement: f64,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Err(SnowOpticsError::InvalidSpecies("soot".to_string()))
    }

    fn hulis_imaginary_index(
        &self,
        _wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Err(SnowOpticsError::InvalidSpecies("hulis".to_string()))
    }

    fn dust_imaginary_index(
        &self,
        _wavelengths: ArrayView1<'_, f64>,
        _formulation: DustFormulation,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Err(SnowOpticsError::InvalidSpecies("dust".to_string()))
    }

    fn dust_mass_absorption(
        &self,
        _wavelengths: ArrayView1<'_, f64>,
        formulation: &str,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        Err(SnowOpticsError::InvalidSpecies(format!("dust_{formulation}")))
    }
}

fn clean_snow(ni: PyReadonlyArray1<'_, f64>, ssa: f64, b: f64, g: f64) -> Snow {
    Snow::new(ssa)
        .with_ice_index(IceIndex::Imaginary(ni.as_array().to_owned()))
        .with_shape(b, g)
}

/// Spectral albedo of flat clean snow from KZ04.
///
/// `wavelengths` are in m, `ni` is the imaginary refractive index of ice at
/// those wavelengths, `sza` is in radians and `ssa` in m²/kg.
#[pyfunction]
#[pyo3(name = "albedo_kz04", signature = (wavelengths, ni, sza, ssa, r_difftot=0.0, b=DEFAULT_B, g=DEFAULT_G))]
#[allow(clippy::too_many_arguments)]
fn albedo_kz04_py<'py>(
    py: Python<'py>,
    wavelengths: PyReadonlyArray1<'py, f64>,
    ni: PyReadonlyArray1<'py, f64>,
    sza: f64,
    ssa: f64,
    r_difftot: f64,
    b: f64,
    g: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let snow = clean_snow(ni, ssa, b, g);
    let albedo = albedo_kz04(&PrecomputedOnly, wavelengths.as_array(), sza, &snow, r_difftot)?;
    Ok(albedo.into_pyarray(py))
}

/// Spectral albedo of clean snow on a slope, Picard et al. 2020.
///
/// `model` is one of "flat", "small_slope", "DT", "DM", "ST" or "SM".
#[pyfunction]
#[pyo3(name = "albedo_p20_slope", signature = (wavelengths, ni, sza, saa, ssa, r_difftot, slope, aspect, model, measured_difftot=false, fixed_flat_albedo=None))]
#[allow(clippy::too_many_arguments)]
fn albedo_p20_slope_py<'py>(
    py: Python<'py>,
    wavelengths: PyReadonlyArray1<'py, f64>,
    ni: PyReadonlyArray1<'py, f64>,
    sza: f64,
    saa: f64,
    ssa: f64,
    r_difftot: f64,
    slope: f64,
    aspect: f64,
    model: &str,
    measured_difftot: bool,
    fixed_flat_albedo: Option<f64>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let model: SlopeModel = model.parse()?;
    let snow = clean_snow(ni, ssa, DEFAULT_B, DEFAULT_G);
    let options = SlopeOptions {
        measured_difftot,
        fixed_flat_albedo,
    };
    let albedo = albedo_p20_slope(
        &PrecomputedOnly,
        wavelengths.as_array(),
        sza,
        saa,
        &snow,
        r_difftot,
        Slope::new(slope, aspect),
        model,
        &options,
    )?;
    Ok(albedo.into_pyarray(py))
}

/// Local incidence zenith, viewing zenith and relative azimuth angles over
/// a slope.
#[pyfunction]
#[pyo3(name = "local_viewing_angle")]
fn local_viewing_angle_py(
    theta_i: f64,
    phi_i: f64,
    theta_v: f64,
    phi_v: f64,
    slope: f64,
    aspect: f64,
) -> (f64, f64, f64) {
    let local = local_viewing_angle(theta_i, phi_i, theta_v, phi_v, Slope::new(slope, aspect));
    (
        local.incidence_zenith,
        local.viewing_zenith,
        local.relative_azimuth,
    )
}

/// Retrieve the diffuse albedo, slope and aspect from a timeseries of albedo
/// spectra.
///
/// `albedo` and `difftot` have shape (`num_times`, `num_wavelengths`), `sza`
/// and `saa` have shape (`num_times`, ). Returns the diffuse albedo, the
/// slope and the aspect, in radians.
#[pyfunction]
#[pyo3(name = "albedo_timeseries_correction", signature = (wavelengths, albedo, difftot, sza, saa, constrained=false))]
fn albedo_timeseries_correction_py<'py>(
    py: Python<'py>,
    wavelengths: PyReadonlyArray1<'py, f64>,
    albedo: PyReadonlyArray2<'py, f64>,
    difftot: PyReadonlyArray2<'py, f64>,
    sza: PyReadonlyArray1<'py, f64>,
    saa: PyReadonlyArray1<'py, f64>,
    constrained: bool,
) -> PyResult<(Bound<'py, PyArray1<f64>>, f64, f64)> {
    let options = TimeseriesOptions {
        constrained,
        ..Default::default()
    };
    let (wavelengths, albedo, difftot, sza, saa) = (
        wavelengths.as_array(),
        albedo.as_array(),
        difftot.as_array(),
        sza.as_array(),
        saa.as_array(),
    );

    // The fit can take a while, let other Python threads run
    let retrieval = py.allow_threads(|| {
        albedo_timeseries_correction(wavelengths, albedo, difftot, sza, saa, &options)
    })?;
    debug!("timeseries retrieval: {:?}", retrieval.report.termination);

    Ok((
        retrieval.albedo_diffuse.into_pyarray(py),
        retrieval.slope,
        retrieval.aspect,
    ))
}

/// A Python module implemented in Rust.
#[pymodule]
fn snowoptics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(albedo_kz04_py, m)?)?;
    m.add_function(wrap_pyfunction!(albedo_p20_slope_py, m)?)?;
    m.add_function(wrap_pyfunction!(local_viewing_angle_py, m)?)?;
    m.add_function(wrap_pyfunction!(albedo_timeseries_correction_py, m)?)?;
    Ok(())
}
