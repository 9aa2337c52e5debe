//! Slope correction of measured albedo, after Picard et al. 2020.
//!
//! A spectrum measured over a tilted snow surface mixes the diffuse albedo
//! `a` of the snow with a direct component scaled by the illumination factor
//! `K = cos(local SZA) / cos(SZA)`:
//!
//! `albedo = (1 - d) K a^n + d a`, with `n = 3/7 (1 + 2 K cos(SZA))`
//!
//! where `d` is the diffuse fraction of the incoming radiation. The
//! functions here invert this relation, for a single spectrum with an
//! unknown `K`, or for a timeseries with an unknown slope and aspect.

pub mod solver;


use std::f64::consts::{PI, TAU};

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use self::solver::{
    constrained_least_squares, least_squares, ConstrainedOptions, LeastSquaresReport,
};
use crate::{constants::ensure_same_len, error::SnowOpticsError};

/// Number of fixed-point iterations used by default.
pub const DEFAULT_ITERATIONS: usize = 5;

/// Diffuse albedo assumed in the visible by default.
pub const DEFAULT_ALBEDO_0: f64 = 0.98;

/// Wavelength band (m) where the diffuse albedo is assumed known when `K` is
/// estimated from a single spectrum. Bounds are excluded.
const ESTIMATION_BAND: (f64, f64) = (400e-9, 550e-9);

/// Starting slope of the timeseries retrieval, in radians.
const INITIAL_SLOPE: f64 = 0.001;

/// Diffuse albedo recovered from a measured one.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedAlbedo {
    /// Diffuse albedo of the snow.
    pub diffuse: Array1<f64>,
    /// Direct-like albedo `diffuse^n` modeled on the slope.
    pub modeled: Array1<f64>,
}

/// Outcome of [`albedo_correction_without_slope`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeEstimate {
    /// Estimated illumination factor.
    pub k: f64,
    /// Albedo corrected with that factor.
    pub corrected: CorrectedAlbedo,
}

/// Estimate `K` from one albedo spectrum, then correct the spectrum with it.
///
/// Over 400-550 nm the diffuse albedo is assumed to be `albedo_0` and `n` is
/// approximated at the true `sza`, which gives `K` in closed form by least
/// squares. The correction uses [`albedo_correction_with_slope`].
pub fn albedo_correction_without_slope(
    wavelengths: ArrayView1<'_, f64>,
    albedo: ArrayView1<'_, f64>,
    difftot: ArrayView1<'_, f64>,
    sza: f64,
    albedo_0: f64,
) -> Result<SlopeEstimate, SnowOpticsError> {
    ensure_same_len("albedo", albedo.len(), wavelengths.len())?;
    ensure_same_len("difftot", difftot.len(), wavelengths.len())?;

    let n_approx = 3.0 / 7.0 * (1.0 + 2.0 * sza.cos());

    let (numerator, denominator, count) = Zip::from(&wavelengths)
        .and(&albedo)
        .and(&difftot)
        .fold((0.0, 0.0, 0), |(num, den, count), &wl, &alb, &d| {
            if wl > ESTIMATION_BAND.0 && wl < ESTIMATION_BAND.1 {
                (
                    num + (1.0 - d * albedo_0) * (alb - d),
                    den + (1.0 - d).powi(2) * albedo_0.powf(n_approx),
                    count + 1,
                )
            } else {
                (num, den, count)
            }
        });
    if count == 0 {
        return Err(SnowOpticsError::EmptyReferenceBand(
            ESTIMATION_BAND.0,
            ESTIMATION_BAND.1,
        ));
    }

    let k = numerator / denominator;
    debug!("estimated K = {k} from {count} wavelengths");

    let corrected = albedo_correction_with_slope(albedo, difftot, sza, k, DEFAULT_ITERATIONS)?;
    Ok(SlopeEstimate { k, corrected })
}

/// Correct an albedo spectrum for a known illumination factor `k`, as done
/// in Picard et al. 2020.
///
/// Fixed-point iteration on
/// `a ← (albedo - (1 - d) K (a^n - a)) / (d + (1 - d) K)`.
pub fn albedo_correction_with_slope(
    albedo: ArrayView1<'_, f64>,
    difftot: ArrayView1<'_, f64>,
    sza: f64,
    k: f64,
    iterations: usize,
) -> Result<CorrectedAlbedo, SnowOpticsError> {
    ensure_same_len("difftot", difftot.len(), albedo.len())?;
    let n = 3.0 / 7.0 * (1.0 + 2.0 * k * sza.cos());

    let mut diffuse = albedo.mapv(clip_above_one);
    for _ in 0..iterations {
        Zip::from(&mut diffuse)
            .and(&albedo)
            .and(&difftot)
            .for_each(|a, &alb, &d| {
                *a = clip_negative(
                    (alb - (1.0 - d) * k * (a.powf(n) - *a)) / (d + (1.0 - d) * k),
                );
            });
    }

    let modeled = diffuse.mapv(|a| a.powf(n));
    Ok(CorrectedAlbedo { diffuse, modeled })
}

/// Correct an albedo spectrum for a known illumination factor `k`, with the
/// exponent moved outside.
///
/// Fixed-point iteration on
/// `a ← ((albedo - d (a - a^n)) / ((1 - d) K + d))^(1/n)`. This is not an
/// algebraic rewrite of [`albedo_correction_with_slope`] and the two can
/// converge differently.
pub fn albedo_correction_with_slope2(
    albedo: ArrayView1<'_, f64>,
    difftot: ArrayView1<'_, f64>,
    sza: f64,
    k: f64,
    iterations: usize,
) -> Result<CorrectedAlbedo, SnowOpticsError> {
    ensure_same_len("difftot", difftot.len(), albedo.len())?;
    let n = 3.0 / 7.0 * (1.0 + 2.0 * k * sza.cos());

    let mut diffuse = albedo.mapv(clip_above_one);
    for _ in 0..iterations {
        Zip::from(&mut diffuse)
            .and(&albedo)
            .and(&difftot)
            .for_each(|a, &alb, &d| {
                *a = clip_negative(
                    ((alb - d * (*a - a.powf(n))) / ((1.0 - d) * k + d)).powf(1.0 / n),
                );
            });
    }

    let modeled = diffuse.mapv(|a| a.powf(n));
    Ok(CorrectedAlbedo { diffuse, modeled })
}

/// Options of [`albedo_timeseries_correction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeseriesOptions {
    /// Constrain the diffuse albedo in `reference_band` to `albedo_0`.
    pub constrained: bool,
    /// Wavelength band (m, bounds included) of the constraint.
    pub reference_band: (f64, f64),
    /// Diffuse albedo imposed in the reference band.
    pub albedo_0: f64,
    /// Optimizer settings. Only `solver` is used when unconstrained.
    pub optimizer: ConstrainedOptions,
}

impl Default for TimeseriesOptions {
    fn default() -> Self {
        Self {
            constrained: false,
            reference_band: (400e-9, 500e-9),
            albedo_0: DEFAULT_ALBEDO_0,
            optimizer: ConstrainedOptions::default(),
        }
    }
}

/// Outcome of [`albedo_timeseries_correction`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRetrieval {
    /// Diffuse albedo on the wavelength grid.
    pub albedo_diffuse: Array1<f64>,
    /// Slope inclination in radians, never negative.
    pub slope: f64,
    /// Slope aspect in radians, in [0, 2π).
    pub aspect: f64,
    /// Optimizer report, with the raw parameters `[slope, aspect, albedo...]`.
    pub report: LeastSquaresReport,
}

/// Albedo modeled over a slope for every time step.
///
/// `albedo_diffuse` has one value per wavelength, `difftot` is (time,
/// wavelength), and `sza`/`saa` have one value per time step. The result is
/// (time, wavelength).
pub fn timeseries_model(
    albedo_diffuse: ArrayView1<'_, f64>,
    slope: f64,
    aspect: f64,
    difftot: ArrayView2<'_, f64>,
    sza: ArrayView1<'_, f64>,
    saa: ArrayView1<'_, f64>,
) -> Result<Array2<f64>, SnowOpticsError> {
    let (num_times, num_wavelengths) = difftot.dim();
    ensure_same_len("albedo_diffuse", albedo_diffuse.len(), num_wavelengths)?;
    ensure_same_len("sza", sza.len(), num_times)?;
    ensure_same_len("saa", saa.len(), num_times)?;
    Ok(model_timeseries(albedo_diffuse, slope, aspect, difftot, sza, saa))
}

/// [`timeseries_model`] on inputs of known consistent shapes.
fn model_timeseries(
    albedo_diffuse: ArrayView1<'_, f64>,
    slope: f64,
    aspect: f64,
    difftot: ArrayView2<'_, f64>,
    sza: ArrayView1<'_, f64>,
    saa: ArrayView1<'_, f64>,
) -> Array2<f64> {
    let mut model = Array2::zeros(difftot.raw_dim());
    Zip::from(model.rows_mut())
        .and(difftot.rows())
        .and(&sza)
        .and(&saa)
        .for_each(|mut row, difftot, &sza, &saa| {
            let cos_lsza =
                sza.cos() * slope.cos() + sza.sin() * slope.sin() * (saa - aspect).cos();
            let k = cos_lsza / sza.cos();
            let n = 3.0 / 7.0 * (1.0 + 2.0 * cos_lsza);
            Zip::from(&mut row)
                .and(&difftot)
                .and(&albedo_diffuse)
                .for_each(|m, &d, &a| *m = (1.0 - d) * k * a.powf(n) + d * a);
        });
    model
}

/// Retrieve the diffuse albedo, slope and aspect from a timeseries of albedo
/// spectra.
///
/// `albedo` and `difftot` are (time, wavelength), `sza` and `saa` have one
/// value per time step. The retrieval minimizes the squared difference
/// between [`timeseries_model`] and `albedo`, optionally with the diffuse
/// albedo constrained in a reference band (see Picard et al. 2020).
pub fn albedo_timeseries_correction(
    wavelengths: ArrayView1<'_, f64>,
    albedo: ArrayView2<'_, f64>,
    difftot: ArrayView2<'_, f64>,
    sza: ArrayView1<'_, f64>,
    saa: ArrayView1<'_, f64>,
    options: &TimeseriesOptions,
) -> Result<TimeseriesRetrieval, SnowOpticsError> {
    let (num_times, num_wavelengths) = albedo.dim();
    if difftot.dim() != albedo.dim() {
        return Err(SnowOpticsError::InconsistentInputs(format!(
            "difftot has shape {:?}, albedo has shape {:?}",
            difftot.dim(),
            albedo.dim()
        )));
    }
    ensure_same_len("wavelengths", wavelengths.len(), num_wavelengths)?;
    ensure_same_len("sza", sza.len(), num_times)?;
    ensure_same_len("saa", saa.len(), num_times)?;
    if num_times == 0 {
        return Err(SnowOpticsError::InconsistentInputs(
            "the timeseries is empty".to_string(),
        ));
    }

    let residuals = |params: &Array1<f64>| -> Array1<f64> {
        let adiff = params.slice(ndarray::s![2..]);
        let model = model_timeseries(adiff, params[0], params[1], difftot, sza, saa);
        (model - albedo).into_iter().collect()
    };

    let initial: Array1<f64> = [INITIAL_SLOPE, PI]
        .into_iter()
        .chain(albedo.mean_axis(Axis(0)).into_iter().flatten())
        .collect();

    info!(
        "retrieving slope, aspect and diffuse albedo from {num_times} spectra of {num_wavelengths} wavelengths{}",
        if options.constrained { " (constrained)" } else { "" }
    );

    let report = if options.constrained {
        let (low, high) = options.reference_band;
        let band: Vec<usize> = wavelengths
            .iter()
            .enumerate()
            .filter(|&(_, &wl)| wl >= low && wl <= high)
            .map(|(i, _)| i)
            .collect();
        if band.is_empty() {
            warn!("no wavelength in the reference band, the constraint is empty");
        }
        let albedo_0 = options.albedo_0;
        let constraints = |params: &Array1<f64>| -> Array1<f64> {
            band.iter().map(|&i| params[2 + i] - albedo_0).collect()
        };
        constrained_least_squares(residuals, constraints, initial, &options.optimizer)
    } else {
        least_squares(residuals, initial, &options.optimizer.solver)
    };

    if !report.converged() {
        warn!(
            "timeseries retrieval did not converge: {:?} after {} evaluations",
            report.termination, report.evaluations
        );
    }

    let (slope, aspect) = normalize_orientation(report.params[0], report.params[1]);
    info!(
        "retrieved slope {:.3}°, aspect {:.3}°, cost {:e}",
        slope.to_degrees(),
        aspect.to_degrees(),
        report.cost
    );

    Ok(TimeseriesRetrieval {
        albedo_diffuse: report.params.slice(ndarray::s![2..]).to_owned(),
        slope,
        aspect,
        report,
    })
}

/// Make the slope nonnegative, flipping the aspect if needed, and wrap the
/// aspect into [0, 2π).
fn normalize_orientation(slope: f64, aspect: f64) -> (f64, f64) {
    let (slope, aspect) = if slope < 0.0 {
        (-slope, aspect + PI)
    } else {
        (slope, aspect)
    };
    (slope, aspect.rem_euclid(TAU))
}

/// Clip negative values to 0, NaN stays NaN.
fn clip_negative(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Clip values above 1 to 1, NaN stays NaN.
fn clip_above_one(x: f64) -> f64 {
    if x > 1.0 {
        1.0
    } else {
        x
    }
}
