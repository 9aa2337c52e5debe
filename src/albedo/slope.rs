//! Albedo of snow on a tilted terrain, after Picard et al. 2020.

use std::f64::consts::FRAC_PI_2;

use log::debug;
use ndarray::{Array1, ArrayView1, Zip};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use super::{albedo_diffuse_kz04, albedo_direct_kz04};
use crate::{
    constants::OpticalConstants,
    error::SnowOpticsError,
    geometry::{local_sza, Slope},
    optics::Snow,
};

/// Variants of the sloped-terrain albedo model.
///
/// The "T" variants describe a slope at the top of a hill, the "M" variants a
/// slope facing a symmetric one, which couples the two through multiple
/// reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(
    parse_err_ty = SnowOpticsError,
    parse_err_fn = invalid_slope_model
)]
pub enum SlopeModel {
    /// Ignore the slope, "flat"
    #[strum(serialize = "flat")]
    Flat,
    /// First-order slope correction of the direct component, "small_slope"
    #[strum(serialize = "small_slope")]
    SmallSlope,
    /// "DT"
    #[strum(serialize = "DT")]
    Dt,
    /// "DM"
    #[strum(serialize = "DM")]
    Dm,
    /// "ST"
    #[strum(serialize = "ST")]
    St,
    /// "SM"
    #[strum(serialize = "SM")]
    Sm,
}

fn invalid_slope_model(name: &str) -> SnowOpticsError {
    SnowOpticsError::InvalidSlopeModel(name.to_string())
}

impl SlopeModel {
    /// Name of the model.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The equivalent model at the top of the hill, for the "M" variants.
    pub fn top_of_hill(&self) -> Option<SlopeModel> {
        match self {
            SlopeModel::Dm => Some(SlopeModel::Dt),
            SlopeModel::Sm => Some(SlopeModel::St),
            _ => None,
        }
    }
}

/// Options of [`albedo_p20_slope`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlopeOptions {
    /// Whether `r_difftot` was measured on the slope. Otherwise the "M"
    /// variants derive the albedo from their top-of-hill counterpart.
    pub measured_difftot: bool,
    /// Use this albedo for the direct, local direct and diffuse flat albedos
    /// instead of the KZ04 model. `Some(0.0)` counts as unset.
    pub fixed_flat_albedo: Option<f64>,
}

/// Albedo on a tilted terrain based on Picard et al. 2020.
///
/// `sza` and `saa` are the solar zenith and azimuth angles, `r_difftot` the
/// diffuse fraction of the incoming radiation. The result is NaN everywhere
/// when the slope is self-shadowed (local SZA at or beyond π/2), and NaN on
/// every wavelength where the albedo would be negative.
#[allow(clippy::too_many_arguments)]
pub fn albedo_p20_slope<C: OpticalConstants + ?Sized>(
    constants: &C,
    wavelengths: ArrayView1<'_, f64>,
    sza: f64,
    saa: f64,
    snow: &Snow,
    r_difftot: f64,
    slope: Slope,
    model: SlopeModel,
    options: &SlopeOptions,
) -> Result<Array1<f64>, SnowOpticsError> {
    let lsza = local_sza(sza, saa, slope);
    if !(0.0..FRAC_PI_2).contains(&lsza) {
        return Ok(Array1::from_elem(wavelengths.len(), f64::NAN));
    }

    let terms = SlopeTerms::new(constants, wavelengths, sza, lsza, snow, slope, options)?;

    match model.top_of_hill() {
        Some(top) if !options.measured_difftot => {
            debug!(
                "deriving {} from the top-of-hill model {}",
                model.name(),
                top.name()
            );
            let albedo_top = terms.albedo(top, r_difftot)?;
            Ok(terms.couple(model, &albedo_top, r_difftot))
        }
        _ => terms.albedo(model, r_difftot),
    }
}

/// Flat albedos and geometric factors shared by all the model variants.
struct SlopeTerms {
    /// Direct flat albedo at the local SZA
    alb_loc_dir: Array1<f64>,
    /// Direct flat albedo at the true SZA
    alb_dir: Array1<f64>,
    /// Diffuse flat albedo
    alb_diff: Array1<f64>,
    /// Illumination factor, cos(local SZA) / cos(SZA), never negative
    k: f64,
    /// Fraction of the sky seen by the slope
    v: f64,
    /// Terrain reflection coupling, (1 - V) · diffuse albedo
    m: Array1<f64>,
}

impl SlopeTerms {
    fn new<C: OpticalConstants + ?Sized>(
        constants: &C,
        wavelengths: ArrayView1<'_, f64>,
        sza: f64,
        lsza: f64,
        snow: &Snow,
        slope: Slope,
        options: &SlopeOptions,
    ) -> Result<Self, SnowOpticsError> {
        let fixed = options.fixed_flat_albedo.filter(|&albedo| albedo != 0.0);
        let (alb_loc_dir, alb_dir, alb_diff) = match fixed {
            Some(albedo) => {
                let flat = Array1::from_elem(wavelengths.len(), albedo);
                (flat.clone(), flat.clone(), flat)
            }
            None => (
                albedo_direct_kz04(constants, wavelengths, lsza, snow)?,
                albedo_direct_kz04(constants, wavelengths, sza, snow)?,
                albedo_diffuse_kz04(constants, wavelengths, snow)?,
            ),
        };

        let k = (lsza.cos() / sza.cos()).max(0.0);
        let v = (1.0 + slope.inclination.cos()) / 2.0;
        let m = alb_diff.mapv(|a| (1.0 - v) * a);

        Ok(Self {
            alb_loc_dir,
            alb_dir,
            alb_diff,
            k,
            v,
            m,
        })
    }

    /// Closed-form albedo of a model, NaN where negative.
    fn albedo(&self, model: SlopeModel, r_difftot: f64) -> Result<Array1<f64>, SnowOpticsError> {
        let (k, v) = (self.k, self.v);

        let (adir, adiff) = match model {
            SlopeModel::Flat => (self.alb_dir.clone(), self.alb_diff.clone()),
            SlopeModel::SmallSlope => (self.alb_loc_dir.mapv(|a| k * a), self.alb_diff.clone()),
            SlopeModel::Dt => (
                self.alb_loc_dir.mapv(|a| v * k * a),
                self.alb_diff.mapv(|a| v.powi(2) * a),
            ),
            SlopeModel::Dm => {
                if k == 0.0 {
                    return Err(SnowOpticsError::SelfShadow(model.name()));
                }
                (
                    Zip::from(&self.alb_loc_dir)
                        .and(&self.m)
                        .map_collect(|&a, &m| v / (1.0 + m) * k * a),
                    Zip::from(&self.alb_diff)
                        .and(&self.m)
                        .map_collect(|&a, &m| v / (1.0 + m) * a),
                )
            }
            SlopeModel::St => (
                Zip::from(&self.alb_loc_dir)
                    .and(&self.alb_dir)
                    .and(&self.m)
                    .map_collect(|&loc, &dir, &m| {
                        ((v + m * (1.0 - v)) * k * loc + (m * v + (1.0 - v)) * dir)
                            / (1.0 - m.powi(2))
                    }),
                Zip::from(&self.alb_diff)
                    .and(&self.m)
                    .map_collect(|&a, &m| v / (1.0 - m) * a),
            ),
            SlopeModel::Sm => {
                if k == 0.0 {
                    return Err(SnowOpticsError::SelfShadow(model.name()));
                }
                (
                    Zip::from(&self.alb_loc_dir)
                        .and(&self.alb_dir)
                        .and(&self.m)
                        .map_collect(|&loc, &dir, &m| {
                            v / (1.0 + m) * k * loc + (1.0 - v) / (1.0 + m) * dir
                        }),
                    self.alb_diff.clone(),
                )
            }
        };

        Ok(Zip::from(&adir).and(&adiff).map_collect(|&dir, &diff| {
            let albedo = (1.0 - r_difftot) * dir + r_difftot * diff;
            if albedo >= 0.0 {
                albedo
            } else {
                f64::NAN
            }
        }))
    }

    /// Albedo of an "M" variant from its top-of-hill counterpart, when the
    /// diffuse fraction was not measured on the slope.
    fn couple(&self, model: SlopeModel, albedo_top: &Array1<f64>, r_difftot: f64) -> Array1<f64> {
        let (k, v) = (self.k, self.v);

        match model {
            SlopeModel::Dm if k > 0.0 => albedo_top
                .mapv(|top| top / (1.0 - (1.0 - v) * r_difftot + (1.0 - v) / v * top)),
            SlopeModel::Dm if r_difftot > 0.0 => Zip::from(&self.alb_diff)
                .and(&self.m)
                .map_collect(|&a, &m| v * a / (1.0 + m)),
            SlopeModel::Sm if k > 0.0 => Zip::from(albedo_top)
                .and(&self.alb_loc_dir)
                .and(&self.alb_dir)
                .and(&self.alb_diff)
                .and(&self.m)
                .map_collect(|&top, &loc, &dir, &diff, &m| {
                    top / (1.0
                        + (1.0 - v)
                            * ((1.0 - r_difftot) * (k * loc + m * dir) / (1.0 - m.powi(2))
                                + r_difftot * (v / (1.0 - m) * diff - 1.0)))
                }),
            SlopeModel::Sm if r_difftot > 0.0 => self.alb_diff.clone(),
            _ => Array1::from_elem(albedo_top.len(), f64::NAN),
        }
    }
}
