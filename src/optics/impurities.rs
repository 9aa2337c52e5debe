//! Light-absorbing impurities and their mass absorption cross-sections.

use std::{f64::consts::PI, fmt};

use log::debug;
use ndarray::{Array1, ArrayView1};
use smallvec::SmallVec;
use strum_macros::{EnumString, IntoStaticStr};

use crate::{
    constants::{ensure_same_len, DustFormulation, OpticalConstants},
    error::SnowOpticsError,
};

/// Bulk density of soot in kg/m³, used when none is given.
const SOOT_DENSITY: f64 = 1270.0;

/// Enhancement parameter passed to the soot model (1.638 in Tuzet et al.
/// 2019).
const SOOT_ENHANCEMENT: f64 = 1.0;

/// Impurity species.
///
/// The fixed names parse with [`str::parse`], [`Species::from_name`] also
/// accepts "dust_<formulation>".
#[derive(Debug, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(parse_err_ty = SnowOpticsError, parse_err_fn = invalid_species)]
pub enum Species {
    /// Black carbon, named "BC" or "soot"
    #[strum(to_string = "BC", serialize = "soot")]
    Soot,
    /// Humic-like substances, "hulis"
    #[strum(serialize = "hulis")]
    Hulis,
    /// Mineral dust with the default refractive index, "dust"
    #[strum(serialize = "dust")]
    Dust,
    /// Mineral dust after Skiles et al. 2014, "dust_skiles"
    #[strum(serialize = "dust_skiles")]
    DustSkiles,
    /// Mineral dust from a mass absorption efficiency formulation,
    /// "dust_<formulation>"
    #[strum(disabled)]
    DustMassAbsorption(String),
}

fn invalid_species(name: &str) -> SnowOpticsError {
    SnowOpticsError::InvalidSpecies(name.to_string())
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::DustMassAbsorption(formulation) => write!(f, "dust_{formulation}"),
            named => f.write_str(named.into()),
        }
    }
}

impl Species {
    /// Species from its name, including the "dust_<formulation>" mass
    /// absorption formulations.
    pub fn from_name(name: &str) -> Result<Self, SnowOpticsError> {
        name.parse().or_else(|err| match name.strip_prefix("dust_") {
            Some(formulation) => Ok(Species::DustMassAbsorption(formulation.to_string())),
            None => Err(err),
        })
    }

    /// Bulk density in kg/m³ used when the caller gives none.
    pub fn default_density(&self) -> Option<f64> {
        match self {
            Species::Soot => Some(SOOT_DENSITY),
            _ => None,
        }
    }

    /// Mass absorption cross-section in m²/kg on the wavelength grid.
    ///
    /// Species described by an imaginary refractive index `k` use
    /// `6π / λ / ρ · |k|`, which needs a density `ρ` (explicit or default).
    /// Mass absorption formulations come straight from the collaborator.
    pub fn mass_absorption_cross_section<C: OpticalConstants + ?Sized>(
        &self,
        constants: &C,
        wavelengths: ArrayView1<'_, f64>,
        density: Option<f64>,
    ) -> Result<Array1<f64>, SnowOpticsError> {
        let imaginary = match self {
            Species::Soot => constants.soot_imaginary_index(wavelengths, SOOT_ENHANCEMENT)?,
            Species::Hulis => constants.hulis_imaginary_index(wavelengths)?,
            Species::Dust => constants.dust_imaginary_index(wavelengths, DustFormulation::Default)?,
            Species::DustSkiles => {
                constants.dust_imaginary_index(wavelengths, DustFormulation::Skiles2014)?
            }
            Species::DustMassAbsorption(formulation) => {
                let mac = constants
                    .dust_mass_absorption(wavelengths, formulation)
                    .map_err(|e| {
                        debug!("dust formulation '{formulation}' rejected: {e}");
                        SnowOpticsError::InvalidSpecies(self.to_string())
                    })?;
                ensure_same_len("dust mass absorption", mac.len(), wavelengths.len())?;
                return Ok(mac);
            }
        };
        ensure_same_len("impurity refractive index", imaginary.len(), wavelengths.len())?;

        let density = density
            .or_else(|| self.default_density())
            .ok_or_else(|| SnowOpticsError::MissingDensity(self.to_string()))?;

        Ok(ndarray::Zip::from(&wavelengths)
            .and(&imaginary)
            .map_collect(|&wl, &k| 6.0 * PI / wl / density * k.abs()))
    }
}

/// One impurity species with its concentration in the snow.
#[derive(Debug, Clone, PartialEq)]
pub struct Impurity {
    /// The species.
    pub species: Species,
    /// Mass concentration in kg of impurity per kg of snow.
    pub concentration: f64,
    /// Bulk density in kg/m³, or `None` for the species default.
    pub density: Option<f64>,
}

/// The impurities in a snowpack, usually zero to a few species.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Impurities(SmallVec<[Impurity; 4]>);

impl Impurities {
    /// No impurities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a species at the given concentration (kg/kg).
    pub fn with(mut self, species: Species, concentration: f64) -> Self {
        self.0.push(Impurity {
            species,
            concentration,
            density: None,
        });
        self
    }

    /// Add a species at the given concentration (kg/kg) and bulk density
    /// (kg/m³).
    pub fn with_density(mut self, species: Species, concentration: f64, density: f64) -> Self {
        self.0.push(Impurity {
            species,
            concentration,
            density: Some(density),
        });
        self
    }

    /// Build from `(species name, concentration, optional density)` triples.
    pub fn parse<'a, I>(entries: I) -> Result<Self, SnowOpticsError>
    where
        I: IntoIterator<Item = (&'a str, f64, Option<f64>)>,
    {
        let impurities = entries
            .into_iter()
            .map(|(name, concentration, density)| {
                Ok(Impurity {
                    species: Species::from_name(name)?,
                    concentration,
                    density,
                })
            })
            .collect::<Result<SmallVec<_>, SnowOpticsError>>()?;
        Ok(Self(impurities))
    }

    /// Iterate over the species.
    pub fn iter(&self) -> impl Iterator<Item = &Impurity> {
        self.0.iter()
    }

    /// Whether the snow is clean.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
