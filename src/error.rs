//! Errors returned by the snow optics models.
//!
//! A single [`SnowOpticsError`] covers the whole crate so that `?` works
//! across modules.

use thiserror::Error;

/// Possible snow optics errors.
///
/// These are the hard failures. Physically undefined results (grazing
/// geometry, a self-shadowed slope in the selector, a negative mixed albedo)
/// are not errors, they come back as NaN.
#[derive(Debug, Error)]
pub enum SnowOpticsError {
    /// The impurity species (or its dust formulation) is not known
    #[error("Invalid species: '{0}'")]
    InvalidSpecies(String),
    /// No density was given and the species has no default one
    #[error("No default density for the impurities '{0}'")]
    MissingDensity(String),
    /// The refractive index dataset is not available from the collaborator
    #[error("unknown refractive index dataset '{0}'")]
    UnknownDataset(String),
    /// A zenith angle has a negative cosine, probably given in degrees
    #[error("cos(sza) = {0} is negative, the solar zenith angle is probably not in radians")]
    NegativeCosine(f64),
    /// The slope model name is not one of the known variants
    #[error("Invalid slope model '{0}'")]
    InvalidSlopeModel(String),
    /// The relative azimuth convention is neither "angular" nor "vectorial"
    #[error("Invalid RAA_formalism '{0}' in brf0")]
    InvalidAzimuthConvention(String),
    /// The slope model does not handle a self-shadowed facet
    #[error("slope model {0} is incorrect in the self-shadow")]
    SelfShadow(&'static str),
    /// Sun positions were requested without an ephemeris
    #[error("an ephemeris must be provided to compute the sun position")]
    MissingEphemeris,
    /// The solar position algorithm rejected its inputs
    #[error("cannot compute the sun position: {0}")]
    SunPosition(String),
    /// The inputs don't have the expected shape(s)
    #[error("inputs have inconsistent shapes: {0}")]
    InconsistentInputs(String),
    /// No wavelength falls inside the reference band
    #[error("no wavelength inside the reference band ({0:e} m, {1:e} m)")]
    EmptyReferenceBand(f64, f64),
}
