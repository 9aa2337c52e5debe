//! Snow microstructure and the single-scattering quantities derived from it.

mod impurities;
mod scattering;


pub use impurities::{Impurities, Impurity, Species};
pub use scattering::{
    compute_alpha, compute_b, compute_co_single_scattering_albedo, compute_malinka_y,
};

use crate::constants::IceIndex;

/// Density of ice in kg/m³.
pub const RHO_ICE: f64 = 917.0;

/// Default absorption enhancement factor in grains.
///
/// B = 1.6 and g = 0.845 are equivalent to b = 4.3 found in Picard et al.
/// 2009.
pub const DEFAULT_B: f64 = 1.6;

/// Default asymmetry factor.
pub const DEFAULT_G: f64 = 0.845;

/// State of a snowpack as seen by the asymptotic radiative transfer models.
#[derive(Debug, Clone, PartialEq)]
pub struct Snow {
    /// Specific surface area in m²/kg.
    pub ssa: f64,
    /// Light-absorbing impurities mixed in the snow.
    pub impurities: Impurities,
    /// Where the imaginary refractive index of ice comes from.
    pub ice_index: IceIndex,
    /// Absorption enhancement factor B.
    pub b: f64,
    /// Asymmetry factor g.
    pub g: f64,
}

impl Snow {
    /// Clean snow with the default ice dataset and shape factors.
    pub fn new(ssa: f64) -> Self {
        Self {
            ssa,
            impurities: Impurities::default(),
            ice_index: IceIndex::default(),
            b: DEFAULT_B,
            g: DEFAULT_G,
        }
    }

    /// Replace the impurities.
    pub fn with_impurities(mut self, impurities: Impurities) -> Self {
        self.impurities = impurities;
        self
    }

    /// Replace the source of the ice refractive index.
    pub fn with_ice_index(mut self, ice_index: IceIndex) -> Self {
        self.ice_index = ice_index;
        self
    }

    /// Replace the shape factors B and g.
    pub fn with_shape(mut self, b: f64, g: f64) -> Self {
        self.b = b;
        self.g = g;
        self
    }
}
