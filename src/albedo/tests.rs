use approx::assert_relative_eq;
use ndarray::{array, Array1};
use strum::IntoEnumIterator;

use super::*;
use crate::{
    constants::IceIndex,
    error::SnowOpticsError,
    geometry::{local_sza, Slope},
    optics::{compute_alpha, Snow},
    test_utils::{wavelengths_nm, AnalyticConstants},
};

fn assert_all_close(actual: &Array1<f64>, expected: &Array1<f64>) {
    assert_eq!(actual.len(), expected.len());
    for (&a, &e) in actual.iter().zip(expected) {
        assert_relative_eq!(a, e, max_relative = 1e-12);
    }
}

#[test]
fn kz04_total_mixes_direct_and_diffuse() {
    let wavelengths = wavelengths_nm(400., 1100., 15);
    let snow = Snow::new(20.);
    let sza = 45f64.to_radians();

    let alpha = compute_alpha(&AnalyticConstants, wavelengths.view(), &snow).unwrap();
    let expected = alpha.mapv(|a| {
        let direct = (-a.sqrt() * 3.0 / 7.0 * (1.0 + 2.0 * sza.cos())).exp();
        let diffuse = (-a.sqrt()).exp();
        0.9 * direct + 0.1 * diffuse
    });

    let albedo = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.1).unwrap();
    assert_all_close(&albedo, &expected);
}

#[test]
fn flat_albedos_are_bounded() {
    let wavelengths = wavelengths_nm(350., 1400., 50);
    for ssa in [2., 20., 80.] {
        let snow = Snow::new(ssa);
        for sza_deg in [0., 30., 60., 89.] {
            let sza = f64::to_radians(sza_deg);
            for r in [0., 0.3, 1.] {
                let kz04 = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, r)
                    .unwrap();
                let m16 = albedo_m16(&AnalyticConstants, wavelengths.view(), sza, &snow, r)
                    .unwrap();
                for &a in kz04.iter().chain(&m16) {
                    assert!((0.0..=1.0).contains(&a), "albedo {a} out of range");
                }
            }
        }
    }
}

#[test]
fn direct_kz04_rejects_degrees() {
    let wavelengths = wavelengths_nm(400., 1000., 4);
    let result = albedo_direct_kz04(&AnalyticConstants, wavelengths.view(), 60., &Snow::new(20.));
    assert!(matches!(result, Err(SnowOpticsError::NegativeCosine(_))));
}

#[test]
fn flat_models_are_idempotent() {
    let wavelengths = wavelengths_nm(400., 1000., 13);
    let snow = Snow::new(35.);
    let sza = 0.7;
    let first = albedo_m16(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.2).unwrap();
    let second = albedo_m16(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.2).unwrap();
    assert_eq!(first, second);

    let first = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.2).unwrap();
    let second = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.2).unwrap();
    assert_eq!(first, second);
}

#[test]
fn m16_direct_uses_escape_function() {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(15.);
    let sza = 0.9;
    let diffuse = albedo_diffuse_m16(&AnalyticConstants, wavelengths.view(), &snow).unwrap();
    let direct = albedo_direct_m16(&AnalyticConstants, wavelengths.view(), sza, &snow).unwrap();
    // exp(-y G) = exp(-y)^G
    assert_all_close(&direct, &diffuse.mapv(|d| d.powf(g_function(sza))));
}

#[test]
fn extinction_follows_cossalb() {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(20.);
    let alpha = compute_alpha(&AnalyticConstants, wavelengths.view(), &snow).unwrap();
    let ke = extinction_kz04(&AnalyticConstants, wavelengths.view(), 300., &snow).unwrap();
    for (&a, &ke) in alpha.iter().zip(&ke) {
        let cossalb = a * (1.0 - snow.g) * 3.0 / 16.0;
        assert_relative_eq!(
            ke,
            300. * 20. / 2.0 * (3.0 * cossalb * (1.0 - snow.g)).sqrt(),
            max_relative = 1e-12
        );
    }
}

#[test]
fn direct_on_slope_uses_local_sza() {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(20.);
    let (sza, saa) = (0.8, 2.5);
    let slope = Slope::new(0.3, 3.0);
    let on_slope = albedo_direct_kz04_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &snow,
        slope,
    )
    .unwrap();
    let expected = albedo_direct_kz04(
        &AnalyticConstants,
        wavelengths.view(),
        local_sza(sza, saa, slope),
        &snow,
    )
    .unwrap();
    assert_eq!(on_slope, expected);
}

#[test]
fn flat_model_ignores_the_slope() {
    let wavelengths = wavelengths_nm(400., 1000., 13);
    let snow = Snow::new(20.);
    let (sza, saa) = (45f64.to_radians(), 180f64.to_radians());
    let expected = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.1).unwrap();

    for (slope_deg, aspect_deg) in [(0., 0.), (10., 180.), (25., 90.), (30., 0.), (5., 200.)] {
        let slope = Slope::new(f64::to_radians(slope_deg), f64::to_radians(aspect_deg));
        let albedo = albedo_p20_slope(
            &AnalyticConstants,
            wavelengths.view(),
            sza,
            saa,
            &snow,
            0.1,
            slope,
            SlopeModel::Flat,
            &SlopeOptions::default(),
        )
        .unwrap();
        assert_all_close(&albedo, &expected);
    }
}

#[test]
fn all_models_agree_on_flat_terrain() {
    let wavelengths = wavelengths_nm(400., 1000., 13);
    let snow = Snow::new(20.);
    let (sza, saa) = (50f64.to_radians(), 150f64.to_radians());
    let flat = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.3).unwrap();

    for measured_difftot in [false, true] {
        let options = SlopeOptions {
            measured_difftot,
            ..Default::default()
        };
        for model in SlopeModel::iter() {
            let albedo = albedo_p20_slope(
                &AnalyticConstants,
                wavelengths.view(),
                sza,
                saa,
                &snow,
                0.3,
                Slope::new(0., 1.0),
                model,
                &options,
            )
            .unwrap();
            assert_all_close(&albedo, &flat);
        }
    }
}

#[test]
fn small_slope_scales_the_direct_component() {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(20.);
    let (sza, saa) = (45f64.to_radians(), 180f64.to_radians());
    let slope = Slope::new(10f64.to_radians(), 180f64.to_radians());
    let lsza = local_sza(sza, saa, slope);
    let k = lsza.cos() / sza.cos();

    let direct =
        albedo_direct_kz04(&AnalyticConstants, wavelengths.view(), lsza, &snow).unwrap();
    let diffuse = albedo_diffuse_kz04(&AnalyticConstants, wavelengths.view(), &snow).unwrap();
    let expected = 0.9 * k * &direct + 0.1 * &diffuse;

    let albedo = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &snow,
        0.1,
        slope,
        SlopeModel::SmallSlope,
        &SlopeOptions::default(),
    )
    .unwrap();
    assert_all_close(&albedo, &expected);
    // Facing the sun, the slope receives more than the horizontal surface
    assert!(albedo[0] > 1.0);
}

#[test]
fn self_shadowed_slope_is_undefined() {
    let wavelengths = wavelengths_nm(400., 1000., 5);
    let (sza, saa) = (70f64.to_radians(), 180f64.to_radians());
    let slope = Slope::new(40f64.to_radians(), 0.);
    for model in SlopeModel::iter() {
        let albedo = albedo_p20_slope(
            &AnalyticConstants,
            wavelengths.view(),
            sza,
            saa,
            &Snow::new(20.),
            0.2,
            slope,
            model,
            &SlopeOptions::default(),
        )
        .unwrap();
        assert_eq!(albedo.len(), 5);
        assert!(albedo.iter().all(|a| a.is_nan()));
    }
}

#[test]
fn mountain_models_reject_unlit_slopes_with_measured_difftot() {
    let wavelengths = wavelengths_nm(400., 1000., 5);
    // The sun is below the horizon but the facet still sees it, K clamps to 0
    let (sza, saa) = (100f64.to_radians(), 0.);
    let slope = Slope::new(30f64.to_radians(), 0.);
    let measured = SlopeOptions {
        measured_difftot: true,
        fixed_flat_albedo: Some(0.9),
    };

    for model in [SlopeModel::Dm, SlopeModel::Sm] {
        let result = albedo_p20_slope(
            &AnalyticConstants,
            wavelengths.view(),
            sza,
            saa,
            &Snow::new(20.),
            0.5,
            slope,
            model,
            &measured,
        );
        assert!(matches!(result, Err(SnowOpticsError::SelfShadow(_))));
    }

    let derived = SlopeOptions {
        measured_difftot: false,
        fixed_flat_albedo: Some(0.9),
    };
    let v = (1.0 + slope.inclination.cos()) / 2.0;
    let dm = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &Snow::new(20.),
        0.5,
        slope,
        SlopeModel::Dm,
        &derived,
    )
    .unwrap();
    for &a in &dm {
        assert_relative_eq!(a, v * 0.9 / (1.0 + (1.0 - v) * 0.9), max_relative = 1e-12);
    }

    let sm = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &Snow::new(20.),
        0.5,
        slope,
        SlopeModel::Sm,
        &derived,
    )
    .unwrap();
    assert!(sm.iter().all(|&a| a == 0.9));

    let no_diffuse = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &Snow::new(20.),
        0.,
        slope,
        SlopeModel::Dm,
        &derived,
    )
    .unwrap();
    assert!(no_diffuse.iter().all(|a| a.is_nan()));
}

#[test]
fn mountain_model_from_top_of_hill() {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(20.);
    let (sza, saa) = (40f64.to_radians(), 180f64.to_radians());
    let slope = Slope::new(20f64.to_radians(), 160f64.to_radians());
    let r = 0.25;
    let v = (1.0 + slope.inclination.cos()) / 2.0;

    let albedo = |model| {
        albedo_p20_slope(
            &AnalyticConstants,
            wavelengths.view(),
            sza,
            saa,
            &snow,
            r,
            slope,
            model,
            &SlopeOptions::default(),
        )
        .unwrap()
    };

    let top = albedo(SlopeModel::Dt);
    let expected = top.mapv(|t| t / (1.0 - (1.0 - v) * r + (1.0 - v) / v * t));
    assert_all_close(&albedo(SlopeModel::Dm), &expected);
}

#[test]
fn fixed_flat_albedo_replaces_kz04() {
    let wavelengths = wavelengths_nm(400., 1000., 3);
    let options = SlopeOptions {
        measured_difftot: true,
        fixed_flat_albedo: Some(0.8),
    };
    let albedo = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        0.5,
        1.0,
        &Snow::new(20.),
        0.4,
        Slope::new(0.2, 4.0),
        SlopeModel::Flat,
        &options,
    )
    .unwrap();
    assert!(albedo.iter().all(|&a| (a - 0.8).abs() < 1e-15));
}

#[test]
fn zero_fixed_flat_albedo_is_unset() {
    let wavelengths = wavelengths_nm(400., 1000., 5);
    let slope = Slope::new(0.2, 4.0);
    let albedo = |fixed_flat_albedo| {
        let options = SlopeOptions {
            measured_difftot: true,
            fixed_flat_albedo,
        };
        albedo_p20_slope(
            &AnalyticConstants,
            wavelengths.view(),
            0.5,
            1.0,
            &Snow::new(20.),
            0.4,
            slope,
            SlopeModel::St,
            &options,
        )
        .unwrap()
    };
    let modeled = albedo(None);
    assert_eq!(albedo(Some(0.0)), modeled);
    assert!(modeled.iter().all(|&a| a > 0.0));
}

/// Flat albedos on a tilted slope: local direct, direct and diffuse, with the
/// illumination factor K and the sky view factor V.
struct TiltedCase {
    wavelengths: Array1<f64>,
    snow: Snow,
    sza: f64,
    saa: f64,
    slope: Slope,
    r: f64,
    loc: Array1<f64>,
    dir: Array1<f64>,
    diff: Array1<f64>,
    k: f64,
    v: f64,
}

fn tilted_case() -> TiltedCase {
    let wavelengths = wavelengths_nm(400., 1000., 7);
    let snow = Snow::new(20.);
    let (sza, saa) = (50f64.to_radians(), 150f64.to_radians());
    let slope = Slope::new(25f64.to_radians(), 200f64.to_radians());
    let lsza = local_sza(sza, saa, slope);
    let loc = albedo_direct_kz04(&AnalyticConstants, wavelengths.view(), lsza, &snow).unwrap();
    let dir = albedo_direct_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow).unwrap();
    let diff = albedo_diffuse_kz04(&AnalyticConstants, wavelengths.view(), &snow).unwrap();
    TiltedCase {
        wavelengths,
        snow,
        sza,
        saa,
        slope,
        r: 0.3,
        loc,
        dir,
        diff,
        k: lsza.cos() / sza.cos(),
        v: (1.0 + 25f64.to_radians().cos()) / 2.0,
    }
}

impl TiltedCase {
    fn albedo(&self, model: SlopeModel, measured_difftot: bool) -> Array1<f64> {
        let options = SlopeOptions {
            measured_difftot,
            fixed_flat_albedo: None,
        };
        albedo_p20_slope(
            &AnalyticConstants,
            self.wavelengths.view(),
            self.sza,
            self.saa,
            &self.snow,
            self.r,
            self.slope,
            model,
            &options,
        )
        .unwrap()
    }

    /// ST albedo at wavelength `i`.
    fn st(&self, i: usize) -> f64 {
        let (k, v, r) = (self.k, self.v, self.r);
        let (loc, dir, diff) = (self.loc[i], self.dir[i], self.diff[i]);
        let m = (1.0 - v) * diff;
        let adir = ((v + m * (1.0 - v)) * k * loc + (m * v + (1.0 - v)) * dir) / (1.0 - m * m);
        let adiff = v / (1.0 - m) * diff;
        (1.0 - r) * adir + r * adiff
    }
}

#[test]
fn sky_and_terrain_model_on_a_tilted_slope() {
    let case = tilted_case();
    assert!(case.k > 0.0 && case.k != 1.0);

    let st = case.albedo(SlopeModel::St, true);
    for (i, &a) in st.iter().enumerate() {
        assert_relative_eq!(a, case.st(i), max_relative = 1e-12);
    }
    // The top-of-hill variant does not depend on the diffuse fraction origin
    assert_eq!(case.albedo(SlopeModel::St, false), st);
}

#[test]
fn sky_and_mountain_model_on_a_tilted_slope() {
    let case = tilted_case();
    let (k, v, r) = (case.k, case.v, case.r);

    let sm = case.albedo(SlopeModel::Sm, true);
    for (i, &a) in sm.iter().enumerate() {
        let (loc, dir, diff) = (case.loc[i], case.dir[i], case.diff[i]);
        let m = (1.0 - v) * diff;
        let adir = v / (1.0 + m) * k * loc + (1.0 - v) / (1.0 + m) * dir;
        assert_relative_eq!(a, (1.0 - r) * adir + r * diff, max_relative = 1e-12);
    }

    // Diffuse fraction from the top of the hill, coupled with the opposite slope
    let coupled = case.albedo(SlopeModel::Sm, false);
    for (i, &a) in coupled.iter().enumerate() {
        let (loc, dir, diff) = (case.loc[i], case.dir[i], case.diff[i]);
        let m = (1.0 - v) * diff;
        let expected = case.st(i)
            / (1.0
                + (1.0 - v)
                    * ((1.0 - r) * (k * loc + m * dir) / (1.0 - m * m)
                        + r * (v / (1.0 - m) * diff - 1.0)));
        assert_relative_eq!(a, expected, max_relative = 1e-12);
    }
    assert!(coupled
        .iter()
        .zip(&sm)
        .any(|(coupled, measured)| (coupled - measured).abs() > 1e-6));
}

#[test]
fn reference_values_at_800nm() {
    let wavelengths = array![800e-9];
    let snow = Snow::new(20.).with_ice_index(IceIndex::Imaginary(array![1.34e-7]));
    let (sza, saa) = (45f64.to_radians(), 180f64.to_radians());

    let flat = albedo_kz04(&AnalyticConstants, wavelengths.view(), sza, &snow, 0.1).unwrap();
    assert_relative_eq!(flat[0], 0.8905460508683, max_relative = 1e-9);

    let sloped = albedo_p20_slope(
        &AnalyticConstants,
        wavelengths.view(),
        sza,
        saa,
        &snow,
        0.1,
        Slope::new(10f64.to_radians(), 180f64.to_radians()),
        SlopeModel::SmallSlope,
        &SlopeOptions::default(),
    )
    .unwrap();
    assert_relative_eq!(sloped[0], 1.00753124608813, max_relative = 1e-9);
}

#[test]
fn slope_model_names() {
    let names = ["flat", "small_slope", "DT", "DM", "ST", "SM"];
    for (model, name) in SlopeModel::iter().zip(names) {
        assert_eq!(model.name(), name);
        assert_eq!(name.parse::<SlopeModel>().unwrap(), model);
    }
    assert!(matches!(
        "dt".parse::<SlopeModel>(),
        Err(SnowOpticsError::InvalidSlopeModel(name)) if name == "dt"
    ));
    assert!(matches!(
        "valley".parse::<SlopeModel>(),
        Err(SnowOpticsError::InvalidSlopeModel(_))
    ));
}
