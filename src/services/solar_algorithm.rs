/// ============================================================
///  Solar Geometry Feature Estimation
///
///  Algorithm pipeline:
///   1. Time decomposition – fractional year from UTC instant
///   2. Solar geometry     – declination and equation of time
///                           (Spencer 1971), true solar time,
///                           hour angle, zenith, azimuth
///   3. Panel geometry     – angle of incidence on the tilted,
///                           oriented panel surface
///   4. Horizon averaging  – hourly samples from "now" forward,
///                           arithmetic mean of AOI/zenith/azimuth
/// ============================================================

use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use std::f64::consts::PI;

use crate::models::prediction::{Location, PanelConfig, SolarFeatureRecord};

/// Number of hourly samples averaged into the solar features.
pub const HORIZON_HOURS: usize = 24;

// ─── Public output ───────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Geometric zenith angle, no refraction (deg)
    pub zenith_deg: f64,
    /// Clockwise from north, [0, 360) (deg)
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SolarSample {
    pub time: DateTime<Tz>,
    pub position: SolarPosition,
    pub aoi_deg: f64,
}

/// Sun position seen from (`lat_deg`, `lon_deg`) at `utc`.
pub fn solar_position(lat_deg: f64, lon_deg: f64, utc: DateTime<Utc>) -> SolarPosition {
    // ── 1. Time decomposition ──────────────────────────────────
    let doy = utc.ordinal() as f64;
    let ut_h = utc.hour() as f64
        + utc.minute() as f64 / 60.0
        + utc.second() as f64 / 3600.0;
    let year = utc.year();
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days_in_year = if leap { 366.0 } else { 365.0 };
    let b = 2.0 * PI / days_in_year * (doy - 1.0 + (ut_h - 12.0) / 24.0);

    // ── 2. Solar geometry ──────────────────────────────────────
    // a) Declination (Spencer 1971, radians)
    let decl = 0.006918
        - 0.399912 * b.cos()
        + 0.070257 * b.sin()
        - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin();

    // b) Equation of Time (minutes, Spencer 1971)
    let eot_min = 229.18
        * (0.000075
            + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    // c) True solar time straight from UTC, independent of civil zone
    let tst_min = ut_h * 60.0 + 4.0 * lon_deg + eot_min;

    // d) Hour angle (negative in morning, positive afternoon)
    let omega = (tst_min / 4.0 - 180.0).to_radians();

    // e) Zenith
    let lat = lat_deg.to_radians();
    let cos_zen = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let zenith_deg = cos_zen.acos().to_degrees();

    // f) Azimuth, N=0° clockwise; atan2 form stays defined at the poles
    let az = omega
        .sin()
        .atan2(omega.cos() * lat.sin() - decl.tan() * lat.cos())
        .to_degrees()
        + 180.0;
    let azimuth_deg = az.rem_euclid(360.0);

    SolarPosition { zenith_deg, azimuth_deg }
}

/// Angle between the sun vector and the panel normal (deg).
///
/// The cosine is clipped to [-1, 1]; a sun below the horizon still yields a
/// number (>90° means the sun is behind the panel plane).
pub fn angle_of_incidence(
    zenith_deg: f64,
    solar_azimuth_deg: f64,
    panel_tilt_deg: f64,
    panel_azimuth_deg: f64,
) -> f64 {
    let zen = zenith_deg.to_radians();
    let tilt = panel_tilt_deg.to_radians();
    let az_diff = (solar_azimuth_deg - panel_azimuth_deg).to_radians();

    let cos_aoi = zen.cos() * tilt.cos() + zen.sin() * tilt.sin() * az_diff.cos();
    cos_aoi.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Hourly samples starting at `start`, stamped in the location's zone.
pub fn hourly_series(
    location: &Location,
    tz: Tz,
    panel: &PanelConfig,
    start: DateTime<Utc>,
    periods: usize,
) -> Vec<SolarSample> {
    (0..periods)
        .map(|i| {
            let utc = start + TimeDelta::hours(i as i64);
            let position = solar_position(location.latitude, location.longitude, utc);
            let aoi_deg = angle_of_incidence(
                position.zenith_deg,
                position.azimuth_deg,
                panel.tilt_degrees,
                panel.azimuth_degrees,
            );
            SolarSample { time: utc.with_timezone(&tz), position, aoi_deg }
        })
        .collect()
}

/// Mean AOI, zenith and azimuth over the next `HORIZON_HOURS` hours from `start`.
pub fn estimate(
    location: &Location,
    tz: Tz,
    panel: &PanelConfig,
    start: DateTime<Utc>,
) -> SolarFeatureRecord {
    let samples = hourly_series(location, tz, panel, start, HORIZON_HOURS);
    let n = samples.len() as f64;

    let (aoi, zen, az) = samples.iter().fold((0.0, 0.0, 0.0), |(a, z, s), x| {
        (a + x.aoi_deg, z + x.position.zenith_deg, s + x.position.azimuth_deg)
    });

    let record = SolarFeatureRecord {
        angle_of_incidence: aoi / n,
        zenith: zen / n,
        azimuth: az / n,
    };

    if cfg!(feature = "verbose_log") {
        for s in &samples {
            tracing::debug!(
                time = %s.time,
                zenith = s.position.zenith_deg,
                azimuth = s.position.azimuth_deg,
                aoi = s.aoi_deg,
                "solar sample"
            );
        }
    }

    record
}
