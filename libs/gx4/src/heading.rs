use nalgebra::Vector3;
use tracing::warn;

use crate::error::Error;

/// Independent magnetic heading from the body-frame field and the filter's
/// Euler attitude, wrapped to [-π, π].
///
/// The pitch negation and the -180° roll shift compensate a frame
/// convention mismatch in the device filter's Euler output. They are
/// empirical and load-bearing; do not re-derive the trigonometry.
pub fn cross_check(
    mag_body: Vector3<f64>,
    roll_rad: f64,
    pitch_rad: f64,
    declination_rad: f64,
) -> Result<f64, Error> {
    let norm = mag_body.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::DegenerateVector);
    }
    let m = mag_body / norm;

    let pitch = (-pitch_rad.to_degrees()).to_radians();
    let mut roll = roll_rad.to_degrees() - 180.0;
    if roll > 180.0 {
        roll -= 360.0;
    } else if roll < -180.0 {
        roll += 360.0;
    }
    let roll = roll.to_radians();

    let world_x =
        m.x * pitch.cos() + m.y * roll.sin() * pitch.sin() + m.z * pitch.sin() * roll.cos();
    let world_y = m.y * roll.cos() - m.z * roll.sin();

    let heading = (world_y.atan2(world_x) + declination_rad).to_degrees();
    Ok(wrap_degrees(heading).to_radians())
}

fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Cross-callback cache: the heading check for a filter frame uses the most
/// recently seen IMU magnetic field, since the two streams arrive on
/// independent schedules. No sample yet means no alternate heading.
#[derive(Debug, Clone, Default)]
pub struct HeadingCrossCheck {
    declination_rad: f64,
    last_mag: Option<Vector3<f64>>,
}

impl HeadingCrossCheck {
    pub fn new(declination_rad: f64) -> Self {
        Self {
            declination_rad,
            last_mag: None,
        }
    }

    pub fn observe_mag(&mut self, field: Vector3<f64>) {
        self.last_mag = Some(field);
    }

    /// `None` when no magnetic sample has arrived yet or the cached field
    /// is degenerate; the filter's own heading update stands alone then.
    pub fn heading(&self, roll_rad: f64, pitch_rad: f64) -> Option<f64> {
        let mag = self.last_mag?;
        match cross_check(mag, roll_rad, pitch_rad, self.declination_rad) {
            Ok(heading) => Some(heading),
            Err(err) => {
                warn!(%err, "skipping alternate heading");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    #[test]
    fn level_north_field_reads_zero() {
        let heading = cross_check(Vector3::new(1.0, 0.0, 0.0), 0.0, 0.0, 0.0).unwrap();
        approx::assert_abs_diff_eq!(heading, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn declination_shifts_the_heading() {
        let decl = 7.01f64.to_radians();
        let heading = cross_check(Vector3::new(1.0, 0.0, 0.0), 0.0, 0.0, decl).unwrap();
        approx::assert_abs_diff_eq!(heading, decl, epsilon = 1e-9);
    }

    #[test]
    fn output_always_wraps_into_pi_range() {
        let mag = Vector3::new(0.2, 0.04, 0.45);
        for i in -6..=6 {
            for j in -6..=6 {
                for k in -8..=8 {
                    let roll = i as f64 * PI / 6.0;
                    let pitch = j as f64 * PI / 6.0;
                    let decl = k as f64 * 0.9;
                    let heading = cross_check(mag, roll, pitch, decl).unwrap();
                    assert!(heading >= -PI && heading <= PI, "heading {heading}");
                    assert!(heading.is_finite());
                }
            }
        }
    }

    #[test]
    fn zero_and_nan_fields_are_degenerate() {
        assert!(matches!(
            cross_check(Vector3::zeros(), 0.0, 0.0, 0.0),
            Err(Error::DegenerateVector)
        ));
        assert!(matches!(
            cross_check(Vector3::new(f64::NAN, 0.0, 0.0), 0.0, 0.0, 0.0),
            Err(Error::DegenerateVector)
        ));
    }

    #[test]
    fn cache_skips_until_first_sample() {
        let mut check = HeadingCrossCheck::new(0.0);
        assert!(check.heading(0.0, 0.0).is_none());

        check.observe_mag(Vector3::new(1.0, 0.0, 0.0));
        let heading = check.heading(0.0, 0.0).unwrap();
        approx::assert_abs_diff_eq!(heading, 0.0, epsilon = 1e-9);

        check.observe_mag(Vector3::zeros());
        assert!(check.heading(0.0, 0.0).is_none());
    }
}
