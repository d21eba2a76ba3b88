use nalgebra::{Matrix3, Vector3};

use crate::error::Error;
use crate::frames::{FilterFields, ImuFields, RawFilterFrame, RawImuFrame};
use crate::records::{
    OutputFilterRecord, OutputImuRecord, OutputMagRecord, OutputPressureRecord, Timestamp,
};

/// Standard gravity, m/s² per g.
pub const EARTH_GRAVITY: f64 = 9.80665;

/// Converts raw device frames into engineering-unit records.
///
/// The field masks are the ones pushed to the device at configuration time;
/// every frame delivered afterwards must carry at least those fields, and a
/// frame that doesn't is a protocol contract violation, not missing data.
#[derive(Debug, Clone)]
pub struct UnitTranslator {
    frame_id: String,
    imu_fields: ImuFields,
    filter_fields: FilterFields,
}

impl UnitTranslator {
    pub fn new(
        frame_id: impl Into<String>,
        imu_fields: ImuFields,
        filter_fields: FilterFields,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            imu_fields,
            filter_fields,
        }
    }

    pub fn imu_fields(&self) -> ImuFields {
        self.imu_fields
    }

    pub fn filter_fields(&self) -> FilterFields {
        self.filter_fields
    }

    /// All three records share `stamp` so consumers can correlate them.
    pub fn translate_imu(
        &self,
        frame: &RawImuFrame,
        stamp: Timestamp,
    ) -> Result<(OutputImuRecord, OutputMagRecord, OutputPressureRecord), Error> {
        let missing = self.imu_fields.difference(frame.fields);
        if !missing.is_empty() {
            return Err(Error::ContractViolation {
                frame: "imu",
                missing: format!("{missing:?}"),
            });
        }

        let imu = OutputImuRecord {
            stamp,
            frame_id: self.frame_id.clone(),
            linear_acceleration: Vector3::from(frame.accel.map(f64::from)) * EARTH_GRAVITY,
            angular_velocity: Vector3::from(frame.gyro.map(f64::from)),
            orientation: None,
        };
        let field = Vector3::from(frame.mag.map(f64::from));
        let mag = OutputMagRecord {
            stamp,
            frame_id: self.frame_id.clone(),
            magnitude: field.norm(),
            field,
        };
        let pressure = OutputPressureRecord {
            stamp,
            frame_id: self.frame_id.clone(),
            fluid_pressure: f64::from(frame.pressure),
        };
        Ok((imu, mag, pressure))
    }

    /// The alternate heading is left unset here; the pipeline fills it in
    /// after consulting the magnetic-field cache.
    pub fn translate_filter(
        &self,
        frame: &RawFilterFrame,
        stamp: Timestamp,
    ) -> Result<OutputFilterRecord, Error> {
        let missing = self.filter_fields.difference(frame.fields);
        if !missing.is_empty() {
            return Err(Error::ContractViolation {
                frame: "filter",
                missing: format!("{missing:?}"),
            });
        }

        Ok(OutputFilterRecord {
            stamp,
            frame_id: self.frame_id.clone(),
            quaternion: frame.quaternion.map(f64::from),
            quaternion_status: frame.quaternion_status,
            euler_rpy: Vector3::from(frame.euler_rpy.map(f64::from)),
            euler_rpy_status: frame.euler_rpy_status,
            euler_angle_covariance: diagonal_variance(frame.angle_uncertainty),
            euler_angle_covariance_status: frame.angle_uncertainty_status,
            gyro_bias: Vector3::from(frame.gyro_bias.map(f64::from)),
            gyro_bias_status: frame.gyro_bias_status,
            gyro_bias_covariance: diagonal_variance(frame.bias_uncertainty),
            gyro_bias_covariance_status: frame.bias_uncertainty_status,
            linear_acceleration: Vector3::from(frame.acceleration.map(f64::from)),
            linear_acceleration_status: frame.acceleration_status,
            angular_velocity: Vector3::from(frame.angular_rate.map(f64::from)),
            angular_velocity_status: frame.angular_rate_status,
            heading_update: f64::from(frame.heading_update),
            heading_update_uncertainty: f64::from(frame.heading_update_uncertainty),
            heading_update_source: frame.heading_update_source,
            heading_update_flags: frame.heading_update_flags,
            heading_update_alt: None,
        })
    }
}

/// Squared uncertainties on the diagonal; the six off-diagonal entries are
/// written as exact zeros, which consumers rely on.
fn diagonal_variance(sigma: [f32; 3]) -> Matrix3<f64> {
    let mut m = Matrix3::zeros();
    for (i, s) in sigma.iter().enumerate() {
        m[(i, i)] = f64::from(*s) * f64::from(*s);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> UnitTranslator {
        UnitTranslator::new("imu", ImuFields::all(), FilterFields::all())
    }

    fn imu_frame() -> RawImuFrame {
        RawImuFrame {
            fields: ImuFields::all(),
            accel: [0.1, -0.2, 1.0],
            gyro: [0.01, 0.02, -0.03],
            mag: [0.2, 0.04, 0.45],
            pressure: 98_325.0,
        }
    }

    fn filter_frame() -> RawFilterFrame {
        RawFilterFrame {
            fields: FilterFields::all(),
            quaternion: [1.0, 0.0, 0.0, 0.0],
            quaternion_status: 1,
            euler_rpy: [0.1, -0.05, 1.2],
            euler_rpy_status: 1,
            acceleration: [0.0, 0.1, 9.8],
            acceleration_status: 1,
            angular_rate: [0.01, 0.0, -0.02],
            angular_rate_status: 1,
            gyro_bias: [0.001, -0.002, 0.003],
            gyro_bias_status: 1,
            angle_uncertainty: [0.01, 0.02, 0.03],
            angle_uncertainty_status: 1,
            bias_uncertainty: [0.1, 0.2, 0.3],
            bias_uncertainty_status: 2,
            heading_update: 1.2,
            heading_update_uncertainty: 0.05,
            heading_update_source: 1,
            heading_update_flags: 1,
        }
    }

    #[test]
    fn imu_units_and_shared_stamp() {
        let stamp = Timestamp(42);
        let (imu, mag, pressure) = translator().translate_imu(&imu_frame(), stamp).unwrap();

        assert_eq!(imu.stamp, stamp);
        assert_eq!(mag.stamp, stamp);
        assert_eq!(pressure.stamp, stamp);

        for i in 0..3 {
            approx::assert_relative_eq!(
                imu.linear_acceleration[i],
                f64::from(imu_frame().accel[i]) * EARTH_GRAVITY,
                epsilon = 1e-12
            );
            approx::assert_relative_eq!(
                imu.angular_velocity[i],
                f64::from(imu_frame().gyro[i]),
                epsilon = 1e-12
            );
        }
        assert!(imu.orientation.is_none());
        approx::assert_relative_eq!(mag.magnitude, mag.field.norm());
        approx::assert_relative_eq!(pressure.fluid_pressure, 98_325.0);
    }

    #[test]
    fn missing_imu_field_is_a_contract_violation() {
        let mut frame = imu_frame();
        frame.fields = ImuFields::all().difference(ImuFields::BARO);
        let err = translator().translate_imu(&frame, Timestamp(0)).unwrap_err();
        assert!(matches!(err, Error::ContractViolation { frame: "imu", .. }));
        assert!(!err.is_advisory());
    }

    #[test]
    fn covariance_diagonal_invariant() {
        let record = translator()
            .translate_filter(&filter_frame(), Timestamp(7))
            .unwrap();

        for (i, sigma) in filter_frame().angle_uncertainty.iter().enumerate() {
            approx::assert_relative_eq!(
                record.euler_angle_covariance[(i, i)],
                f64::from(*sigma) * f64::from(*sigma),
                epsilon = 1e-12
            );
        }
        for (i, sigma) in filter_frame().bias_uncertainty.iter().enumerate() {
            approx::assert_relative_eq!(
                record.gyro_bias_covariance[(i, i)],
                f64::from(*sigma) * f64::from(*sigma),
                epsilon = 1e-12
            );
        }
        for r in 0..3 {
            for c in 0..3 {
                if r != c {
                    assert_eq!(record.euler_angle_covariance[(r, c)], 0.0);
                    assert_eq!(record.gyro_bias_covariance[(r, c)], 0.0);
                }
            }
        }
    }

    #[test]
    fn filter_statuses_pass_through() {
        let record = translator()
            .translate_filter(&filter_frame(), Timestamp(7))
            .unwrap();
        assert_eq!(record.quaternion_status, 1);
        assert_eq!(record.bias_uncertainty_status, 2);
        assert_eq!(record.heading_update_source, 1);
        assert!(record.heading_update_alt.is_none());
    }

    #[test]
    fn missing_bias_field_is_a_contract_violation() {
        let mut frame = filter_frame();
        frame.fields = FilterFields::all().difference(FilterFields::BIAS);
        let err = translator()
            .translate_filter(&frame, Timestamp(0))
            .unwrap_err();
        assert!(matches!(err, Error::ContractViolation { frame: "filter", .. }));
    }
}
