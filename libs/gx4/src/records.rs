use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use nalgebra::{Matrix3, Vector3};

/// Microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(elapsed.as_micros() as i64)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`; negative when `self` is
    /// the older of the two.
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0) as f64 / 1e6
    }
}

/// Named output channels at the system boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Imu,
    MagneticField,
    Pressure,
    Filter,
    Diagnostics,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::Imu => "imu",
            Channel::MagneticField => "magnetic_field",
            Channel::Pressure => "pressure",
            Channel::Filter => "filter",
            Channel::Diagnostics => "diagnostics",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct OutputImuRecord {
    pub stamp: Timestamp,
    pub frame_id: String,
    /// m/s², scaled from device g-units by standard gravity.
    pub linear_acceleration: Vector3<f64>,
    /// rad/s, device passthrough.
    pub angular_velocity: Vector3<f64>,
    /// Always `None`: attitude goes out on the filter channel, and the
    /// omission is explicit rather than a zeroed quaternion.
    pub orientation: Option<[f64; 4]>,
}

#[derive(Debug, Clone)]
pub struct OutputMagRecord {
    pub stamp: Timestamp,
    pub frame_id: String,
    /// Body-frame field, gauss.
    pub field: Vector3<f64>,
    /// Scalar field strength, retained for display use.
    pub magnitude: f64,
}

#[derive(Debug, Clone)]
pub struct OutputPressureRecord {
    pub stamp: Timestamp,
    pub frame_id: String,
    pub fluid_pressure: f64,
}

#[derive(Debug, Clone)]
pub struct OutputFilterRecord {
    pub stamp: Timestamp,
    pub frame_id: String,
    /// w, x, y, z.
    pub quaternion: [f64; 4],
    pub quaternion_status: u16,
    pub euler_rpy: Vector3<f64>,
    pub euler_rpy_status: u16,
    /// Row-major 3×3; diagonal carries the squared angle uncertainties,
    /// every off-diagonal entry is an exact zero.
    pub euler_angle_covariance: Matrix3<f64>,
    pub euler_angle_covariance_status: u16,
    pub gyro_bias: Vector3<f64>,
    pub gyro_bias_status: u16,
    pub gyro_bias_covariance: Matrix3<f64>,
    pub gyro_bias_covariance_status: u16,
    pub linear_acceleration: Vector3<f64>,
    pub linear_acceleration_status: u16,
    pub angular_velocity: Vector3<f64>,
    pub angular_velocity_status: u16,
    pub heading_update: f64,
    pub heading_update_uncertainty: f64,
    pub heading_update_source: u16,
    pub heading_update_flags: u16,
    /// Independent magnetic heading, radians in [-π, π]. `None` when the
    /// cross-check was skipped for this frame.
    pub heading_update_alt: Option<f64>,
}
