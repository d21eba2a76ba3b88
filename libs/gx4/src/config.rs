use serde::{Deserialize, Serialize};

use crate::health::HealthParams;
use crate::transport::{DeclinationSource, HeadingSource};

/// Driver configuration. Defaults mirror the launch parameters the driver
/// has always shipped with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub frame_id: String,
    pub imu_rate_hz: u16,
    pub filter_rate_hz: u16,
    /// Diagnostic aggregation period, seconds.
    pub diagnostic_period: f64,
    pub reference: ReferencePosition,
    pub declination_deg: f64,
    pub declination_source: DeclinationSource,
    pub heading_update_source: HeadingSource,
    pub mounting: MountingOffset,
    /// Signed low-pass bandwidths, Hz; zero or negative disables the
    /// filter for that sensor.
    pub mag_lpf_bandwidth: i32,
    pub accel_lpf_bandwidth: i32,
    pub gyro_lpf_bandwidth: i32,
    pub iron_calibration: IronCalibration,
    pub health: HealthParams,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_id: "imu".to_string(),
            imu_rate_hz: 100,
            filter_rate_hz: 100,
            diagnostic_period: 0.2,
            reference: ReferencePosition::default(),
            declination_deg: 7.01,
            declination_source: DeclinationSource::Manual,
            heading_update_source: HeadingSource::Magnetometer,
            mounting: MountingOffset::default(),
            mag_lpf_bandwidth: 15,
            accel_lpf_bandwidth: 50,
            gyro_lpf_bandwidth: 50,
            iron_calibration: IronCalibration::default(),
            health: HealthParams::default(),
        }
    }
}

/// Geodetic reference pushed to the onboard filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Default for ReferencePosition {
    fn default() -> Self {
        // Columbus, OH
        Self {
            latitude_deg: 39.9984,
            longitude_deg: -83.0179,
            altitude_m: 224.0,
        }
    }
}

/// Sensor-to-vehicle frame rotation, degrees.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountingOffset {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub yaw_deg: f32,
}

/// Magnetometer iron calibration, pushed only when enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IronCalibration {
    pub enabled: bool,
    pub hard_offset: [f32; 3],
    /// Row-major soft-iron compensation matrix.
    pub soft_matrix: [[f32; 3]; 3],
}

impl Default for IronCalibration {
    fn default() -> Self {
        Self {
            enabled: false,
            hard_offset: [0.0; 3],
            soft_matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_launch_parameters() {
        let config = DriverConfig::default();
        assert_eq!(config.frame_id, "imu");
        assert_eq!(config.imu_rate_hz, 100);
        assert_eq!(config.filter_rate_hz, 100);
        approx::assert_relative_eq!(config.declination_deg, 7.01);
        assert_eq!(config.heading_update_source, HeadingSource::Magnetometer);
        assert_eq!(config.declination_source, DeclinationSource::Manual);
        assert!(!config.iron_calibration.enabled);
    }
}
