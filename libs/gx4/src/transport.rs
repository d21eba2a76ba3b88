use nalgebra::{Matrix3, Vector3};

use crate::error::Error;
use crate::frames::{
    DeviceInfo, DiagnosticCounters, FilterFields, ImuFields, RawFilterFrame, RawImuFrame,
};

/// Receives raw frames dispatched by [`DeviceTransport::pump`].
///
/// Callbacks run to completion on the pump's thread before the next frame
/// is dispatched; an error from a callback aborts the pump and unwinds to
/// the run loop.
pub trait FrameListener {
    fn on_imu_frame(&mut self, frame: &RawImuFrame) -> Result<(), Error>;
    fn on_filter_frame(&mut self, frame: &RawFilterFrame) -> Result<(), Error>;
}

/// Heading-update source for the device's onboard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadingSource {
    None,
    Magnetometer,
    External,
}

/// Where the onboard filter takes magnetic declination from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclinationSource {
    None,
    /// World magnetic model, computed on the device from the reference
    /// position.
    Wmm,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LpfChannel {
    Accel,
    Gyro,
    Mag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpfKind {
    Disabled,
    Iir,
}

/// Whether the device picks the cutoff itself or takes ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpfMode {
    Auto,
    Manual,
}

/// One sensor channel's low-pass filter setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowPassFilter {
    pub kind: LpfKind,
    pub mode: LpfMode,
    pub cutoff_hz: u16,
}

impl LowPassFilter {
    /// Signed-bandwidth convention: positive selects an IIR filter at that
    /// cutoff, zero or negative disables filtering. The magnitude is
    /// forwarded either way, always in manual mode.
    pub fn from_bandwidth(bandwidth_hz: i32) -> Self {
        Self {
            kind: if bandwidth_hz > 0 {
                LpfKind::Iir
            } else {
                LpfKind::Disabled
            },
            mode: LpfMode::Manual,
            cutoff_hz: bandwidth_hz.unsigned_abs().min(u32::from(u16::MAX)) as u16,
        }
    }
}

/// Command surface of the device link. Serial framing, checksums, and
/// retries all live behind this seam.
pub trait DeviceTransport {
    fn connect(&mut self) -> Result<(), Error>;
    fn disconnect(&mut self) -> Result<(), Error>;
    /// Stop streaming so configuration commands can be issued.
    fn idle(&mut self) -> Result<(), Error>;
    fn device_info(&mut self) -> Result<DeviceInfo, Error>;
    fn imu_base_rate(&mut self) -> Result<u16, Error>;
    fn filter_base_rate(&mut self) -> Result<u16, Error>;
    fn set_imu_data_rate(&mut self, decimation: u16, fields: ImuFields) -> Result<(), Error>;
    fn set_filter_data_rate(&mut self, decimation: u16, fields: FilterFields)
    -> Result<(), Error>;
    fn enable_imu_stream(&mut self, enabled: bool) -> Result<(), Error>;
    fn enable_filter_stream(&mut self, enabled: bool) -> Result<(), Error>;
    /// Accelerometer / magnetometer measurement updates in the onboard
    /// filter.
    fn enable_measurement_updates(&mut self, accel: bool, mag: bool) -> Result<(), Error>;
    fn enable_bias_estimation(&mut self, enabled: bool) -> Result<(), Error>;
    fn set_sensor_to_vehicle_transform(
        &mut self,
        roll_rad: f32,
        pitch_rad: f32,
        yaw_rad: f32,
    ) -> Result<(), Error>;
    fn set_reference_position(&mut self, lat_deg: f64, lon_deg: f64, alt_m: f64)
    -> Result<(), Error>;
    fn set_heading_update_source(&mut self, source: HeadingSource) -> Result<(), Error>;
    fn set_declination_source(
        &mut self,
        source: DeclinationSource,
        manual_rad: f64,
    ) -> Result<(), Error>;
    fn set_lpf_bandwidth(&mut self, channel: LpfChannel, filter: LowPassFilter)
    -> Result<(), Error>;
    fn set_hard_iron_offset(&mut self, offset: Vector3<f32>) -> Result<(), Error>;
    fn set_soft_iron_matrix(&mut self, matrix: Matrix3<f32>) -> Result<(), Error>;
    /// Resume streaming after configuration.
    fn resume(&mut self) -> Result<(), Error>;
    /// Drain buffered frames, dispatching each through the listener in
    /// arrival order. Zero frames is a normal outcome.
    fn pump(&mut self, listener: &mut dyn FrameListener) -> Result<usize, Error>;
    /// Live self-diagnostic counters. Failure here is advisory.
    fn query_diagnostics(&mut self) -> Result<DiagnosticCounters, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lpf_sign_convention() {
        let lpf = LowPassFilter::from_bandwidth(15);
        assert_eq!(lpf.kind, LpfKind::Iir);
        assert_eq!(lpf.mode, LpfMode::Manual);
        assert_eq!(lpf.cutoff_hz, 15);

        let lpf = LowPassFilter::from_bandwidth(-50);
        assert_eq!(lpf.kind, LpfKind::Disabled);
        assert_eq!(lpf.cutoff_hz, 50);

        let lpf = LowPassFilter::from_bandwidth(0);
        assert_eq!(lpf.kind, LpfKind::Disabled);
        assert_eq!(lpf.cutoff_hz, 0);
    }
}
