use std::time::{Duration, Instant};

use nalgebra::{Matrix3, Vector3};

use gx4::error::Error;
use gx4::frames::{
    DeviceInfo, DiagnosticCounters, FilterFields, ImuFields, RawFilterFrame, RawImuFrame,
};
use gx4::transport::{
    DeclinationSource, DeviceTransport, FrameListener, HeadingSource, LowPassFilter, LpfChannel,
};

/// Internal clock of the simulated device.
const MASTER_HZ: u16 = 1000;
/// Simulated turntable spin, rad/s.
const YAW_RATE: f32 = 0.1;
/// Local magnetic field, gauss.
const FIELD_HORIZONTAL: f32 = 0.19;
const FIELD_VERTICAL: f32 = 0.43;

/// Bench device: a slow turntable spin under a fixed local magnetic field,
/// streamed at whatever decimations the session negotiates. One master
/// tick per pump, so wall-clock rates come out close to nominal.
pub struct SimTransport {
    imu_base: u16,
    filter_base: u16,
    imu_decimation: u16,
    filter_decimation: u16,
    imu_stream: bool,
    filter_stream: bool,
    streaming: bool,
    tick: u64,
    /// Absolute schedule for the next master tick, so sleep overshoot does
    /// not accumulate into rate drift.
    next_tick: Option<Instant>,
    counters: DiagnosticCounters,
}

impl SimTransport {
    pub fn new() -> Self {
        Self {
            imu_base: MASTER_HZ,
            filter_base: MASTER_HZ / 2,
            imu_decimation: 1,
            filter_decimation: 1,
            imu_stream: false,
            filter_stream: false,
            streaming: false,
            tick: 0,
            next_tick: None,
            counters: DiagnosticCounters::default(),
        }
    }

    fn seconds(&self) -> f32 {
        self.tick as f32 / f32::from(MASTER_HZ)
    }

    fn imu_frame(&self) -> RawImuFrame {
        let t = self.seconds();
        let yaw = YAW_RATE * t;
        RawImuFrame {
            fields: ImuFields::all(),
            accel: [0.002 * (0.7 * t).sin(), 0.002 * (0.9 * t).cos(), 1.0],
            gyro: [0.0, 0.0, YAW_RATE],
            mag: [
                FIELD_HORIZONTAL * yaw.cos(),
                -FIELD_HORIZONTAL * yaw.sin(),
                FIELD_VERTICAL,
            ],
            pressure: 98_325.0 + 2.0 * (0.2 * t).sin(),
        }
    }

    fn filter_frame(&self) -> RawFilterFrame {
        let yaw = YAW_RATE * self.seconds();
        RawFilterFrame {
            fields: FilterFields::all(),
            quaternion: [(yaw / 2.0).cos(), 0.0, 0.0, (yaw / 2.0).sin()],
            quaternion_status: 1,
            euler_rpy: [0.0, 0.0, yaw],
            euler_rpy_status: 1,
            acceleration: [0.0, 0.0, 9.80665],
            acceleration_status: 1,
            angular_rate: [0.0, 0.0, YAW_RATE],
            angular_rate_status: 1,
            gyro_bias: [1.2e-4, -0.8e-4, 0.5e-4],
            gyro_bias_status: 1,
            angle_uncertainty: [0.004, 0.004, 0.012],
            angle_uncertainty_status: 1,
            bias_uncertainty: [2.0e-5, 2.0e-5, 2.0e-5],
            bias_uncertainty_status: 1,
            heading_update: yaw,
            heading_update_uncertainty: 0.015,
            heading_update_source: 1,
            heading_update_flags: 1,
        }
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTransport for SimTransport {
    fn connect(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        self.streaming = false;
        Ok(())
    }

    fn idle(&mut self) -> Result<(), Error> {
        self.streaming = false;
        Ok(())
    }

    fn device_info(&mut self) -> Result<DeviceInfo, Error> {
        Ok(DeviceInfo {
            firmware_version: "sim".into(),
            model_name: "3DM-GX4-25".into(),
            model_number: "sim-0".into(),
            serial_number: "0000-0000".into(),
            lot_number: "0".into(),
            device_options: "sim".into(),
        })
    }

    fn imu_base_rate(&mut self) -> Result<u16, Error> {
        Ok(self.imu_base)
    }

    fn filter_base_rate(&mut self) -> Result<u16, Error> {
        Ok(self.filter_base)
    }

    fn set_imu_data_rate(&mut self, decimation: u16, _fields: ImuFields) -> Result<(), Error> {
        self.imu_decimation = decimation.max(1);
        Ok(())
    }

    fn set_filter_data_rate(
        &mut self,
        decimation: u16,
        _fields: FilterFields,
    ) -> Result<(), Error> {
        self.filter_decimation = decimation.max(1);
        Ok(())
    }

    fn enable_imu_stream(&mut self, enabled: bool) -> Result<(), Error> {
        self.imu_stream = enabled;
        Ok(())
    }

    fn enable_filter_stream(&mut self, enabled: bool) -> Result<(), Error> {
        self.filter_stream = enabled;
        Ok(())
    }

    fn enable_measurement_updates(&mut self, _accel: bool, _mag: bool) -> Result<(), Error> {
        Ok(())
    }

    fn enable_bias_estimation(&mut self, _enabled: bool) -> Result<(), Error> {
        Ok(())
    }

    fn set_sensor_to_vehicle_transform(
        &mut self,
        _roll_rad: f32,
        _pitch_rad: f32,
        _yaw_rad: f32,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn set_reference_position(
        &mut self,
        _lat_deg: f64,
        _lon_deg: f64,
        _alt_m: f64,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn set_heading_update_source(&mut self, _source: HeadingSource) -> Result<(), Error> {
        Ok(())
    }

    fn set_declination_source(
        &mut self,
        _source: DeclinationSource,
        _manual_rad: f64,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn set_lpf_bandwidth(
        &mut self,
        _channel: LpfChannel,
        _filter: LowPassFilter,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn set_hard_iron_offset(&mut self, _offset: Vector3<f32>) -> Result<(), Error> {
        Ok(())
    }

    fn set_soft_iron_matrix(&mut self, _matrix: Matrix3<f32>) -> Result<(), Error> {
        Ok(())
    }

    fn resume(&mut self) -> Result<(), Error> {
        self.streaming = true;
        self.next_tick = None;
        Ok(())
    }

    fn pump(&mut self, listener: &mut dyn FrameListener) -> Result<usize, Error> {
        if !self.streaming {
            return Ok(0);
        }
        let period = Duration::from_secs_f64(1.0 / f64::from(MASTER_HZ));
        let target = self.next_tick.get_or_insert_with(Instant::now);
        let now = Instant::now();
        if *target > now {
            std::thread::sleep(*target - now);
        }
        *target += period;
        self.tick += 1;
        let mut dispatched = 0;

        let imu_stride = u64::from(MASTER_HZ / self.imu_base) * u64::from(self.imu_decimation);
        if self.imu_stream && self.tick % imu_stride == 0 {
            let frame = self.imu_frame();
            listener.on_imu_frame(&frame)?;
            self.counters.total_imu_messages = self.counters.total_imu_messages.wrapping_add(1);
            self.counters.com_bytes_read = self.counters.com_bytes_read.wrapping_add(44);
            dispatched += 1;
        }

        let filter_stride =
            u64::from(MASTER_HZ / self.filter_base) * u64::from(self.filter_decimation);
        if self.filter_stream && self.tick % filter_stride == 0 {
            let frame = self.filter_frame();
            listener.on_filter_frame(&frame)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn query_diagnostics(&mut self) -> Result<DiagnosticCounters, Error> {
        Ok(DiagnosticCounters {
            imu_stream_enabled: u32::from(self.imu_stream),
            filter_stream_enabled: u32::from(self.filter_stream),
            last_imu_message: self.tick as u32,
            ..self.counters
        })
    }
}
