use bitflags::bitflags;

bitflags! {
    /// Fields the device packs into one raw IMU frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImuFields: u16 {
        const ACCEL = 1 << 0;
        const GYRO = 1 << 1;
        const MAG = 1 << 2;
        const BARO = 1 << 3;
    }
}

bitflags! {
    /// Fields the device packs into one raw estimation-filter frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FilterFields: u16 {
        const QUATERNION = 1 << 0;
        const EULER = 1 << 1;
        const HEADING_UPDATE = 1 << 2;
        const ACCELERATION = 1 << 3;
        const ANGULAR_RATE = 1 << 4;
        const BIAS = 1 << 5;
        const ANGLE_UNCERTAINTY = 1 << 6;
        const BIAS_UNCERTAINTY = 1 << 7;
    }
}

/// One IMU telemetry frame in device units, owned by the callback that
/// receives it.
#[derive(Debug, Clone, Copy)]
pub struct RawImuFrame {
    pub fields: ImuFields,
    /// g
    pub accel: [f32; 3],
    /// rad/s
    pub gyro: [f32; 3],
    /// gauss
    pub mag: [f32; 3],
    pub pressure: f32,
}

/// One estimation-filter frame: per-field raw values plus the device's
/// per-field validity code.
#[derive(Debug, Clone, Copy)]
pub struct RawFilterFrame {
    pub fields: FilterFields,
    /// w, x, y, z.
    pub quaternion: [f32; 4],
    pub quaternion_status: u16,
    /// rad
    pub euler_rpy: [f32; 3],
    pub euler_rpy_status: u16,
    pub acceleration: [f32; 3],
    pub acceleration_status: u16,
    pub angular_rate: [f32; 3],
    pub angular_rate_status: u16,
    pub gyro_bias: [f32; 3],
    pub gyro_bias_status: u16,
    /// 1-sigma Euler angle uncertainty, rad.
    pub angle_uncertainty: [f32; 3],
    pub angle_uncertainty_status: u16,
    /// 1-sigma gyro bias uncertainty, rad/s.
    pub bias_uncertainty: [f32; 3],
    pub bias_uncertainty_status: u16,
    pub heading_update: f32,
    pub heading_update_uncertainty: f32,
    pub heading_update_source: u16,
    pub heading_update_flags: u16,
}

/// Static identity the device reports once at setup.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub firmware_version: String,
    pub model_name: String,
    pub model_number: String,
    pub serial_number: String,
    pub lot_number: String,
    pub device_options: String,
}

impl DeviceInfo {
    pub fn hardware_id(&self) -> String {
        format!("{}-{}", self.model_name, self.model_number)
    }

    pub fn to_map(&self) -> Vec<(&'static str, String)> {
        vec![
            ("firmware_version", self.firmware_version.clone()),
            ("model_name", self.model_name.clone()),
            ("model_number", self.model_number.clone()),
            ("serial_number", self.serial_number.clone()),
            ("lot_number", self.lot_number.clone()),
            ("device_options", self.device_options.clone()),
        ]
    }
}

/// Live self-diagnostic counters read back from the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticCounters {
    pub imu_stream_enabled: u32,
    pub filter_stream_enabled: u32,
    pub imu_packets_dropped: u32,
    pub filter_packets_dropped: u32,
    pub com_bytes_read: u32,
    pub com_bytes_written: u32,
    pub com_num_read_overruns: u32,
    pub num_imu_parse_errors: u32,
    pub total_imu_messages: u32,
    pub last_imu_message: u32,
}

impl DiagnosticCounters {
    pub fn to_map(&self) -> Vec<(&'static str, u32)> {
        vec![
            ("imu_stream_enabled", self.imu_stream_enabled),
            ("filter_stream_enabled", self.filter_stream_enabled),
            ("imu_packets_dropped", self.imu_packets_dropped),
            ("filter_packets_dropped", self.filter_packets_dropped),
            ("com_bytes_read", self.com_bytes_read),
            ("com_bytes_written", self.com_bytes_written),
            ("com_num_read_overruns", self.com_num_read_overruns),
            ("num_imu_parse_errors", self.num_imu_parse_errors),
            ("total_imu_messages", self.total_imu_messages),
            ("last_imu_message", self.last_imu_message),
        ]
    }
}
