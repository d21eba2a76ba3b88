use std::time::{Duration, Instant};

use nalgebra::{Matrix3, Vector3};
use tracing::{error, info, warn};

use crate::config::DriverConfig;
use crate::error::Error;
use crate::frames::{FilterFields, ImuFields, RawFilterFrame, RawImuFrame};
use crate::heading::HeadingCrossCheck;
use crate::health::{HealthMonitor, Level};
use crate::publish::{ChannelPublisher, Record};
use crate::rate::{self, DecimationPlan};
use crate::records::{Channel, Timestamp};
use crate::transport::{DeviceTransport, FrameListener, LowPassFilter, LpfChannel};
use crate::translate::UnitTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Idle,
    Configured,
    Streaming,
    Error,
}

/// Synchronous per-frame path: translate, cross-check, publish, health
/// tick, in that order.
pub struct Pipeline<P> {
    translator: UnitTranslator,
    heading: HeadingCrossCheck,
    publisher: P,
    health: HealthMonitor,
}

impl<P: ChannelPublisher> Pipeline<P> {
    pub fn new(
        translator: UnitTranslator,
        heading: HeadingCrossCheck,
        publisher: P,
        health: HealthMonitor,
    ) -> Self {
        Self {
            translator,
            heading,
            publisher,
            health,
        }
    }
}

impl<P: ChannelPublisher> FrameListener for Pipeline<P> {
    fn on_imu_frame(&mut self, frame: &RawImuFrame) -> Result<(), Error> {
        let stamp = Timestamp::now();
        let (imu, mag, pressure) = self.translator.translate_imu(frame, stamp)?;
        self.heading.observe_mag(mag.field);
        self.publisher.publish(Channel::Imu, Record::Imu(imu));
        self.publisher
            .publish(Channel::MagneticField, Record::MagneticField(mag));
        self.publisher
            .publish(Channel::Pressure, Record::Pressure(pressure));
        self.health.on_tick(Channel::Imu, stamp, Timestamp::now());
        Ok(())
    }

    fn on_filter_frame(&mut self, frame: &RawFilterFrame) -> Result<(), Error> {
        let stamp = Timestamp::now();
        let mut record = self.translator.translate_filter(frame, stamp)?;
        record.heading_update_alt = self
            .heading
            .heading(f64::from(frame.euler_rpy[0]), f64::from(frame.euler_rpy[1]));
        self.publisher.publish(Channel::Filter, Record::Filter(record));
        self.health.on_tick(Channel::Filter, stamp, Timestamp::now());
        Ok(())
    }
}

/// Owns the transport, the pipeline, and the session lifecycle:
/// `Disconnected → Connected → Idle → Configured → Streaming`, with any
/// fatal error reported, followed by an orderly disconnect. No
/// auto-reconnect.
pub struct Session<T, P> {
    transport: T,
    pipeline: Pipeline<P>,
    config: DriverConfig,
    state: SessionState,
    imu_plan: Option<DecimationPlan>,
    filter_plan: Option<DecimationPlan>,
}

impl<T: DeviceTransport, P: ChannelPublisher> Session<T, P> {
    pub fn new(transport: T, publisher: P, config: DriverConfig) -> Self {
        let pipeline = Pipeline::new(
            UnitTranslator::new(config.frame_id.clone(), ImuFields::all(), FilterFields::all()),
            HeadingCrossCheck::new(config.declination_deg.to_radians()),
            publisher,
            HealthMonitor::new(config.health.clone()),
        );
        Self {
            transport,
            pipeline,
            config,
            state: SessionState::Disconnected,
            imu_plan: None,
            filter_plan: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn imu_plan(&self) -> Option<&DecimationPlan> {
        self.imu_plan.as_ref()
    }

    pub fn filter_plan(&self) -> Option<&DecimationPlan> {
        self.filter_plan.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn publisher(&self) -> &P {
        &self.pipeline.publisher
    }

    pub fn connect(&mut self) -> Result<(), Error> {
        info!("connecting to device");
        self.transport.connect()?;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Bring the device to idle, negotiate rates, and push the full
    /// configuration. Fails before any streaming begins.
    pub fn configure(&mut self) -> Result<(), Error> {
        let info = self.transport.device_info()?;
        for (key, value) in info.to_map() {
            info!("{key}: {value}");
        }
        self.pipeline.health.set_device_info(info);

        info!("idling the device");
        self.transport.idle()?;
        self.state = SessionState::Idle;

        let imu_base = self.transport.imu_base_rate()?;
        info!(imu_base, "imu data base rate");
        let filter_base = self.transport.filter_base_rate()?;
        info!(filter_base, "filter data base rate");

        let imu_plan = rate::negotiate(self.config.imu_rate_hz, imu_base)?;
        let filter_plan = rate::negotiate(self.config.filter_rate_hz, filter_base)?;
        info!(
            decimation = imu_plan.decimation,
            actual_hz = imu_plan.actual_hz,
            "selecting imu decimation"
        );
        self.transport
            .set_imu_data_rate(imu_plan.decimation, self.pipeline.translator.imu_fields())?;
        info!(
            decimation = filter_plan.decimation,
            actual_hz = filter_plan.actual_hz,
            "selecting filter decimation"
        );
        self.transport.set_filter_data_rate(
            filter_plan.decimation,
            self.pipeline.translator.filter_fields(),
        )?;

        info!("enabling data streams");
        self.transport.enable_imu_stream(true)?;
        self.transport.enable_filter_stream(true)?;
        self.transport.enable_measurement_updates(true, true)?;
        self.transport.enable_bias_estimation(true)?;

        let mounting = self.config.mounting;
        info!(
            roll = mounting.roll_deg,
            pitch = mounting.pitch_deg,
            yaw = mounting.yaw_deg,
            "sensor to vehicle transform"
        );
        self.transport.set_sensor_to_vehicle_transform(
            mounting.roll_deg.to_radians(),
            mounting.pitch_deg.to_radians(),
            mounting.yaw_deg.to_radians(),
        )?;

        let reference = self.config.reference;
        info!(
            latitude = reference.latitude_deg,
            longitude = reference.longitude_deg,
            altitude = reference.altitude_m,
            "reference position"
        );
        self.transport.set_reference_position(
            reference.latitude_deg,
            reference.longitude_deg,
            reference.altitude_m,
        )?;

        self.transport
            .set_heading_update_source(self.config.heading_update_source)?;
        self.transport.set_declination_source(
            self.config.declination_source,
            self.config.declination_deg.to_radians(),
        )?;

        self.transport.set_lpf_bandwidth(
            LpfChannel::Mag,
            LowPassFilter::from_bandwidth(self.config.mag_lpf_bandwidth),
        )?;
        self.transport.set_lpf_bandwidth(
            LpfChannel::Accel,
            LowPassFilter::from_bandwidth(self.config.accel_lpf_bandwidth),
        )?;
        self.transport.set_lpf_bandwidth(
            LpfChannel::Gyro,
            LowPassFilter::from_bandwidth(self.config.gyro_lpf_bandwidth),
        )?;

        let iron = &self.config.iron_calibration;
        if iron.enabled {
            info!("pushing iron calibration");
            self.transport
                .set_hard_iron_offset(Vector3::from(iron.hard_offset))?;
            let soft = iron.soft_matrix;
            self.transport
                .set_soft_iron_matrix(Matrix3::from_fn(|r, c| soft[r][c]))?;
        }

        self.pipeline.health.watch(Channel::Imu, imu_plan.actual_hz);
        self.pipeline
            .health
            .watch(Channel::Filter, filter_plan.actual_hz);
        self.imu_plan = Some(imu_plan);
        self.filter_plan = Some(filter_plan);
        self.state = SessionState::Configured;
        Ok(())
    }

    pub fn stream(&mut self) -> Result<(), Error> {
        info!("resuming the device");
        self.transport.resume()?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Pump the transport and tick diagnostics until `running` goes false
    /// or a fatal error lands. Exits through an orderly disconnect either
    /// way. The diagnostic cadence is independent of telemetry rates.
    pub fn run(&mut self, mut running: impl FnMut() -> bool) -> Result<(), Error> {
        let diag_period = Duration::from_secs_f64(self.config.diagnostic_period.max(0.0));
        let mut last_diag = Instant::now();
        while running() {
            if let Err(err) = self.transport.pump(&mut self.pipeline) {
                self.state = SessionState::Error;
                error!(%err, "fatal session error");
                if let Err(err) = self.transport.disconnect() {
                    warn!(%err, "disconnect after failure");
                }
                self.state = SessionState::Disconnected;
                return Err(err);
            }
            if last_diag.elapsed() >= diag_period {
                last_diag = Instant::now();
                let now = Timestamp::now();
                let query = self.transport.query_diagnostics();
                let report = self.pipeline.health.diagnostic_report(query, now);
                if report.level == Level::Error {
                    warn!(summary = %report.summary, "diagnostics degraded");
                }
                self.pipeline
                    .publisher
                    .publish(Channel::Diagnostics, Record::Diagnostics(report));
            }
        }
        self.disconnect()
    }

    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.transport.disconnect()?;
        self.state = SessionState::Disconnected;
        Ok(())
    }
}
