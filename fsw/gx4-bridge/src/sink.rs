use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::{info, warn};

use gx4::health::{DiagnosticReport, Level};
use gx4::publish::{ChannelPublisher, Record};
use gx4::records::Channel;

/// One CSV file per telemetry channel; diagnostic reports go to the log
/// and double as the flush tick for the writers.
pub struct CsvSink {
    imu: csv::Writer<File>,
    mag: csv::Writer<File>,
    pressure: csv::Writer<File>,
    filter: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut imu = csv::Writer::from_path(dir.join("imu.csv")).map_err(into_io)?;
        imu.write_record(["stamp_us", "ax", "ay", "az", "wx", "wy", "wz"])
            .map_err(into_io)?;
        let mut mag = csv::Writer::from_path(dir.join("magnetic_field.csv")).map_err(into_io)?;
        mag.write_record(["stamp_us", "mx", "my", "mz", "magnitude"])
            .map_err(into_io)?;
        let mut pressure = csv::Writer::from_path(dir.join("pressure.csv")).map_err(into_io)?;
        pressure
            .write_record(["stamp_us", "fluid_pressure"])
            .map_err(into_io)?;
        let mut filter = csv::Writer::from_path(dir.join("filter.csv")).map_err(into_io)?;
        filter
            .write_record([
                "stamp_us",
                "qw",
                "qx",
                "qy",
                "qz",
                "roll",
                "pitch",
                "yaw",
                "heading_update",
                "heading_update_alt",
            ])
            .map_err(into_io)?;
        Ok(Self {
            imu,
            mag,
            pressure,
            filter,
        })
    }

    fn log_report(&self, report: &DiagnosticReport) {
        for status in &report.channels {
            match status.level {
                Level::Ok => info!(channel = %status.channel, message = %status.message, "channel ok"),
                Level::Warn => {
                    warn!(channel = %status.channel, message = %status.message, "channel warming up")
                }
                Level::Error => {
                    warn!(channel = %status.channel, message = %status.message, "channel unhealthy")
                }
            }
        }
        match report.level {
            Level::Error => warn!(hardware = %report.hardware_id, summary = %report.summary, "diagnostics"),
            _ => info!(hardware = %report.hardware_id, summary = %report.summary, "diagnostics"),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.imu.flush()?;
        self.mag.flush()?;
        self.pressure.flush()?;
        self.filter.flush()
    }
}

fn into_io(err: csv::Error) -> io::Error {
    io::Error::other(err)
}

impl ChannelPublisher for CsvSink {
    fn publish(&mut self, channel: Channel, record: Record) {
        let result = match record {
            Record::Imu(r) => self.imu.write_record([
                r.stamp.as_micros().to_string(),
                r.linear_acceleration.x.to_string(),
                r.linear_acceleration.y.to_string(),
                r.linear_acceleration.z.to_string(),
                r.angular_velocity.x.to_string(),
                r.angular_velocity.y.to_string(),
                r.angular_velocity.z.to_string(),
            ]),
            Record::MagneticField(r) => self.mag.write_record([
                r.stamp.as_micros().to_string(),
                r.field.x.to_string(),
                r.field.y.to_string(),
                r.field.z.to_string(),
                r.magnitude.to_string(),
            ]),
            Record::Pressure(r) => self.pressure.write_record([
                r.stamp.as_micros().to_string(),
                r.fluid_pressure.to_string(),
            ]),
            Record::Filter(r) => self.filter.write_record([
                r.stamp.as_micros().to_string(),
                r.quaternion[0].to_string(),
                r.quaternion[1].to_string(),
                r.quaternion[2].to_string(),
                r.quaternion[3].to_string(),
                r.euler_rpy.x.to_string(),
                r.euler_rpy.y.to_string(),
                r.euler_rpy.z.to_string(),
                r.heading_update.to_string(),
                r.heading_update_alt
                    .map(|h| h.to_string())
                    .unwrap_or_default(),
            ]),
            Record::Diagnostics(report) => {
                self.log_report(&report);
                self.flush().map_err(csv::Error::from)
            }
        };
        if let Err(err) = result {
            warn!(%channel, %err, "dropping record");
        }
    }
}
