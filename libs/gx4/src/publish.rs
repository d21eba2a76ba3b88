use crate::health::DiagnosticReport;
use crate::records::{
    Channel, OutputFilterRecord, OutputImuRecord, OutputMagRecord, OutputPressureRecord,
};

/// A record bound for one named output channel.
#[derive(Debug, Clone)]
pub enum Record {
    Imu(OutputImuRecord),
    MagneticField(OutputMagRecord),
    Pressure(OutputPressureRecord),
    Filter(OutputFilterRecord),
    Diagnostics(DiagnosticReport),
}

impl Record {
    pub fn channel(&self) -> Channel {
        match self {
            Record::Imu(_) => Channel::Imu,
            Record::MagneticField(_) => Channel::MagneticField,
            Record::Pressure(_) => Channel::Pressure,
            Record::Filter(_) => Channel::Filter,
            Record::Diagnostics(_) => Channel::Diagnostics,
        }
    }
}

/// Message-bus seam. The publisher owns a record once it is handed over;
/// delivery guarantees are its business, not the pipeline's.
pub trait ChannelPublisher {
    fn publish(&mut self, channel: Channel, record: Record);
}
