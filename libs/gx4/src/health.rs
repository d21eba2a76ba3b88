use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::frames::{DeviceInfo, DiagnosticCounters};
use crate::records::{Channel, Timestamp};

/// Severity of one health dimension, or of the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthParams {
    /// Fractional tolerance on the target frequency.
    pub tolerance: f64,
    /// Sliding window over which frequency and drift are judged, seconds.
    pub window_secs: f64,
    /// Publish events required before any frequency verdict.
    pub min_events: u64,
}

impl Default for HealthParams {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            window_secs: 2.0,
            min_events: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tick {
    at: Timestamp,
    /// Publish delay relative to the record stamp, seconds.
    delay: f64,
}

/// Publication statistics for one output channel, owned by the monitor for
/// the lifetime of the session and reset whenever negotiation changes.
#[derive(Debug, Clone)]
pub struct ChannelHealth {
    channel: Channel,
    target_hz: f64,
    /// Half the nominal period; a record stamp older than this at publish
    /// time counts as drifted.
    max_drift: f64,
    seen: u64,
    ticks: VecDeque<Tick>,
}

impl ChannelHealth {
    fn new(channel: Channel, target_hz: f64) -> Self {
        Self {
            channel,
            target_hz,
            max_drift: 0.5 / target_hz,
            seen: 0,
            ticks: VecDeque::new(),
        }
    }

    fn tick(&mut self, stamp: Timestamp, now: Timestamp, window_secs: f64) {
        self.seen += 1;
        self.ticks.push_back(Tick {
            at: now,
            delay: now.seconds_since(stamp),
        });
        while self
            .ticks
            .front()
            .is_some_and(|t| now.seconds_since(t.at) > window_secs)
        {
            self.ticks.pop_front();
        }
    }

    fn status(&self, now: Timestamp, params: &HealthParams) -> ChannelStatus {
        let in_window = self
            .ticks
            .iter()
            .filter(|t| now.seconds_since(t.at) <= params.window_secs);
        let events = in_window.clone().count();
        let drifted = in_window
            .filter(|t| t.delay < 0.0 || t.delay > self.max_drift)
            .count();

        let observed_hz = (self.seen >= params.min_events)
            .then(|| events as f64 / params.window_secs);

        let (level, message) = match observed_hz {
            None => (
                Level::Warn,
                format!("waiting for events ({} of {})", self.seen, params.min_events),
            ),
            Some(hz) => {
                let lo = self.target_hz * (1.0 - params.tolerance);
                let hi = self.target_hz * (1.0 + params.tolerance);
                if hz < lo || hz > hi {
                    (
                        Level::Error,
                        format!("frequency {hz:.2} Hz outside [{lo:.2}, {hi:.2}] Hz"),
                    )
                } else if drifted > 0 {
                    (
                        Level::Error,
                        format!("{drifted} stamps drifted beyond {:.4} s", self.max_drift),
                    )
                } else {
                    (Level::Ok, format!("{hz:.2} Hz"))
                }
            }
        };
        ChannelStatus {
            channel: self.channel,
            target_hz: self.target_hz,
            observed_hz,
            level,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelStatus {
    pub channel: Channel,
    pub target_hz: f64,
    pub observed_hz: Option<f64>,
    pub level: Level,
    pub message: String,
}

/// Periodic aggregate of device identity, the live self-diagnostic query,
/// and per-channel publication statistics. Advisory only.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub stamp: Timestamp,
    pub hardware_id: String,
    pub level: Level,
    pub summary: String,
    pub device_info: Vec<(&'static str, String)>,
    pub counters: Option<DiagnosticCounters>,
    pub channels: Vec<ChannelStatus>,
}

/// Tracks publication health for the session's output channels.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    params: HealthParams,
    info: DeviceInfo,
    channels: Vec<ChannelHealth>,
}

impl HealthMonitor {
    pub fn new(params: HealthParams) -> Self {
        Self {
            params,
            info: DeviceInfo::default(),
            channels: Vec::new(),
        }
    }

    pub fn set_device_info(&mut self, info: DeviceInfo) {
        self.info = info;
    }

    /// Start (or restart, after renegotiation) monitoring a channel against
    /// the *actual* negotiated rate; using the requested rate here would
    /// raise false alarms whenever decimation rounds the rate.
    pub fn watch(&mut self, channel: Channel, target_hz: f64) {
        self.channels.retain(|c| c.channel != channel);
        self.channels.push(ChannelHealth::new(channel, target_hz));
    }

    pub fn on_tick(&mut self, channel: Channel, stamp: Timestamp, now: Timestamp) {
        if let Some(entry) = self.channels.iter_mut().find(|c| c.channel == channel) {
            entry.tick(stamp, now, self.params.window_secs);
        }
    }

    pub fn channel_statuses(&self, now: Timestamp) -> Vec<ChannelStatus> {
        self.channels
            .iter()
            .map(|c| c.status(now, &self.params))
            .collect()
    }

    /// Assemble the periodic report. A failed diagnostic query degrades the
    /// summary to [`Level::Error`]; it never interrupts streaming.
    pub fn diagnostic_report(
        &self,
        query: Result<DiagnosticCounters, Error>,
        now: Timestamp,
    ) -> DiagnosticReport {
        let (counters, mut level, summary) = match query {
            Ok(counters) => (Some(counters), Level::Ok, "read diagnostic info".to_string()),
            Err(err) => (None, Level::Error, format!("failed: {err}")),
        };
        let channels = self.channel_statuses(now);
        for status in &channels {
            level = level.max(status.level);
        }
        DiagnosticReport {
            stamp: now,
            hardware_id: self.info.hardware_id(),
            level,
            summary,
            device_info: self.info.to_map(),
            counters,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HZ: f64 = 100.0;

    fn monitor() -> HealthMonitor {
        let mut monitor = HealthMonitor::new(HealthParams::default());
        monitor.watch(Channel::Imu, HZ);
        monitor
    }

    fn feed(monitor: &mut HealthMonitor, count: u64, period_us: i64) -> Timestamp {
        let mut now = Timestamp(0);
        for i in 0..count {
            now = Timestamp(i as i64 * period_us);
            monitor.on_tick(Channel::Imu, now, now);
        }
        now
    }

    #[test]
    fn nominal_rate_is_ok() {
        let mut monitor = monitor();
        let now = feed(&mut monitor, 400, 10_000);
        let status = &monitor.channel_statuses(now)[0];
        assert_eq!(status.level, Level::Ok);
        let hz = status.observed_hz.unwrap();
        assert!((hz - HZ).abs() / HZ <= 0.01, "observed {hz}");
    }

    #[test]
    fn no_verdict_below_min_events() {
        let mut monitor = monitor();
        let now = feed(&mut monitor, 5, 10_000);
        let status = &monitor.channel_statuses(now)[0];
        assert_eq!(status.level, Level::Warn);
        assert!(status.observed_hz.is_none());
    }

    #[test]
    fn starved_channel_is_an_error() {
        let mut monitor = monitor();
        let last = feed(&mut monitor, 400, 10_000);
        // three seconds of silence empties the window
        let now = Timestamp(last.0 + 3_000_000);
        let status = &monitor.channel_statuses(now)[0];
        assert_eq!(status.level, Level::Error);
        approx::assert_abs_diff_eq!(status.observed_hz.unwrap(), 0.0);
    }

    #[test]
    fn off_target_rate_is_an_error() {
        let mut monitor = monitor();
        // 50 Hz against a 100 Hz target
        let now = feed(&mut monitor, 200, 20_000);
        let status = &monitor.channel_statuses(now)[0];
        assert_eq!(status.level, Level::Error);
    }

    #[test]
    fn stamp_drift_beyond_half_period_is_an_error() {
        let mut monitor = monitor();
        let mut now = Timestamp(0);
        for i in 0..400i64 {
            now = Timestamp(i * 10_000);
            // stamps lag publication by 8 ms, past the 5 ms bound
            monitor.on_tick(Channel::Imu, Timestamp(now.0 - 8_000), now);
        }
        let status = &monitor.channel_statuses(now)[0];
        assert_eq!(status.level, Level::Error);
        assert!(status.message.contains("drifted"));
    }

    #[test]
    fn renegotiation_resets_the_channel() {
        let mut monitor = monitor();
        let now = feed(&mut monitor, 400, 10_000);
        monitor.watch(Channel::Imu, 50.0);
        let status = &monitor.channel_statuses(now)[0];
        assert!(status.observed_hz.is_none());
        approx::assert_abs_diff_eq!(status.target_hz, 50.0);
    }

    #[test]
    fn failed_query_degrades_without_dropping_channels() {
        let mut monitor = monitor();
        let now = feed(&mut monitor, 400, 10_000);
        let report =
            monitor.diagnostic_report(Err(Error::DiagnosticQuery("timed out".into())), now);
        assert_eq!(report.level, Level::Error);
        assert!(report.summary.contains("timed out"));
        assert!(report.counters.is_none());
        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.channels[0].level, Level::Ok);
    }

    #[test]
    fn healthy_query_reads_ok() {
        let mut monitor = monitor();
        monitor.set_device_info(DeviceInfo {
            model_name: "3DM-GX4-25".into(),
            model_number: "6234".into(),
            ..Default::default()
        });
        let now = feed(&mut monitor, 400, 10_000);
        let report = monitor.diagnostic_report(Ok(DiagnosticCounters::default()), now);
        assert_eq!(report.level, Level::Ok);
        assert_eq!(report.hardware_id, "3DM-GX4-25-6234");
        assert!(report.counters.is_some());
    }
}
