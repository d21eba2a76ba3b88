//! Telemetry pipeline and configuration core for 3DM-GX4 class inertial
//! sensors.
//!
//! The device link and the message bus stay behind the
//! [`transport::DeviceTransport`] and [`publish::ChannelPublisher`] seams;
//! this crate owns everything between them: rate negotiation, unit
//! translation, the magnetic heading cross-check, publication health, and
//! the session lifecycle.

pub mod config;
pub mod error;
pub mod frames;
pub mod heading;
pub mod health;
pub mod publish;
pub mod rate;
pub mod records;
pub mod session;
pub mod translate;
pub mod transport;

pub use config::DriverConfig;
pub use error::Error;
pub use publish::{ChannelPublisher, Record};
pub use rate::{DecimationPlan, negotiate};
pub use records::{Channel, Timestamp};
pub use session::{Pipeline, Session, SessionState};
pub use transport::{DeviceTransport, FrameListener};
