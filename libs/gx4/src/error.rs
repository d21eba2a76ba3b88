use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("transport {0}")]
    Transport(String),
    #[error("requested rate {requested} Hz not achievable from base rate {base} Hz")]
    RateExceedsBase { requested: u16, base: u16 },
    #[error("{frame} frame missing requested fields {missing}")]
    ContractViolation { frame: &'static str, missing: String },
    #[error("magnetic field vector is degenerate")]
    DegenerateVector,
    #[error("diagnostic query failed: {0}")]
    DiagnosticQuery(String),
}

impl Error {
    /// Advisory errors degrade reported health but never end the session;
    /// everything else unwinds to the run loop and triggers disconnect.
    pub fn is_advisory(&self) -> bool {
        matches!(self, Error::DegenerateVector | Error::DiagnosticQuery(_))
    }
}
