//! Error reporting, gated on production builds and confirmed connectivity.

use std::fmt;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something worth telling the maintainers about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    ContentCrashed(String),
    ContentUnresponsive,
    UpdateFailed(String),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentCrashed(msg) => write!(f, "popup content crashed: {msg}"),
            Self::ContentUnresponsive => write!(f, "popup content became unresponsive"),
            Self::UpdateFailed(msg) => write!(f, "update check failed: {msg}"),
        }
    }
}

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

pub trait ReportSink: Send + Sync {
    fn capture(&self, report: &Report);
}

/// Online if any well-known resolver accepts a TCP connection.
pub struct TcpConnectivity {
    targets: Vec<SocketAddr>,
    timeout: Duration,
}

impl Default for TcpConnectivity {
    fn default() -> Self {
        Self {
            targets: vec![
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([8, 8, 8, 8], 53)),
            ],
            timeout: Duration::from_secs(2),
        }
    }
}

impl Connectivity for TcpConnectivity {
    fn is_online(&self) -> bool {
        self.targets
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, self.timeout).is_ok())
    }
}

/// Writes reports to the log under the `traycal::report` target.
pub struct LogSink;

impl ReportSink for LogSink {
    fn capture(&self, report: &Report) {
        tracing::error!(target: "traycal::report", %report, "reported");
    }
}

pub struct ErrorReporter {
    production: bool,
    connectivity: Arc<dyn Connectivity>,
    sink: Arc<dyn ReportSink>,
}

impl ErrorReporter {
    pub fn new(
        production: bool,
        connectivity: Arc<dyn Connectivity>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            production,
            connectivity,
            sink,
        }
    }

    /// Forwards `report` to the sink once connectivity is confirmed. The
    /// check runs off the UI thread; the handle is only useful to tests.
    /// Development builds drop every report.
    pub fn report(&self, report: Report) -> Option<JoinHandle<()>> {
        if !self.production {
            tracing::debug!(%report, "not reporting in development");
            return None;
        }

        let connectivity = Arc::clone(&self.connectivity);
        let sink = Arc::clone(&self.sink);
        Some(thread::spawn(move || {
            if connectivity.is_online() {
                sink.capture(&report);
            } else {
                tracing::debug!(%report, "offline; report dropped");
            }
        }))
    }
}
