//! Polls an update feed, downloads new releases and applies them on request.
//!
//! The feed lives at `<host>/update/<platform>/<version>`. It answers 204
//! when the running version is current, and 200 with a JSON release
//! otherwise.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::signals::{Command, UpdateEvent};

/// What the UI knows about a pending update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateState {
    pub available: bool,
    pub release_notes: String,
    pub release_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: String,
}

pub fn feed_url(host: &str, platform: &str, version: &str) -> String {
    format!("{}/update/{platform}/{version}", host.trim_end_matches('/'))
}

/// Platform names as update servers know them.
pub fn feed_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Check/download/apply, treated as a black box by the notifier.
pub trait UpdateBackend: Send + Sync {
    fn check(&self) -> Result<Option<Release>>;
    fn download(&self, release: &Release) -> Result<PathBuf>;
    fn apply(&self, artifact: &Path) -> Result<()>;
}

/// Feed client over HTTPS.
pub struct HttpFeed {
    client: reqwest::blocking::Client,
    url: String,
    download_dir: PathBuf,
}

impl HttpFeed {
    pub fn new(host: &str, download_dir: PathBuf) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("traycal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: feed_url(host, feed_platform(), env!("CARGO_PKG_VERSION")),
            download_dir,
        })
    }
}

impl UpdateBackend for HttpFeed {
    fn check(&self) -> Result<Option<Release>> {
        let response = self.client.get(&self.url).send()?;
        match response.status().as_u16() {
            204 => Ok(None),
            200 => Ok(Some(response.json()?)),
            status => Err(Error::FeedStatus { status }),
        }
    }

    fn download(&self, release: &Release) -> Result<PathBuf> {
        let response = self.client.get(&release.url).send()?.error_for_status()?;
        let bytes = response.bytes()?;

        let file_name = release
            .url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("traycal-update");
        fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(file_name);
        fs::write(&path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "update downloaded");
        Ok(path)
    }

    fn apply(&self, artifact: &Path) -> Result<()> {
        let mut launcher = if cfg!(target_os = "macos") {
            let mut cmd = process::Command::new("open");
            cmd.arg(artifact);
            cmd
        } else if cfg!(windows) {
            process::Command::new(artifact)
        } else {
            let mut cmd = process::Command::new("xdg-open");
            cmd.arg(artifact);
            cmd
        };
        launcher.spawn()?;
        Ok(())
    }
}

/// Poll timing.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    /// Wait before the first check, so startup is not slowed down.
    pub initial_delay: Duration,
    pub interval: Duration,
}

pub struct UpdateNotifier {
    backend: Arc<dyn UpdateBackend>,
    downloaded: Option<PathBuf>,
    stop: Option<Sender<()>>,
}

impl UpdateNotifier {
    pub fn new(backend: Arc<dyn UpdateBackend>) -> Self {
        Self {
            backend,
            downloaded: None,
            stop: None,
        }
    }

    /// Starts the poller thread. Progress arrives as `Command::Update`;
    /// `wake` is called after each send. Polling runs until `stop` or until
    /// the receiver is gone; a release is downloaded once.
    pub fn start_polling(
        &mut self,
        schedule: Schedule,
        tx: Sender<Command>,
        wake: impl Fn() + Send + 'static,
    ) {
        if self.stop.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        self.stop = Some(stop_tx);
        let backend = Arc::clone(&self.backend);

        thread::spawn(move || {
            let mut wait = schedule.initial_delay;
            let mut downloaded_url = None;
            loop {
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                wait = schedule.interval;

                for event in poll_once(backend.as_ref(), &mut downloaded_url) {
                    if tx.send(Command::Update(event)).is_err() {
                        return;
                    }
                    wake();
                }
            }
            tracing::debug!("update poller stopped");
        });
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub fn set_downloaded(&mut self, artifact: PathBuf) {
        self.downloaded = Some(artifact);
    }

    /// Hands the downloaded artifact to the platform. The caller quits after.
    pub fn install(&self) -> Result<()> {
        let artifact = self.downloaded.as_deref().ok_or(Error::NothingToInstall)?;
        tracing::info!(artifact = %artifact.display(), "installing update");
        self.backend.apply(artifact)
    }
}

/// One check, and a download when the check finds a release other than
/// `downloaded_url`.
fn poll_once(
    backend: &dyn UpdateBackend,
    downloaded_url: &mut Option<String>,
) -> Vec<UpdateEvent> {
    let mut events = vec![UpdateEvent::Checking];
    match backend.check() {
        Ok(None) => events.push(UpdateEvent::NotAvailable),
        Ok(Some(release)) if downloaded_url.as_deref() == Some(release.url.as_str()) => {
            tracing::debug!(release = %release.name, "release already downloaded");
        }
        Ok(Some(release)) => {
            events.push(UpdateEvent::Available);
            match backend.download(&release) {
                Ok(artifact) => {
                    *downloaded_url = Some(release.url);
                    events.push(UpdateEvent::Downloaded {
                        release_notes: release.notes,
                        release_name: release.name,
                        artifact,
                    });
                }
                Err(e) => events.push(UpdateEvent::Error(e.to_string())),
            }
        }
        Err(e) => events.push(UpdateEvent::Error(e.to_string())),
    }
    events
}


#[cfg(test)]
mod tests {
    use super::fake::{release, FakeBackend};
    use super::*;

    #[test]
    fn test_feed_url() {
        assert_eq!(
            feed_url("https://updates.example.com/", "darwin", "1.2.0"),
            "https://updates.example.com/update/darwin/1.2.0"
        );
    }

    #[test]
    fn test_poll_without_release() {
        let backend = FakeBackend::default();
        assert_eq!(
            poll_once(&backend, &mut None),
            vec![UpdateEvent::Checking, UpdateEvent::NotAvailable]
        );
    }

    #[test]
    fn test_poll_downloads_release() {
        let backend = FakeBackend {
            release: Some(release("2.0.0")),
            ..Default::default()
        };
        let mut downloaded = None;
        let events = poll_once(&backend, &mut downloaded);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            UpdateEvent::Downloaded {
                release_notes: "Bug fixes".into(),
                release_name: "2.0.0".into(),
                artifact: PathBuf::from("/tmp/2.0.0"),
            }
        );

        // the same release is not fetched again
        assert_eq!(
            poll_once(&backend, &mut downloaded),
            vec![UpdateEvent::Checking]
        );
    }

    #[test]
    fn test_poll_failure_becomes_error_event() {
        let backend = FakeBackend {
            fail_check: true,
            ..Default::default()
        };
        let events = poll_once(&backend, &mut None);
        assert_eq!(
            events.last(),
            Some(&UpdateEvent::Error(
                "update feed answered with status 503".into()
            ))
        );
    }

    #[test]
    fn test_install_requires_download() {
        let backend = Arc::new(FakeBackend::default());
        let mut notifier = UpdateNotifier::new(Arc::clone(&backend) as Arc<dyn UpdateBackend>);
        assert!(matches!(notifier.install(), Err(Error::NothingToInstall)));

        notifier.set_downloaded(PathBuf::from("/tmp/2.0.0"));
        notifier.install().unwrap();
        assert_eq!(
            *backend.applied.lock().unwrap(),
            vec![PathBuf::from("/tmp/2.0.0")]
        );
    }

    #[test]
    fn test_poller_keeps_checking_after_download() {
        let backend = Arc::new(FakeBackend {
            release: Some(release("2.0.0")),
            ..Default::default()
        });
        let mut notifier = UpdateNotifier::new(backend);
        let (tx, rx) = mpsc::channel();
        notifier.start_polling(
            Schedule {
                initial_delay: Duration::from_millis(1),
                interval: Duration::from_millis(1),
            },
            tx,
            || {},
        );

        let events: Vec<Command> = rx.iter().take(6).collect();
        notifier.stop();

        let downloads = events
            .iter()
            .filter(|c| matches!(c, Command::Update(UpdateEvent::Downloaded { .. })))
            .count();
        assert_eq!(downloads, 1);
        assert!(matches!(
            events[2],
            Command::Update(UpdateEvent::Downloaded { .. })
        ));
        assert_eq!(events[3..], vec![Command::Update(UpdateEvent::Checking); 3]);
    }
}
