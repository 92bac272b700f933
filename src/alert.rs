//! Desktop notification for a downloaded update.

use std::sync::mpsc::Sender;

use eframe::egui;

use crate::signals::Command;

pub trait UpdateAlert {
    fn update_ready(&self, release_name: &str, release_notes: &str);
}

const SUMMARY: &str = "Traycal update ready";

/// Freedesktop notification servers report clicks back to us.
const CLICKABLE: bool = cfg!(all(unix, not(target_os = "macos")));

fn alert_body(release_name: &str, release_notes: &str, clickable: bool) -> String {
    let mut body = if release_name.is_empty() {
        "A new version of Traycal has been downloaded.".to_string()
    } else {
        format!("Traycal {release_name} has been downloaded.")
    };
    if !release_notes.is_empty() {
        body.push('\n');
        body.push_str(release_notes.trim());
    }
    if clickable {
        body.push_str("\nClick to install and restart.");
    }
    body
}

/// OS notification. Clicking it installs the update where the notification
/// server reports actions (freedesktop); elsewhere it is informational and
/// the popup's banner does the install.
pub struct DesktopAlert {
    #[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
    tx: Sender<Command>,
    #[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
    ctx: egui::Context,
}

impl DesktopAlert {
    pub fn new(tx: Sender<Command>, ctx: egui::Context) -> Self {
        Self { tx, ctx }
    }
}

impl UpdateAlert for DesktopAlert {
    #[cfg(all(unix, not(target_os = "macos")))]
    fn update_ready(&self, release_name: &str, release_notes: &str) {
        use crate::platform;
        use crate::signals::HostRequest;

        let body = alert_body(release_name, release_notes, CLICKABLE);
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();

        // Waiting for the click blocks, so the handle lives on its own thread.
        std::thread::spawn(move || {
            let shown = notify_rust::Notification::new()
                .appname("Traycal")
                .summary(SUMMARY)
                .body(&body)
                .action("default", "Install")
                .show();
            match shown {
                Ok(handle) => handle.wait_for_action(|action| {
                    if action == "default"
                        && tx.send(Command::Host(HostRequest::InstallUpdate)).is_ok()
                    {
                        platform::wake(&ctx);
                    }
                }),
                Err(e) => tracing::warn!(error = %e, "could not show update notification"),
            }
        });
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn update_ready(&self, release_name: &str, release_notes: &str) {
        let shown = notify_rust::Notification::new()
            .appname("Traycal")
            .summary(SUMMARY)
            .body(&alert_body(release_name, release_notes, CLICKABLE))
            .show();
        if let Err(e) = shown {
            tracing::warn!(error = %e, "could not show update notification");
        }
    }
}
