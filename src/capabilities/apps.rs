//! Running applications: launch, activate, hide, quit

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::applescript;
use crate::bridge::{Bridge, Request};
use crate::error::Result;
use crate::escape::applescript_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningApplication {
    pub name: String,
    pub bundle_id: String,
}

pub async fn launch_application(bridge: &Bridge, bundle_id: &str) -> Result<()> {
    info!(bundle_id, "Launching application");
    bridge
        .fire(
            Request::new("launchApplication", json!({ "bundleId": bundle_id }))
                .fixture("launchApplication"),
        )
        .await
}

/// Bring an application to the front, launching it if needed
pub async fn activate_application(bridge: &Bridge, bundle_id: &str) -> Result<()> {
    info!(bundle_id, "Activating application");
    bridge
        .fire(
            Request::new("launchApplication", json!({ "bundleId": bundle_id }))
                .fixture("activateApplication"),
        )
        .await
}

pub async fn hide_application(bridge: &Bridge, bundle_id: &str) -> Result<()> {
    info!(bundle_id, "Hiding application");
    bridge
        .fire(
            Request::new("hideApplication", json!({ "bundleId": bundle_id }))
                .fixture("hideApplication"),
        )
        .await
}

pub async fn quit_application(bridge: &Bridge, bundle_id: &str) -> Result<()> {
    info!(bundle_id, "Quitting application");
    bridge
        .fire(
            Request::new("quitApplication", json!({ "bundleId": bundle_id }))
                .fixture("quitApplication"),
        )
        .await
}

pub async fn open_url_in_application(bridge: &Bridge, url: &str, bundle_id: &str) -> Result<()> {
    info!(url, bundle_id, "Opening URL in application");
    bridge
        .fire(
            Request::new(
                "openURLInApplication",
                json!({ "url": url, "bundleId": bundle_id }),
            )
            .fixture("openURLInApplication"),
        )
        .await
}

pub async fn open_file_in_application(bridge: &Bridge, path: &str, bundle_id: &str) -> Result<()> {
    info!(path, bundle_id, "Opening file in application");
    bridge
        .fire(
            Request::new(
                "openFileInApplication",
                json!({ "path": path, "bundleId": bundle_id }),
            )
            .fixture("openFileInApplication"),
        )
        .await
}

pub async fn fetch_running_applications(bridge: &Bridge) -> Result<Option<Vec<RunningApplication>>> {
    bridge
        .call_as(Request::new("allRunningApps", json!({})).fixture("fetchRunningApplications"))
        .await
}

fn close_windows_script(bundle_id: &str) -> String {
    format!(
        r#"tell application "System Events"
  set proc to first process whose background only is false and bundle identifier is {}
  repeat with win in proc's windows
    set butt to (win's first button whose subrole is "AXCloseButton")
    click butt
  end repeat
end tell"#,
        applescript_string(bundle_id)
    )
}

/// Click the close button of every window the application has open
pub async fn close_application_windows(bridge: &Bridge, bundle_id: &str) -> Result<()> {
    info!(bundle_id, "Closing application windows");
    bridge
        .fire(applescript(close_windows_script(bundle_id)).fixture("closeApplicationWindows"))
        .await
}
