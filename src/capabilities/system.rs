//! System actions: power, session, trash, volumes, notifications, calendar
//!
//! Everything here goes through the host's `applescript` and `system` ops or
//! a dedicated host op; nothing is executed in this process.

use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{applescript, system_command};
use crate::bridge::{Bridge, Request, WatchRequest};
use crate::error::Result;
use crate::escape::applescript_string;
use crate::protocol::{REMOVE_CHANGE_SUBSCRIPTION, SUBSCRIBE_TO_CHANGES};

const CGSESSION: &str =
    "/System/Library/CoreServices/Menu Extras/User.menu/Contents/Resources/CGSession";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub content: String,
}

/// Calendar event; `start` and `end` are RFC 3339 timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
}

// ============================================================================
// Host primitives
// ============================================================================

/// Run an AppleScript body on the host and return its result
pub async fn run_applescript(bridge: &Bridge, script: &str) -> Result<Option<Value>> {
    bridge.call(applescript(script).fixture("runApplescript")).await
}

/// Run a command with arguments on the host and return its output
pub async fn call_system(bridge: &Bridge, command: &str, args: &[&str]) -> Result<Option<Value>> {
    bridge
        .call(system_command(command, args).fixture("callSystem"))
        .await
}

async fn system_events(bridge: &Bridge, fixture: &str, action: &str) -> Result<()> {
    bridge
        .fire(
            applescript(format!(r#"tell application "System Events" to {}"#, action))
                .fixture(fixture),
        )
        .await
}

// ============================================================================
// Power and Session
// ============================================================================

pub async fn shut_down(bridge: &Bridge) -> Result<()> {
    info!("Shutting down system");
    system_events(bridge, "shutdown", "shut down").await
}

pub async fn restart(bridge: &Bridge) -> Result<()> {
    info!("Restarting system");
    system_events(bridge, "restart", "restart").await
}

pub async fn log_out(bridge: &Bridge) -> Result<()> {
    info!("Logging out user");
    system_events(bridge, "logOut", "log out").await
}

pub async fn sleep(bridge: &Bridge) -> Result<()> {
    info!("Putting system to sleep");
    system_events(bridge, "sleep", "sleep").await
}

/// Suspend the login session, returning to the lock screen
pub async fn lock(bridge: &Bridge) -> Result<()> {
    info!("Locking screen");
    bridge
        .fire(system_command(CGSESSION, &["-suspend"]).fixture("lock"))
        .await
}

pub async fn turn_off_display(bridge: &Bridge) -> Result<()> {
    info!("Turning off display");
    bridge
        .fire(system_command("/usr/bin/pmset", &["displaysleepnow"]).fixture("turnOffDisplay"))
        .await
}

pub async fn turn_on_screensaver(bridge: &Bridge) -> Result<()> {
    info!("Starting screen saver");
    system_events(bridge, "turnOnScreensaver", "start current screen saver").await
}

// ============================================================================
// Trash and Volumes
// ============================================================================

pub async fn empty_trash(bridge: &Bridge) -> Result<()> {
    info!("Emptying trash");
    bridge
        .fire(applescript(r#"tell application "Finder" to empty the trash"#).fixture("emptyTrash"))
        .await
}

pub async fn fetch_mounted_volumes(bridge: &Bridge) -> Result<Option<Value>> {
    bridge
        .call(Request::new("mountedVolumes", json!({})).fixture("fetchMountedVolumes"))
        .await
}

pub async fn unmount_volume(bridge: &Bridge, id: &str) -> Result<()> {
    info!(volume = id, "Ejecting volume");
    let script = format!(
        r#"tell application "Finder" to eject {}"#,
        applescript_string(id)
    );
    bridge.fire(applescript(script).fixture("unmountVolume")).await
}

pub async fn unmount_all_volumes(bridge: &Bridge) -> Result<()> {
    info!("Ejecting all volumes");
    bridge
        .fire(
            applescript(r#"tell application "Finder" to eject the disks"#)
                .fixture("unmountAllVolumes"),
        )
        .await
}

// ============================================================================
// Notifications, Events, Reminders
// ============================================================================

pub async fn show_notification(bridge: &Bridge, notification: &Notification) -> Result<()> {
    info!(title = %notification.title, "Showing notification");
    bridge
        .fire(Request::new("notify", serde_json::to_value(notification)?).fixture("showNotification"))
        .await
}

pub async fn create_event(bridge: &Bridge, event: &CalendarEvent) -> Result<()> {
    info!(title = %event.title, start = %event.start, "Creating calendar event");
    bridge
        .fire(Request::new("createEvent", serde_json::to_value(event)?).fixture("createEvent"))
        .await
}

pub async fn create_reminder(bridge: &Bridge, reminder: &Reminder) -> Result<()> {
    info!(title = %reminder.title, "Creating reminder");
    bridge
        .fire(Request::new("createReminder", serde_json::to_value(reminder)?).fixture("createReminder"))
        .await
}

/// Front-end configuration held by the host
pub async fn fetch_config(bridge: &Bridge) -> Result<Option<Value>> {
    bridge
        .call(Request::new("getConfig", json!({})).fixture("config"))
        .await
}

/// One configuration property: its current value, then each change
///
/// A property missing from the configuration reads as `null`. Dropping the
/// stream removes the host's change subscription.
pub fn watch_config(bridge: &Bridge, property: &str) -> BoxStream<'static, Result<Value>> {
    debug!(property, "Watching configuration");
    let property = property.to_string();
    bridge
        .watch(
            WatchRequest::new(SUBSCRIBE_TO_CHANGES, REMOVE_CHANGE_SUBSCRIPTION, json!({}))
                .fixture("config"),
        )
        .map(move |change| {
            change.map(|config| config.get(&property).cloned().unwrap_or(Value::Null))
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::StaticFixtures;
    use crate::capabilities::test_support::{demo, live, settle};
    use crate::capabilities::{APPLESCRIPT_OP, SYSTEM_OP};
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_run_applescript_returns_result() {
        let (bridge, host) = live();
        let out = settle(&host, run_applescript(&bridge, "1 + 1"), Ok(json!(2))).unwrap();
        assert_eq!(out, Some(json!(2)));
        let sent = host.sent();
        assert_eq!(sent[0].op, APPLESCRIPT_OP);
        assert_eq!(sent[0].payload, json!({"script": "1 + 1"}));
    }

    #[test]
    fn test_power_actions_use_system_events() {
        let (bridge, host) = live();
        settle(&host, shut_down(&bridge), Ok(Value::Null)).unwrap();
        settle(&host, log_out(&bridge), Ok(Value::Null)).unwrap();
        let sent = host.sent();
        assert_eq!(
            sent[0].payload["script"],
            r#"tell application "System Events" to shut down"#
        );
        assert_eq!(
            sent[1].payload["script"],
            r#"tell application "System Events" to log out"#
        );
    }

    #[test]
    fn test_lock_and_display_use_system_op() {
        let (bridge, host) = live();
        settle(&host, lock(&bridge), Ok(Value::Null)).unwrap();
        settle(&host, turn_off_display(&bridge), Ok(Value::Null)).unwrap();
        let sent = host.sent();
        assert_eq!(sent[0].op, SYSTEM_OP);
        assert_eq!(sent[0].payload["command"], CGSESSION);
        assert_eq!(sent[0].payload["args"], json!(["-suspend"]));
        assert_eq!(sent[1].payload["args"], json!(["displaysleepnow"]));
    }

    #[test]
    fn test_unmount_volume_escapes_name() {
        let (bridge, host) = live();
        settle(&host, unmount_volume(&bridge, r#"Backup "2""#), Ok(Value::Null)).unwrap();
        assert_eq!(
            host.sent()[0].payload["script"],
            r#"tell application "Finder" to eject "Backup \"2\"""#
        );
    }

    #[test]
    fn test_notification_payload() {
        let (bridge, host) = live();
        let notification = Notification {
            title: "Done".into(),
            subtitle: String::new(),
            content: "Build finished".into(),
        };
        settle(&host, show_notification(&bridge, &notification), Ok(Value::Null)).unwrap();
        let sent = host.sent();
        assert_eq!(sent[0].op, "notify");
        assert_eq!(
            sent[0].payload,
            json!({"title": "Done", "subtitle": "", "content": "Build finished"})
        );
    }

    #[test]
    fn test_event_payload_is_camel_case() {
        let (bridge, host) = live();
        let event = CalendarEvent {
            title: "Standup".into(),
            start: "2026-10-20T09:00:00Z".into(),
            end: "2026-10-20T09:15:00Z".into(),
            all_day: false,
        };
        settle(&host, create_event(&bridge, &event), Ok(Value::Null)).unwrap();
        assert_eq!(host.sent()[0].payload["allDay"], false);
    }

    #[test]
    fn test_demo_config_and_volumes() {
        let bridge = demo(StaticFixtures::builtin());
        let config = block_on(fetch_config(&bridge)).unwrap().unwrap();
        assert!(config["webSearch"]["searchEngines"].is_array());
        assert_eq!(
            block_on(fetch_mounted_volumes(&bridge)).unwrap(),
            Some(json!([]))
        );
        assert!(block_on(empty_trash(&bridge)).is_ok());
    }

    #[test]
    fn test_watch_config_emits_current_value_then_changes() {
        let (bridge, host) = live();
        let mut feed = watch_config(&bridge, "webSearch");
        assert!(feed.next().now_or_never().is_none());

        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op, SUBSCRIBE_TO_CHANGES);
        let query_id = sent[0].query_id.clone().unwrap();

        assert!(host.complete(0, Ok(json!({"webSearch": {"engine": "Google"}}))));
        assert_eq!(
            block_on(feed.next()).unwrap().unwrap(),
            json!({"engine": "Google"})
        );

        host.push(&query_id, Ok(json!({"webSearch": {"engine": "DuckDuckGo"}})));
        assert_eq!(
            block_on(feed.next()).unwrap().unwrap(),
            json!({"engine": "DuckDuckGo"})
        );

        host.push(&query_id, Ok(json!({"applications": {}})));
        assert_eq!(block_on(feed.next()).unwrap().unwrap(), Value::Null);
    }

    #[test]
    fn test_dropping_config_watch_removes_subscription_once() {
        let (bridge, host) = live();
        let feed = watch_config(&bridge, "webSearch");
        let query_id = host.sent()[0].query_id.clone().unwrap();
        drop(feed);

        let removals: Vec<_> = host
            .sent()
            .into_iter()
            .filter(|envelope| envelope.op == REMOVE_CHANGE_SUBSCRIPTION)
            .collect();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].payload["subscriptionId"], query_id.to_string());
        assert_eq!(host.cancels_for(&query_id), 0);

        let before = host.sent_count();
        host.push(&query_id, Ok(json!({"webSearch": {}})));
        assert_eq!(host.sent_count(), before);
        let manager = bridge.transport().unwrap().subscriptions();
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_demo_config_watch_emits_fixture_once() {
        let bridge = demo(StaticFixtures::builtin());
        let values: Vec<_> = block_on(watch_config(&bridge, "webSearch").collect::<Vec<_>>());
        assert_eq!(values.len(), 1);
        let web_search = values[0].as_ref().unwrap();
        assert!(web_search["searchEngines"].is_array());
    }

    #[test]
    fn test_unsupported_config_watch_is_empty() {
        let bridge = Bridge::unsupported();
        let values: Vec<_> = block_on(watch_config(&bridge, "webSearch").collect::<Vec<_>>());
        assert!(values.is_empty());
    }
}
