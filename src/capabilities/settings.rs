//! System settings: wifi, bluetooth, dark mode, do not disturb, volume

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{applescript, as_text, system_command};
use crate::bridge::{Bridge, Request};
use crate::error::Result;

const NETWORKSETUP: &str = "/usr/sbin/networksetup";
const WIFI_INTERFACE: &str = "en0";

const DND_ON: &str = "defaults -currentHost write ~/Library/Preferences/ByHost/com.apple.notificationcenterui doNotDisturb -boolean true; \
defaults -currentHost write ~/Library/Preferences/ByHost/com.apple.notificationcenterui doNotDisturbDate -date \"`date -u +\\\"%Y-%m-%d %H:%M:%S +000\\\"`\"; \
killall NotificationCenter";
const DND_OFF: &str = "defaults -currentHost write ~/Library/Preferences/ByHost/com.apple.notificationcenterui doNotDisturb -boolean false; \
killall NotificationCenter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteState {
    pub mute: bool,
}

/// Boolean view of a host reply that may be a bool, number or text
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn as_toggle(reply: Value) -> Result<Value> {
    Ok(json!({ "enabled": truthy(&reply) }))
}

/// Toggle from command output containing `marker`
fn output_contains(marker: &'static str) -> impl FnOnce(Value) -> Result<Value> + Send {
    move |reply| Ok(json!({ "enabled": as_text(Some(&reply)).contains(marker) }))
}

pub async fn set_wifi(bridge: &Bridge, enabled: bool) -> Result<()> {
    info!(enabled, "Setting wifi");
    let power = if enabled { "on" } else { "off" };
    bridge
        .fire(
            system_command(NETWORKSETUP, &["-setairportpower", WIFI_INTERFACE, power])
                .fixture("setWifi"),
        )
        .await
}

pub async fn check_wifi(bridge: &Bridge) -> Result<Option<Toggle>> {
    bridge
        .call_as(
            system_command(NETWORKSETUP, &["-getairportpower", WIFI_INTERFACE])
                .fixture("checkWifi")
                .reshape(output_contains("On")),
        )
        .await
}

pub async fn set_bluetooth(bridge: &Bridge, enabled: bool) -> Result<()> {
    info!(enabled, "Setting bluetooth");
    bridge
        .fire(
            Request::new("setBluetoothEnabled", json!({ "enabled": enabled })).fixture("setBluetooth"),
        )
        .await
}

pub async fn check_bluetooth(bridge: &Bridge) -> Result<Option<Toggle>> {
    bridge
        .call_as(
            Request::new("checkBluetoothEnabled", json!({}))
                .fixture("checkBluetooth")
                .reshape(as_toggle),
        )
        .await
}

pub async fn set_dark_mode(bridge: &Bridge, enabled: bool) -> Result<()> {
    info!(enabled, "Setting dark mode");
    bridge
        .fire(
            Request::new("setDarkModeEnabled", json!({ "enabled": enabled })).fixture("setDarkMode"),
        )
        .await
}

pub async fn check_dark_mode(bridge: &Bridge) -> Result<Option<Toggle>> {
    bridge
        .call_as(
            Request::new("checkDarkModeEnabled", json!({}))
                .fixture("checkDarkMode")
                .reshape(as_toggle),
        )
        .await
}

pub async fn set_do_not_disturb(bridge: &Bridge, enabled: bool) -> Result<()> {
    info!(enabled, "Setting do not disturb");
    let script = if enabled { DND_ON } else { DND_OFF };
    bridge
        .fire(system_command("/bin/bash", &["-c", script]).fixture("setDoNotDisturb"))
        .await
}

pub async fn check_do_not_disturb(bridge: &Bridge) -> Result<Option<Toggle>> {
    bridge
        .call_as(
            system_command(
                "/usr/bin/defaults",
                &[
                    "-currentHost",
                    "read",
                    "com.apple.notificationcenterui",
                    "doNotDisturb",
                ],
            )
            .fixture("checkDoNotDisturb")
            .reshape(output_contains("1")),
        )
        .await
}

pub async fn set_volume(bridge: &Bridge, mute: bool) -> Result<()> {
    info!(mute, "Setting output mute");
    let script = format!(
        "set volume {} output muted",
        if mute { "with" } else { "without" }
    );
    bridge.fire(applescript(script).fixture("setVolume")).await
}

pub async fn check_volume(bridge: &Bridge) -> Result<Option<MuteState>> {
    bridge
        .call_as(
            applescript("output muted of (get volume settings)")
                .fixture("checkVolume")
                .reshape(|reply| Ok(json!({ "mute": truthy(&reply) }))),
        )
        .await
}
