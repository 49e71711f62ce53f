//! Open windows and browser tabs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::applescript;
use crate::bridge::{Bridge, FieldSchema, Layout, Mode};
use crate::error::Result;
use crate::escape::applescript_string;

const OPEN_WINDOWS_SCRIPT: &str = r#"on run
  tell application "System Events"
    set allWindows to {}
    repeat with proc in (processes where background only is false)
      repeat with win in proc's windows
        if win's subrole is "AXStandardWindow" then
          set end of allWindows to {{proc's id, win's name}, win's title, my hasCloseButton(win)}
        end if
      end repeat
    end repeat
  end tell
  return allWindows
end run

on hasCloseButton(win)
  tell application "System Events"
    repeat with butt in win's buttons
      if butt's subrole is "AXCloseButton" then
        return true
      end if
    end repeat
    return false
  end tell
end hasCloseButton"#;

const BROWSER_TABS_SCRIPT: &str = r#"set safariTabs to {}

if is_running("Safari") then
  set safariTabs to run script "
    set allTabs to {}
    tell application \"Safari\"
      repeat with win in (windows where visible is true)
        repeat with t in win's tabs
          set end of allTabs to {\"Safari\", {\"Safari\", {win's index, t's index}}, t's name}
        end repeat
      end repeat
    end tell
    return allTabs
  "
end if

on is_running(appName)
  tell application "System Events" to (name of processes) contains appName
end is_running

return safariTabs"#;

/// Process id and window name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowId(pub i64, pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub id: WindowId,
    pub name: Value,
    pub closeable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub app_name: String,
    /// `[appName, tabRef]`; the shape of `tabRef` depends on the browser
    pub id: Value,
    pub name: String,
}

pub async fn fetch_open_windows(bridge: &Bridge) -> Result<Option<Vec<OpenWindow>>> {
    bridge
        .call_as(
            applescript(OPEN_WINDOWS_SCRIPT)
                .fixture("fetchOpenWindows")
                .decode(FieldSchema::new(["id", "name", "closeable"]), Layout::Rows),
        )
        .await
}

fn activate_window_script(id: &WindowId) -> String {
    format!(
        r#"tell application "System Events"
  set proc to first process whose background only is false and id is {}
  set win to proc's first window whose name is {}
  perform action "AXRaise" of win
  set proc's frontmost to true
end tell"#,
        id.0,
        applescript_string(&id.1)
    )
}

pub async fn activate_open_window(bridge: &Bridge, id: &WindowId) -> Result<()> {
    info!(pid = id.0, window = %id.1, "Activating window");
    bridge
        .fire(applescript(activate_window_script(id)).fixture("activateOpenWindow"))
        .await
}

pub async fn fetch_browser_tabs(bridge: &Bridge) -> Result<Option<Vec<BrowserTab>>> {
    bridge
        .call_as(
            applescript(BROWSER_TABS_SCRIPT)
                .fixture("fetchBrowserTabs")
                .decode(FieldSchema::new(["appName", "id", "name"]), Layout::Rows),
        )
        .await
}

fn activate_tab_script(id: &Value) -> Result<Option<String>> {
    let (app_name, tab_ref): (String, Value) = serde_json::from_value(id.clone())?;
    let script = match app_name.as_str() {
        "Google Chrome" => {
            let tab_id: i64 = serde_json::from_value(tab_ref)?;
            format!(
                r#"tell application "Google Chrome"
  repeat with wi from 1 to count windows
    repeat with ti from 1 to count (window wi's tabs)
      if id of window wi's tab ti is {} then
        set theTab to ti
        set theWin to wi
      end if
    end repeat
  end repeat
  set window theWin's active tab index to theTab
  set window theWin's index to 1
  activate
end tell"#,
                tab_id
            )
        }
        "Safari" => {
            let (window_index, tab_index): (u32, u32) = serde_json::from_value(tab_ref)?;
            format!(
                r#"tell application "Safari"
  activate
  set win to window {}
  set win's current tab to win's tab {}
  set win's index to 1
end tell"#,
                window_index, tab_index
            )
        }
        other => {
            debug!(app = other, "No tab activation for browser");
            return Ok(None);
        }
    };
    Ok(Some(script))
}

/// Focus a tab by the `id` reported in [`BrowserTab`]
///
/// Outside live mode nothing is sent, so `id` is not inspected.
pub async fn activate_browser_tab(bridge: &Bridge, id: &Value) -> Result<()> {
    if bridge.mode() != Mode::Live {
        debug!(mode = %bridge.mode(), "Skipping tab activation");
        return Ok(());
    }
    match activate_tab_script(id)? {
        Some(script) => {
            bridge
                .fire(applescript(script).fixture("activateBrowserTab"))
                .await
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::StaticFixtures;
    use crate::capabilities::test_support::{demo, live, settle};
    use crate::error::{BridgeError, DecodeError};
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_open_windows_decoded_row_major() {
        let (bridge, host) = live();
        let windows = settle(
            &host,
            fetch_open_windows(&bridge),
            Ok(json!([
                [[412, "Inbox"], "Inbox (3)", true],
                [[98, "Untitled"], "Untitled", false]
            ])),
        )
        .unwrap()
        .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].id, WindowId(412, "Inbox".into()));
        assert_eq!(windows[0].name, json!("Inbox (3)"));
        assert!(windows[0].closeable);
        assert!(!windows[1].closeable);
    }

    #[test]
    fn test_open_windows_misshapen_reply() {
        let (bridge, host) = live();
        let err = settle(&host, fetch_open_windows(&bridge), Ok(json!([[1, "x"]]))).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(DecodeError::RowArity { .. })));
    }

    #[test]
    fn test_open_windows_demo_is_empty() {
        let bridge = demo(StaticFixtures::builtin());
        assert_eq!(block_on(fetch_open_windows(&bridge)).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_activate_window_escapes_name() {
        let script = activate_window_script(&WindowId(7, r#"Report "final""#.into()));
        assert!(script.contains("id is 7"));
        assert!(script.contains(r#"whose name is "Report \"final\"""#));
    }

    #[test]
    fn test_browser_tabs_decoded() {
        let (bridge, host) = live();
        let tabs = settle(
            &host,
            fetch_browser_tabs(&bridge),
            Ok(json!([["Safari", ["Safari", [1, 2]], "Docs"]])),
        )
        .unwrap()
        .unwrap();
        assert_eq!(tabs[0].app_name, "Safari");
        assert_eq!(tabs[0].id, json!(["Safari", [1, 2]]));
        assert_eq!(tabs[0].name, "Docs");
    }

    #[test]
    fn test_activate_tab_scripts() {
        let safari = activate_tab_script(&json!(["Safari", [3, 4]])).unwrap().unwrap();
        assert!(safari.contains("set win to window 3"));
        assert!(safari.contains("win's tab 4"));

        let chrome = activate_tab_script(&json!(["Google Chrome", 1187])).unwrap().unwrap();
        assert!(chrome.contains("is 1187 then"));

        assert!(activate_tab_script(&json!(["Firefox", 1])).unwrap().is_none());
        assert!(matches!(
            activate_tab_script(&json!("nope")),
            Err(BridgeError::Malformed(_))
        ));
    }

    #[test]
    fn test_activate_unknown_browser_sends_nothing() {
        let (bridge, host) = live();
        block_on(activate_browser_tab(&bridge, &json!(["Firefox", 1]))).unwrap();
        assert_eq!(host.sent_count(), 0);
    }

    #[test]
    fn test_activate_tab_ignores_id_outside_live_mode() {
        let malformed = json!({"not": "a tab"});
        let bridge = Bridge::unsupported();
        assert!(block_on(activate_browser_tab(&bridge, &malformed)).is_ok());

        let bridge = demo(StaticFixtures::builtin());
        assert!(block_on(activate_browser_tab(&bridge, &malformed)).is_ok());

        let (bridge, host) = live();
        assert!(matches!(
            block_on(activate_browser_tab(&bridge, &malformed)),
            Err(BridgeError::Malformed(_))
        ));
        assert_eq!(host.sent_count(), 0);
    }
}
