//! Applications, bookmarks, preference panes and contacts known to the system

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::files::user_home;
use crate::bridge::{Bridge, FieldSchema, QueryRequest, Request};
use crate::error::Result;
use crate::protocol::QueryDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub bundle_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePane {
    pub name: String,
    pub path: String,
}

/// Resolve a leading `~` in each directory against `home`
pub fn expand_directories(directories: &[String], home: &str) -> Vec<String> {
    directories
        .iter()
        .map(|dir| shellexpand::tilde_with_context(dir, || Some(home)).into_owned())
        .collect()
}

/// Installed applications, optionally restricted to `directories`
///
/// The user home is only fetched when some directory needs tilde expansion.
pub async fn fetch_applications(
    bridge: &Bridge,
    directories: &[String],
) -> Result<BoxStream<'static, Result<Vec<Application>>>> {
    let directories = if directories.iter().any(|dir| dir.starts_with('~')) {
        match user_home(bridge).await? {
            Some(home) => expand_directories(directories, &home),
            None => directories.to_vec(),
        }
    } else {
        directories.to_vec()
    };
    debug!(?directories, "Fetching applications");

    let descriptor = QueryDescriptor::new(r#"kMDItemContentTypeTree == "com.apple.application""#)
        .attributes(["kMDItemDisplayName", "kMDItemCFBundleIdentifier"])
        .directories(directories);
    let stream = bridge.query(QueryRequest::new(
        "fetchApplications",
        descriptor,
        FieldSchema::new(["name", "bundleId"]),
    ))?;
    Ok(stream.typed())
}

pub fn fetch_bookmarks(bridge: &Bridge) -> Result<BoxStream<'static, Result<Vec<Bookmark>>>> {
    let descriptor = QueryDescriptor::new(r#"kMDItemContentTypeTree == "com.apple.safari.bookmark""#)
        .attributes(["kMDItemDisplayName", "kMDItemURL"]);
    let stream = bridge.query(QueryRequest::new(
        "fetchBookmarks",
        descriptor,
        FieldSchema::new(["name", "url"]),
    ))?;
    Ok(stream.typed())
}

pub fn fetch_preference_panes(
    bridge: &Bridge,
) -> Result<BoxStream<'static, Result<Vec<PreferencePane>>>> {
    let descriptor =
        QueryDescriptor::new(r#"kMDItemContentType == "com.apple.systempreference.prefpane""#)
            .attributes(["kMDItemDisplayName", "kMDItemPath"]);
    let stream = bridge.query(QueryRequest::new(
        "fetchPreferencePanes",
        descriptor,
        FieldSchema::new(["name", "path"]),
    ))?;
    Ok(stream.typed())
}

pub async fn bundle_id_for_application(bridge: &Bridge, name: &str) -> Result<Option<String>> {
    bridge
        .call_as(
            Request::new("bundleIdForApplicationName", json!({ "name": name }))
                .fixture("bundleIdForApplication"),
        )
        .await
}

pub async fn fetch_user_contact(bridge: &Bridge) -> Result<Option<Value>> {
    bridge
        .call(Request::new("userContact", json!({})).fixture("userContact"))
        .await
}

pub async fn fetch_contacts(bridge: &Bridge) -> Result<Option<Value>> {
    bridge
        .call(Request::new("allContacts", json!({})).fixture("contacts"))
        .await
}
