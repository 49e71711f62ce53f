//! Files, URLs and the user's home directory

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::bridge::{Bridge, FieldSchema, QueryRequest, Request, DEMO_USER_HOME};
use crate::error::Result;
use crate::escape::{spotlight_match, MatchKind};
use crate::protocol::QueryDescriptor;

/// Maximum hits per file search
pub const FILE_SEARCH_LIMIT: u32 = 10;

/// Content types that are not "files" from the user's point of view
const EXCLUDED_CONTENT_TYPES: &[&str] = &[
    "com.apple.application",
    "com.apple.application-bundle",
    "com.apple.safari.bookmark",
    "public.contact",
    "com.apple.safari.history",
    "public.calendar-event",
    "com.apple.ichat.transcript",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHit {
    pub path: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Index query for files whose name begins with `text`
pub fn file_search_query(text: &str) -> String {
    let mut clauses = vec![
        spotlight_match("kMDItemFSName", text, MatchKind::BeginsWith),
        r#"kMDItemSupportFileType != "MDSystemFile""#.to_string(),
    ];
    clauses.extend(
        EXCLUDED_CONTENT_TYPES
            .iter()
            .map(|content_type| format!("kMDItemContentTypeTree != \"{}\"", content_type)),
    );
    clauses.join(" && ")
}

/// Live-updating search over file names
pub fn search_files(bridge: &Bridge, text: &str) -> Result<BoxStream<'static, Result<Vec<FileHit>>>> {
    let descriptor = QueryDescriptor::new(file_search_query(text))
        .attributes(["kMDItemPath", "kMDItemContentType"])
        .limit(FILE_SEARCH_LIMIT);
    let stream = bridge.query(QueryRequest::new(
        "searchFiles",
        descriptor,
        FieldSchema::new(["path", "contentType"]),
    ))?;
    Ok(stream.typed())
}

/// Listing of a directory as reported by the host
///
/// Demo fixtures are keyed `rootFiles:<absolute path>`, with a leading `~`
/// resolved against the demo home.
pub async fn fetch_directory_contents(bridge: &Bridge, path: &str) -> Result<Option<Value>> {
    let fixture_path = match path.strip_prefix('~') {
        Some(rest) => format!("{}{}", DEMO_USER_HOME, rest),
        None => path.to_string(),
    };
    bridge
        .call(
            Request::new("getDirectoryContents", json!({ "path": path }))
                .fixture(format!("rootFiles:{}", fixture_path)),
        )
        .await
}

pub async fn user_home(bridge: &Bridge) -> Result<Option<String>> {
    bridge
        .call_as(Request::new("getUserHome", json!({})).fixture("userHome"))
        .await
}

pub async fn open_url(bridge: &Bridge, url: &str) -> Result<()> {
    info!(url, "Opening URL");
    bridge
        .fire(Request::new("openURL", json!({ "url": url })).fixture("openURL"))
        .await
}

pub async fn open_file(bridge: &Bridge, path: &str) -> Result<()> {
    info!(path, "Opening file");
    bridge
        .fire(Request::new("openFile", json!({ "path": path })).fixture("openFile"))
        .await
}
