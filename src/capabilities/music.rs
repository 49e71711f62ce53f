//! Music library and playback

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{applescript, as_int, as_text};
use crate::bridge::{Bridge, FieldSchema, Layout, Record};
use crate::error::Result;

const LIBRARY_SCRIPT: &str = r#"tell application "iTunes" to get {name, album, artist, album artist, composer, genre, year, disc number, track number, database ID} of every track of first library playlist"#;

/// Column order of [`LIBRARY_SCRIPT`]'s reply
const LIBRARY_FIELDS: [&str; 10] = [
    "name",
    "album",
    "artist",
    "albumArtist",
    "composer",
    "genre",
    "year",
    "discNumber",
    "trackNumber",
    "id",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    pub album: String,
    /// Album artist when set, otherwise the track artist
    pub artist: String,
    pub composer: String,
    pub genre: String,
    pub year: i64,
    pub disc_number: i64,
    pub track_number: i64,
    pub id: i64,
}

impl Track {
    fn from_record(record: &Record) -> Self {
        let album_artist = as_text(record.get("albumArtist"));
        let artist = if album_artist.is_empty() {
            as_text(record.get("artist"))
        } else {
            album_artist
        };
        Self {
            name: as_text(record.get("name")),
            album: as_text(record.get("album")),
            artist,
            composer: as_text(record.get("composer")),
            genre: as_text(record.get("genre")),
            year: record.get("year").map(as_int).unwrap_or(0),
            disc_number: record.get("discNumber").map(as_int).unwrap_or(0),
            track_number: record.get("trackNumber").map(as_int).unwrap_or(0),
            id: record.get("id").map(as_int).unwrap_or(0),
        }
    }

    fn sort_key(&self) -> (&str, i64, &str, i64, i64, i64) {
        (
            &self.artist,
            self.year,
            &self.album,
            self.disc_number,
            self.track_number,
            self.id,
        )
    }
}

/// Column-major library reply → tracks ordered by artist, year, album, disc,
/// track, id
fn arrange_library(reply: Value) -> Result<Value> {
    let records = FieldSchema::new(LIBRARY_FIELDS).decode(Layout::Columns, &reply)?;
    let mut tracks: Vec<Track> = records.iter().map(Track::from_record).collect();
    tracks.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    debug!(count = tracks.len(), "Arranged music library");
    Ok(serde_json::to_value(tracks)?)
}

pub async fn fetch_music(bridge: &Bridge) -> Result<Option<Vec<Track>>> {
    bridge
        .call_as(
            applescript(LIBRARY_SCRIPT)
                .fixture("fetchMusic")
                .reshape(arrange_library),
        )
        .await
}

fn play_ids_script(ids: &[i64]) -> String {
    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"tell application "iTunes"
  if user playlist "Lacona Playlist" exists then
    try
      delete user playlist "Lacona Playlist"
    end try
  end if

  make new user playlist with properties {{name:"Lacona Playlist", shuffle:false}}

  repeat with tid in {{{}}}
    set trk to (some track of first user playlist whose database ID is tid)
    duplicate trk to end of user playlist "Lacona Playlist"
  end repeat

  play user playlist "Lacona Playlist"
end tell"#,
        ids
    )
}

/// Replace the Lacona playlist with `ids` and start playing it
pub async fn play_song_ids(bridge: &Bridge, ids: &[i64]) -> Result<()> {
    info!(count = ids.len(), "Playing songs");
    bridge
        .fire(applescript(play_ids_script(ids)).fixture("playSongIds"))
        .await
}

async fn transport_command(bridge: &Bridge, fixture: &str, command: &str) -> Result<()> {
    info!(command, "Music control");
    bridge
        .fire(applescript(format!(r#"tell application "iTunes" to {}"#, command)).fixture(fixture))
        .await
}

pub async fn music_play(bridge: &Bridge) -> Result<()> {
    transport_command(bridge, "musicPlay", "play").await
}

pub async fn music_pause(bridge: &Bridge) -> Result<()> {
    transport_command(bridge, "musicPause", "pause").await
}

pub async fn music_next(bridge: &Bridge) -> Result<()> {
    transport_command(bridge, "musicNext", "next track").await
}

pub async fn music_previous(bridge: &Bridge) -> Result<()> {
    transport_command(bridge, "musicPrevious", "previous track").await
}

pub async fn music_stop(bridge: &Bridge) -> Result<()> {
    transport_command(bridge, "musicStop", "stop").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::StaticFixtures;
    use crate::capabilities::test_support::{demo, live, settle};
    use crate::error::{BridgeError, DecodeError};
    use futures::executor::block_on;
    use serde_json::json;

    fn library_reply() -> Value {
        json!([
            ["Help!", "Yesterday", "Come Together"],
            ["Help!", "Help!", "Abbey Road"],
            ["The Beatles", "Paul McCartney", "The Beatles"],
            ["", "The Beatles", ""],
            ["Lennon", "McCartney", "Lennon"],
            ["Rock", "Rock", "Rock"],
            [1965, "1965", 1969],
            [1, 1, 1],
            ["1", "13", 1],
            [30, 10, 20]
        ])
    }

    #[test]
    fn test_library_decoded_and_sorted() {
        let (bridge, host) = live();
        let tracks = settle(&host, fetch_music(&bridge), Ok(library_reply()))
            .unwrap()
            .unwrap();

        let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Help!", "Yesterday", "Come Together"]);

        // Album artist wins over track artist
        assert_eq!(tracks[1].artist, "The Beatles");
        assert_eq!(tracks[1].year, 1965);
        assert_eq!(tracks[1].track_number, 13);
        assert_eq!(tracks[2].id, 20);
    }

    #[test]
    fn test_numeric_fields_sort_numerically() {
        let reply = json!([
            ["B", "A"],
            ["Album", "Album"],
            ["X", "X"],
            ["", ""],
            ["", ""],
            ["", ""],
            [2000, 2000],
            [1, 1],
            ["10", "9"],
            [1, 2]
        ]);
        let arranged = arrange_library(reply).unwrap();
        assert_eq!(arranged[0]["name"], "A");
        assert_eq!(arranged[0]["trackNumber"], 9);
        assert_eq!(arranged[1]["trackNumber"], 10);
    }

    #[test]
    fn test_ragged_library_is_decode_error() {
        let (bridge, host) = live();
        let mut reply = library_reply();
        reply[9] = json!([30, 10]);
        let err = settle(&host, fetch_music(&bridge), Ok(reply)).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(DecodeError::RaggedColumns { .. })));
    }

    #[test]
    fn test_empty_library() {
        let (bridge, host) = live();
        let tracks = settle(&host, fetch_music(&bridge), Ok(Value::Null)).unwrap();
        assert_eq!(tracks, Some(vec![]));
    }

    #[test]
    fn test_play_song_ids_script() {
        let script = play_ids_script(&[12, 7]);
        assert!(script.contains("repeat with tid in {12,7}"));
        assert!(script.contains(r#"{name:"Lacona Playlist", shuffle:false}"#));
    }

    #[test]
    fn test_transport_commands() {
        let (bridge, host) = live();
        settle(&host, music_next(&bridge), Ok(Value::Null)).unwrap();
        assert_eq!(
            host.sent()[0].payload["script"],
            r#"tell application "iTunes" to next track"#
        );
    }

    #[test]
    fn test_demo_music_fixture() {
        let bridge = demo(StaticFixtures::new().with(
            "fetchMusic",
            json!([{
                "name": "Song", "album": "A", "artist": "B", "composer": "", "genre": "",
                "year": 2001, "discNumber": 1, "trackNumber": 2, "id": 3
            }]),
        ));
        let tracks = block_on(fetch_music(&bridge)).unwrap().unwrap();
        assert_eq!(tracks[0].track_number, 2);
        assert!(block_on(music_play(&bridge)).is_ok());
    }
}
