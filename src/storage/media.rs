//! Blob storage for uploaded audio and cover images.
//!
//! Records point at blobs with references shaped `blobstore:<kind>:<id>`.

use std::{fmt::Display, str::FromStr, time::SystemTime};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::storage::{
    db::system_time_to_i64,
    error::StorageError,
    schema::{BYTES, CREATED_AT, ID, KIND, MEDIA, MIME_TYPE},
};

pub const MEDIA_REF_PREFIX: &str = "blobstore";
/// prefix of references written by the browser store, read as [`MEDIA_REF_PREFIX`]
pub const LEGACY_MEDIA_REF_PREFIX: &str = "indexeddb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}

impl FromStr for MediaKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "image" => Ok(MediaKind::Image),
            other => Err(StorageError::InvalidMediaRef(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub id: String,
}

impl MediaRef {
    pub fn new(kind: MediaKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn is_reference(s: &str) -> bool {
        [MEDIA_REF_PREFIX, LEGACY_MEDIA_REF_PREFIX]
            .iter()
            .any(|prefix| s.starts_with(&format!("{prefix}:")))
    }
}

impl Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{MEDIA_REF_PREFIX}:{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for MediaRef {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StorageError::InvalidMediaRef(s.to_string());

        let parts: Vec<&str> = s.split(':').collect();
        let [prefix, kind, id] = parts.as_slice() else {
            return Err(invalid());
        };
        if !matches!(*prefix, MEDIA_REF_PREFIX | LEGACY_MEDIA_REF_PREFIX) || id.is_empty() {
            return Err(invalid());
        }
        let kind = kind.parse().map_err(|_| invalid())?;

        Ok(MediaRef::new(kind, *id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub reference: MediaRef,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Stores the blob, replacing any previous one with the same kind and id.
pub fn save_media(
    conn: &Connection,
    kind: MediaKind,
    id: &str,
    bytes: &[u8],
    mime_type: &str,
) -> Result<MediaRef, StorageError> {
    let now = system_time_to_i64(SystemTime::now())?;

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {MEDIA} ({KIND}, {ID}, {MIME_TYPE}, {BYTES}, {CREATED_AT})
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![kind.as_str(), id, mime_type, bytes, now],
    )?;

    let reference = MediaRef::new(kind, id);
    log::debug!("stored {} bytes as {reference}", bytes.len());
    Ok(reference)
}

pub fn load_media(conn: &Connection, reference: &MediaRef) -> Result<Option<MediaFile>, StorageError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {MIME_TYPE}, {BYTES}, {CREATED_AT} FROM {MEDIA}
                 WHERE {KIND} = ?1 AND {ID} = ?2"
            ),
            params![reference.kind.as_str(), reference.id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    Ok(row.map(|(mime_type, bytes, created_at)| MediaFile {
        reference: reference.clone(),
        mime_type,
        bytes,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
    }))
}

pub fn delete_media(conn: &Connection, reference: &MediaRef) -> Result<bool, StorageError> {
    let removed = conn.execute(
        &format!("DELETE FROM {MEDIA} WHERE {KIND} = ?1 AND {ID} = ?2"),
        params![reference.kind.as_str(), reference.id],
    )?;
    Ok(removed > 0)
}

/// MIME type for an uploaded file name
pub fn mime_for_path(path: &std::path::Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_media_ref() -> anyhow::Result<()> {
        let r: MediaRef = "blobstore:audio:local_1_abc".parse()?;
        assert_eq!(r, MediaRef::new(MediaKind::Audio, "local_1_abc"));
        assert_eq!(r.to_string(), "blobstore:audio:local_1_abc");

        let r: MediaRef = "blobstore:image:x".parse()?;
        assert_eq!(r.kind, MediaKind::Image);
        Ok(())
    }

    #[test]
    fn test_parse_legacy_media_ref() -> anyhow::Result<()> {
        assert!(MediaRef::is_reference("indexeddb:audio:local_1_abc"));

        let r: MediaRef = "indexeddb:audio:local_1_abc".parse()?;
        assert_eq!(r, MediaRef::new(MediaKind::Audio, "local_1_abc"));
        // written back under the current prefix
        assert_eq!(r.to_string(), "blobstore:audio:local_1_abc");
        Ok(())
    }

    #[test]
    fn test_parse_media_ref_rejects_malformed() {
        for bad in [
            "https://cdn.example/a.mp3",
            "blobstore:video:x",
            "blobstore:audio",
            "blobstore:audio:",
            "blobstore:audio:a:b",
            "indexeddb:video:x",
            "localstore:audio:x",
        ] {
            assert!(bad.parse::<MediaRef>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_is_reference() {
        assert!(MediaRef::is_reference("blobstore:audio:x"));
        assert!(!MediaRef::is_reference("/assets/default-cover.png"));
    }

    #[test]
    fn test_save_and_load_media() -> anyhow::Result<()> {
        let conn = conn();
        let reference = save_media(&conn, MediaKind::Audio, "m1", b"ID3", "audio/mpeg")?;

        let file = load_media(&conn, &reference)?.unwrap();
        assert_eq!(file.bytes, b"ID3");
        assert_eq!(file.mime_type, "audio/mpeg");

        // kinds are separate stores
        assert!(load_media(&conn, &MediaRef::new(MediaKind::Image, "m1"))?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_media_replaces() -> anyhow::Result<()> {
        let conn = conn();
        save_media(&conn, MediaKind::Image, "m1", b"old", "image/png")?;
        let reference = save_media(&conn, MediaKind::Image, "m1", b"new", "image/jpeg")?;

        let file = load_media(&conn, &reference)?.unwrap();
        assert_eq!(file.bytes, b"new");
        assert_eq!(file.mime_type, "image/jpeg");

        assert!(delete_media(&conn, &reference)?);
        assert!(load_media(&conn, &reference)?.is_none());
        Ok(())
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(std::path::Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_for_path(std::path::Path::new("a.unknownext")), "application/octet-stream");
    }
}
