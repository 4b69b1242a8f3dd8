//! Typed record collections stored as JSON arrays in the `kv` table.
//!
//! Collections are ordered newest first. A collection that fails to parse is
//! logged and read as empty; it is not an error for the caller.

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    domain::{
        Patch, campaign::Campaign, investment::Investment, music::Music, play::PlayEvent,
        progress::UserProgress,
    },
    storage::{
        error::StorageError,
        schema::{KEY, KV, VALUE, keys},
    },
};

/// A record kept in one named collection
pub trait Record: Serialize + DeserializeOwned + Clone {
    const KEY: &'static str;

    fn id(&self) -> &str;
}

impl Record for Music {
    const KEY: &'static str = keys::MUSIC;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Campaign {
    const KEY: &'static str = keys::CAMPAIGNS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Investment {
    const KEY: &'static str = keys::INVESTMENTS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for PlayEvent {
    const KEY: &'static str = keys::PLAY_HISTORY;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for UserProgress {
    const KEY: &'static str = keys::USER_PROGRESS;

    fn id(&self) -> &str {
        &self.user_id
    }
}

pub fn read_raw(conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
    Ok(conn
        .query_row(
            &format!("SELECT {VALUE} FROM {KV} WHERE {KEY} = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn write_raw(conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        &format!(
            "INSERT INTO {KV} ({KEY}, {VALUE}) VALUES (?1, ?2)
             ON CONFLICT({KEY}) DO UPDATE SET {VALUE} = excluded.{VALUE}"
        ),
        params![key, value],
    )?;
    Ok(())
}

/// Full collection in storage order
pub fn get_all<T: Record>(conn: &Connection) -> Result<Vec<T>, StorageError> {
    let Some(raw) = read_raw(conn, T::KEY)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(records) => Ok(records),
        Err(e) => {
            log::warn!("collection {} is unreadable, treating it as empty: {e}", T::KEY);
            Ok(Vec::new())
        }
    }
}

pub fn put_all<T: Record>(conn: &Connection, records: &[T]) -> Result<(), StorageError> {
    let raw = serde_json::to_string(records)?;
    write_raw(conn, T::KEY, &raw)
}

pub fn get<T: Record>(conn: &Connection, id: &str) -> Result<Option<T>, StorageError> {
    Ok(get_all::<T>(conn)?.into_iter().find(|r| r.id() == id))
}

/// Prepends the record. Ids are not checked for duplicates.
pub fn save<T: Record>(conn: &Connection, record: T) -> Result<(), StorageError> {
    let mut records = get_all::<T>(conn)?;
    records.insert(0, record);
    put_all(conn, &records)
}

/// Applies `patch` to the first record with `id`. Returns false, writing nothing, if none matches.
pub fn update<T: Record, P: Patch<T>>(
    conn: &Connection,
    id: &str,
    patch: P,
) -> Result<bool, StorageError> {
    let mut records = get_all::<T>(conn)?;
    let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
        log::debug!("update of {id} in {} matched nothing", T::KEY);
        return Ok(false);
    };
    patch.apply(record);
    put_all(conn, &records)?;
    Ok(true)
}

/// Removes every record with `id`, returns how many were removed
pub fn delete<T: Record>(conn: &Connection, id: &str) -> Result<usize, StorageError> {
    let mut records = get_all::<T>(conn)?;
    let before = records.len();
    records.retain(|r| r.id() != id);
    let removed = before - records.len();
    if removed > 0 {
        put_all(conn, &records)?;
    }
    Ok(removed)
}

pub fn clear(conn: &Connection, key: &str) -> Result<(), StorageError> {
    conn.execute(&format!("DELETE FROM {KV} WHERE {KEY} = ?1"), params![key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            amount::Amount,
            campaign::CampaignPatch,
            fixtures::{campaign, investment, music, plays},
            music::MusicPatch,
        },
        storage::schema,
    };

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        conn
    }

    #[test]
    fn test_missing_collection_is_empty() -> anyhow::Result<()> {
        let conn = conn();
        assert!(get_all::<Music>(&conn)?.is_empty());
        assert!(get::<Music>(&conn, "m1")?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_prepends() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, music("m1", "a"))?;
        save(&conn, music("m2", "a"))?;
        save(&conn, music("m3", "a"))?;

        let ids: Vec<String> = get_all::<Music>(&conn)?.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m3", "m2", "m1"]);
        Ok(())
    }

    #[test]
    fn test_saved_record_present_once() -> anyhow::Result<()> {
        let conn = conn();
        for n in 0..5 {
            save(&conn, music(&format!("m{n}"), "a"))?;
        }

        let all = get_all::<Music>(&conn)?;
        assert_eq!(all.iter().filter(|m| m.id == "m3").count(), 1);
        assert_eq!(all[0].id, "m4");
        Ok(())
    }

    #[test]
    fn test_duplicate_ids_are_kept() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, music("m1", "a"))?;
        save(&conn, music("m1", "b"))?;

        assert_eq!(get_all::<Music>(&conn)?.len(), 2);
        // the newest one is found first
        assert_eq!(get::<Music>(&conn, "m1")?.unwrap().creator_address, "b");

        assert_eq!(delete::<Music>(&conn, "m1")?, 2);
        assert!(get_all::<Music>(&conn)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_update_first_match() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, music("m1", "a"))?;
        save(&conn, music("m2", "a"))?;

        let matched = update::<Music, _>(
            &conn,
            "m1",
            MusicPatch {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )?;

        assert!(matched);
        assert_eq!(get::<Music>(&conn, "m1")?.unwrap().title, "Renamed");
        assert_eq!(get::<Music>(&conn, "m2")?.unwrap().title, "Song m2");
        Ok(())
    }

    #[test]
    fn test_update_missing_id_is_noop() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, campaign("c1", "m1", 30.0))?;
        let before = read_raw(&conn, keys::CAMPAIGNS)?;

        let matched = update::<Campaign, _>(
            &conn,
            "nope",
            CampaignPatch {
                goal: Some(Amount(1.0)),
                ..Default::default()
            },
        )?;

        assert!(!matched);
        assert_eq!(read_raw(&conn, keys::CAMPAIGNS)?, before);
        Ok(())
    }

    #[test]
    fn test_delete_missing_id_is_noop() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, music("m1", "a"))?;

        assert_eq!(delete::<Music>(&conn, "other")?, 0);
        assert_eq!(get_all::<Music>(&conn)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_corrupt_collection_reads_empty() -> anyhow::Result<()> {
        let conn = conn();
        write_raw(&conn, keys::MUSIC, "{not json")?;

        assert!(get_all::<Music>(&conn)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_roundtrip_preserves_records() -> anyhow::Result<()> {
        let conn = conn();
        let mut inv = investment("i1", "c1", "fan", 0.1);
        inv.raised_at_investment = Some(Amount(123.456));
        let events = plays("m1", 3);

        save(&conn, inv.clone())?;
        put_all(&conn, &events)?;

        assert_eq!(get_all::<Investment>(&conn)?, vec![inv]);
        assert_eq!(get_all::<PlayEvent>(&conn)?, events);
        Ok(())
    }

    #[test]
    fn test_persisted_json_uses_camel_case() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, campaign("c1", "m1", 30.0))?;

        let raw = read_raw(&conn, keys::CAMPAIGNS)?.unwrap();
        assert!(raw.contains("\"musicTokenId\":\"m1\""));
        assert!(raw.contains("\"currentAmount\":\"0\""));
        assert!(raw.contains("\"status\":\"active\""));
        Ok(())
    }

    #[test]
    fn test_clear_removes_collection() -> anyhow::Result<()> {
        let conn = conn();
        save(&conn, music("m1", "a"))?;
        clear(&conn, keys::MUSIC)?;

        assert!(read_raw(&conn, keys::MUSIC)?.is_none());
        Ok(())
    }
}
