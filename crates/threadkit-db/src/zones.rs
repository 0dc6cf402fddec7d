use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use threadkit_types::models::{DeleteCounts, Zone};

use crate::Database;
use crate::cascade;
use crate::error::{Result, StoreError};
use crate::models::{ZONE_COLUMNS, ZoneRow};

impl Database {
    /// Return the zone for `entity_id`, creating it on first reference.
    ///
    /// Concurrent first calls for one entity all get the same id: the insert
    /// is a no-op when the unique `entity_id` already exists, and the winner's
    /// row is read back.
    pub fn get_or_create_zone(&self, entity_id: &str, metadata: Option<&Value>) -> Result<Uuid> {
        let now = self.now_millis();
        self.with_tx(|tx| {
            let metadata = metadata.map(serde_json::to_string).transpose()?;
            let inserted = tx.execute(
                "INSERT INTO zones (id, entity_id, metadata, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(entity_id) DO NOTHING",
                params![Uuid::now_v7().to_string(), entity_id, metadata, now],
            )?;

            let id: String = tx.query_row(
                "SELECT id FROM zones WHERE entity_id = ?1",
                [entity_id],
                |row| row.get(0),
            )?;

            if inserted > 0 {
                debug!("Created zone {} for entity {}", id, entity_id);
            }
            id.parse()
                .map_err(|_| StoreError::InvalidState(format!("corrupt zone id {}", id)))
        })
    }

    pub fn get_zone(&self, entity_id: &str) -> Result<Option<Zone>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM zones WHERE entity_id = ?1", ZONE_COLUMNS),
                    [entity_id],
                    ZoneRow::from_row,
                )
                .optional()?;
            Ok(row.map(ZoneRow::into_model))
        })
    }

    pub fn get_zone_by_id(&self, zone_id: Uuid) -> Result<Option<Zone>> {
        self.with_conn(|conn| {
            Ok(query_zone(conn, zone_id)?.map(ZoneRow::into_model))
        })
    }

    /// Replace the zone's metadata wholesale.
    pub fn update_zone_metadata(&self, zone_id: Uuid, metadata: Option<&Value>) -> Result<()> {
        self.with_tx(|tx| {
            let metadata = metadata.map(serde_json::to_string).transpose()?;
            let updated = tx.execute(
                "UPDATE zones SET metadata = ?2 WHERE id = ?1",
                params![zone_id.to_string(), metadata],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found("zone", zone_id));
            }
            Ok(())
        })
    }

    pub fn zone_thread_count(&self, zone_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM threads WHERE zone_id = ?1",
                [zone_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Delete the zone and everything under it.
    pub fn delete_zone(&self, zone_id: Uuid) -> Result<DeleteCounts> {
        let counts = self.with_tx(|tx| cascade::delete_zone(tx, zone_id))?;
        info!(
            "Deleted zone {} ({} threads, {} messages, {} reactions)",
            zone_id, counts.deleted_threads, counts.deleted_messages, counts.deleted_reactions
        );
        Ok(counts)
    }
}

pub(crate) fn query_zone(conn: &Connection, zone_id: Uuid) -> Result<Option<ZoneRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM zones WHERE id = ?1", ZONE_COLUMNS),
            [zone_id.to_string()],
            ZoneRow::from_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use serde_json::json;

    #[test]
    fn get_or_create_is_idempotent() {
        let (db, _) = testutil::db();
        let a = db.get_or_create_zone("doc-1", None).unwrap();
        let b = db.get_or_create_zone("doc-1", Some(&json!({"ignored": true}))).unwrap();
        assert_eq!(a, b);

        let zone = db.get_zone("doc-1").unwrap().unwrap();
        assert_eq!(zone.id, a);
        assert_eq!(zone.metadata, None);
        assert_eq!(zone.created_at.timestamp_millis(), testutil::START);
    }

    #[test]
    fn distinct_entities_get_distinct_zones() {
        let (db, _) = testutil::db();
        let a = db.get_or_create_zone("doc-1", None).unwrap();
        let b = db.get_or_create_zone("doc-2", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn get_does_not_create() {
        let (db, _) = testutil::db();
        assert!(db.get_zone("missing").unwrap().is_none());
        assert!(db.get_zone_by_id(Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn metadata_is_overwritten_not_merged() {
        let (db, _) = testutil::db();
        let id = db
            .get_or_create_zone("doc", Some(&json!({"a": 1, "b": 2})))
            .unwrap();
        db.update_zone_metadata(id, Some(&json!({"c": 3}))).unwrap();

        let zone = db.get_zone_by_id(id).unwrap().unwrap();
        assert_eq!(zone.metadata, Some(json!({"c": 3})));
    }

    #[test]
    fn update_metadata_on_missing_zone() {
        let (db, _) = testutil::db();
        let err = db.update_zone_metadata(Uuid::now_v7(), None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn racing_first_calls_agree() {
        let (db, _) = testutil::db();
        let db = std::sync::Arc::new(db);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.get_or_create_zone("hot", None).unwrap())
            })
            .collect();
        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
