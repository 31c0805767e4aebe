use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};

use reeltrack_core::{CatalogError, CatalogItem, CatalogStore, ItemStatus, NewItem};

const SELECT_ITEM: &str =
    "SELECT id, title, kind, year, poster, status, runtime, progress, date_added FROM items";

pub struct DbCatalog {
    conn: Mutex<Connection>,
}

impl DbCatalog {
    pub fn new(path: &str) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> SqlResult<()> {
        self.conn.lock().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                year TEXT,
                poster TEXT,
                status TEXT NOT NULL,
                runtime INTEGER NOT NULL DEFAULT 0,
                progress INTEGER NOT NULL DEFAULT 0,
                date_added TEXT NOT NULL DEFAULT ''
            );
            "
        )?;
        Ok(())
    }
}

fn storage(err: rusqlite::Error) -> CatalogError {
    tracing::error!(error = %err, "catalog storage failure");
    CatalogError::Storage(err.to_string())
}

fn item_from_row(row: &Row<'_>) -> SqlResult<CatalogItem> {
    let id: i64 = row.get(0)?;
    let status: String = row.get(5)?;
    let runtime: i64 = row.get(6)?;
    let progress: i64 = row.get(7)?;

    Ok(CatalogItem {
        id: id as u64,
        title: row.get(1)?,
        kind: row.get(2)?,
        year: row.get(3)?,
        poster: row.get(4)?,
        status: status.parse().unwrap_or(ItemStatus::WantToWatch),
        runtime: runtime.max(0) as u32,
        progress: progress.max(0) as u32,
        date_added: row.get(8)?,
    })
}

impl CatalogStore for DbCatalog {
    fn list(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("{SELECT_ITEM} ORDER BY id"))
            .map_err(storage)?;
        let rows = stmt.query_map([], item_from_row).map_err(storage)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(storage)
    }

    fn count(&self) -> Result<usize, CatalogError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(storage)?;
        Ok(count as usize)
    }

    fn append(&self, draft: NewItem, date_added: String) -> Result<CatalogItem, CatalogError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage)?;
        let next_id: i64 = tx
            .query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM items", [], |row| row.get(0))
            .map_err(storage)?;
        let item = CatalogItem::from_draft(next_id as u64, draft, date_added);
        tx.execute(
            "INSERT INTO items (id, title, kind, year, poster, status, runtime, progress, date_added)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                next_id,
                item.title,
                item.kind,
                item.year,
                item.poster,
                item.status.label(),
                item.runtime as i64,
                item.progress as i64,
                item.date_added,
            ],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)?;
        Ok(item)
    }

    fn remove(&self, id: u64) -> Result<bool, CatalogError> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM items WHERE id = ?1", params![id as i64])
            .map_err(storage)?;
        Ok(deleted > 0)
    }

    fn update_progress(&self, id: u64, progress: u32) -> Result<CatalogItem, CatalogError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE items SET progress = ?1 WHERE id = ?2",
                params![progress as i64, id as i64],
            )
            .map_err(storage)?;
        if changed == 0 {
            return Err(CatalogError::ItemNotFound(id));
        }
        conn.query_row(&format!("{SELECT_ITEM} WHERE id = ?1"), params![id as i64], item_from_row)
            .optional()
            .map_err(storage)?
            .ok_or(CatalogError::ItemNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, DbCatalog) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.db");
        let db = DbCatalog::new(path.to_str().expect("utf-8 path")).expect("open catalog");
        (dir, db)
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let (_dir, db) = open();
        let first = db.append(NewItem::new("Alien"), "2025-10-28".into()).expect("append");
        let second = db.append(NewItem::new("Aliens").with_runtime(137), String::new()).expect("append");
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let items = db.list().expect("list");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].date_added, "2025-10-28");
        assert_eq!(items[1].runtime, 137);
        assert_eq!(items[1].status, ItemStatus::WantToWatch);
    }

    #[test]
    fn remove_then_append_does_not_reuse_ids() {
        let (_dir, db) = open();
        for title in ["Alien", "Aliens", "Alien 3"] {
            db.append(NewItem::new(title), String::new()).expect("append");
        }
        assert!(db.remove(3).expect("remove"));
        assert!(db.remove(1).expect("remove"));
        assert_eq!(db.count().expect("count"), 1);

        let added = db.append(NewItem::new("Prometheus"), String::new()).expect("append");
        assert_eq!(added.id, 3);
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let (_dir, db) = open();
        db.append(NewItem::new("Heat"), String::new()).expect("append");
        assert!(!db.remove(42).expect("remove"));
        assert_eq!(db.count().expect("count"), 1);
    }

    #[test]
    fn update_progress_round_trips() {
        let (_dir, db) = open();
        let item = db.append(NewItem::new("Heat").with_runtime(170), String::new()).expect("append");
        let updated = db.update_progress(item.id, 95).expect("update");
        assert_eq!(updated.progress, 95);
        assert!(matches!(
            db.update_progress(99, 1),
            Err(CatalogError::ItemNotFound(99))
        ));
    }

    #[test]
    fn reopening_keeps_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.db");
        let path = path.to_str().expect("utf-8 path");
        {
            let db = DbCatalog::new(path).expect("open");
            db.append(NewItem::new("Heat"), String::new()).expect("append");
        }
        let db = DbCatalog::new(path).expect("reopen");
        assert_eq!(db.count().expect("count"), 1);
    }
}
