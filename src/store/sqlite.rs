//! SQLite-backed batch repository and packaging transaction
//!
//! Batches are stored as a JSON body plus typed columns for querying; the
//! `revision` column is the optimistic-concurrency guard. All timestamps
//! are RFC 3339 strings.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::identity::BatchId;
use crate::core::packaging::PackPlan;
use crate::entities::batch::{Batch, BatchState, Grade};
use crate::entities::packaging::{MovementKind, PackingRecord, StockLevel, StockMovement};

use super::{BatchFilter, BatchRepository, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS batches (
    id          TEXT PRIMARY KEY,
    parent_id   TEXT,
    variety     TEXT NOT NULL,
    state       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    due_at      TEXT NOT NULL,
    revision    INTEGER NOT NULL,
    body        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_batches_state_variety ON batches(state, variety);

CREATE TABLE IF NOT EXISTS packing_records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id           TEXT NOT NULL,
    batch_id         TEXT NOT NULL,
    variety          TEXT NOT NULL,
    grade            TEXT NOT NULL,
    mass_consumed    REAL NOT NULL,
    units_attributed INTEGER NOT NULL,
    remaining_mass   REAL NOT NULL,
    operator         TEXT NOT NULL,
    timestamp        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory (
    variety TEXT NOT NULL,
    grade   TEXT NOT NULL,
    mass    REAL NOT NULL,
    PRIMARY KEY (variety, grade)
);

CREATE TABLE IF NOT EXISTS stock_movements (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    kind      TEXT NOT NULL,
    variety   TEXT NOT NULL,
    grade     TEXT NOT NULL,
    mass      REAL NOT NULL,
    reference TEXT NOT NULL,
    actor     TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS unit_counters (
    product_key TEXT PRIMARY KEY,
    units       INTEGER NOT NULL
);
";

/// SQLite-backed store for one project
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Commit an inspection result: the updated batch and, when mass was
    /// split, its new rejection sibling, atomically
    pub fn commit_inspection(
        &mut self,
        updated: &mut Batch,
        expected_revision: u64,
        sibling: Option<&mut Batch>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        cas_update_row(&tx, updated, expected_revision)?;
        if let Some(sibling) = sibling {
            insert_derived_row(&tx, sibling)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Commit a packaging run as a single all-or-nothing transaction
    ///
    /// Applies every batch update (each guarded by its loaded revision),
    /// inserts the remainder batch and the audit records, increments the
    /// aggregate inventory, and appends the stock movement. Inventory and
    /// ledger failures abort the whole transaction; partial application is
    /// never observable. The best-effort sellable-unit counter is NOT part
    /// of this transaction - see [`super::UnitCounter`].
    pub fn commit_pack(&mut self, plan: &mut PackPlan) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        for batch in plan.updates.iter_mut() {
            let expected = batch.revision;
            cas_update_row(&tx, batch, expected)?;
        }
        if let Some(remainder) = plan.remainder.as_mut() {
            insert_derived_row(&tx, remainder)?;
        }
        for record in &plan.records {
            insert_packing_record(&tx, record)?;
        }

        upsert_inventory(&tx, &plan.variety, plan.grade, plan.mass_needed)?;
        append_movement(
            &tx,
            &StockMovement {
                kind: MovementKind::In,
                variety: plan.variety.clone(),
                grade: plan.grade,
                mass: plan.mass_needed,
                reference: plan.run_id.clone(),
                actor: plan.operator.clone(),
                timestamp: Utc::now(),
            },
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Audit records for one batch, or all records when no id is given
    pub fn packing_records(
        &self,
        batch_id: Option<&BatchId>,
    ) -> Result<Vec<PackingRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, batch_id, variety, grade, mass_consumed, units_attributed,
                    remaining_mass, operator, timestamp
             FROM packing_records
             WHERE (?1 IS NULL OR batch_id = ?1)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![batch_id.map(|id| id.as_str())], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Grade>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, u64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (run_id, batch_id, variety, grade, mass, units, remaining, operator, ts) = row?;
            records.push(PackingRecord {
                run_id,
                batch_id: parse_id(&batch_id)?,
                variety,
                grade,
                mass_consumed: mass,
                units_attributed: units,
                remaining_mass: remaining,
                operator,
                timestamp: parse_timestamp(&ts)?,
            });
        }
        Ok(records)
    }

    /// Aggregate inventory levels
    pub fn stock_levels(&self) -> Result<Vec<StockLevel>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT variety, grade, mass FROM inventory ORDER BY variety, grade")?;
        let rows = stmt.query_map([], |row| {
            Ok(StockLevel {
                variety: row.get(0)?,
                grade: row.get(1)?,
                mass: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent stock movements, newest first
    pub fn movements(&self, limit: usize) -> Result<Vec<StockMovement>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, variety, grade, mass, reference, actor, timestamp
             FROM stock_movements ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, MovementKind>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Grade>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut movements = Vec::new();
        for row in rows {
            let (kind, variety, grade, mass, reference, actor, ts) = row?;
            movements.push(StockMovement {
                kind,
                variety,
                grade,
                mass,
                reference,
                actor,
                timestamp: parse_timestamp(&ts)?,
            });
        }
        Ok(movements)
    }

    /// Current sellable-unit count for a product key
    pub fn unit_count(&self, product_key: &str) -> Result<u64, StoreError> {
        let units: Option<i64> = self
            .conn
            .query_row(
                "SELECT units FROM unit_counters WHERE product_key = ?1",
                params![product_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(units.unwrap_or(0) as u64)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BatchRepository for SqliteStore {
    fn insert(&mut self, batch: &Batch) -> Result<(), StoreError> {
        insert_row(&self.conn, batch)
    }

    fn get(&self, id: &BatchId) -> Result<Batch, StoreError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM batches WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => decode(id.as_str(), &body),
            None => Err(StoreError::NotFound {
                id: id.to_string(),
            }),
        }
    }

    fn update(&mut self, batch: &mut Batch, expected_revision: u64) -> Result<(), StoreError> {
        cas_update_row(&self.conn, batch, expected_revision)
    }

    fn list(&self, filter: &BatchFilter) -> Result<Vec<Batch>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM batches ORDER BY created_at, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut batches = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let batch = decode(&id, &body)?;
            if let Some(state) = filter.state {
                if batch.state != state {
                    continue;
                }
            }
            if let Some(ref variety) = filter.variety {
                if !batch.variety.eq_ignore_ascii_case(variety) {
                    continue;
                }
            }
            if filter.active && batch.state.is_terminal() {
                continue;
            }
            batches.push(batch);
        }
        Ok(batches)
    }

    fn ready_batches(&self, variety: &str, grade: Grade) -> Result<Vec<Batch>, StoreError> {
        let filter = BatchFilter {
            state: Some(BatchState::ReadyForPackaging),
            variety: Some(variety.to_string()),
            active: false,
        };
        Ok(self
            .list(&filter)?
            .into_iter()
            .filter(|b| b.is_eligible_for(grade))
            .collect())
    }
}

// =========================================================================
// Row-level helpers (shared between direct calls and transactions)
// =========================================================================

fn encode(batch: &Batch) -> Result<String, StoreError> {
    serde_json::to_string(batch).map_err(|e| StoreError::Encode {
        id: batch.id.to_string(),
        source: e,
    })
}

fn decode(id: &str, body: &str) -> Result<Batch, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Decode {
        id: id.to_string(),
        source: e,
    })
}

fn parse_id(raw: &str) -> Result<BatchId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad batch id '{}'", raw)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("bad timestamp '{}'", raw)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_row(conn: &Connection, batch: &Batch) -> Result<(), StoreError> {
    let body = encode(batch)?;
    let result = conn.execute(
        "INSERT INTO batches (id, parent_id, variety, state, created_at, due_at, revision, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            batch.id.as_str(),
            batch.parent_id.as_ref().map(|p| p.as_str()),
            batch.variety,
            batch.state,
            batch.created_at.to_rfc3339(),
            batch.due_at.to_rfc3339(),
            batch.revision as i64,
            body,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(StoreError::Duplicate {
            id: batch.id.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Insert a derived batch, renumbering its suffix until the id is free
fn insert_derived_row(conn: &Connection, batch: &mut Batch) -> Result<(), StoreError> {
    loop {
        match insert_row(conn, batch) {
            Ok(()) => return Ok(()),
            Err(StoreError::Duplicate { .. }) => match batch.id.bump_suffix() {
                Some(next) => batch.id = next,
                None => {
                    return Err(StoreError::Duplicate {
                        id: batch.id.to_string(),
                    })
                }
            },
            Err(e) => return Err(e),
        }
    }
}

/// Compare-and-swap write: succeeds only against the expected revision
///
/// The in-memory batch is bumped to the new revision only on success.
fn cas_update_row(
    conn: &Connection,
    batch: &mut Batch,
    expected_revision: u64,
) -> Result<(), StoreError> {
    let mut next = batch.clone();
    next.revision = expected_revision + 1;
    let body = encode(&next)?;

    let rows = conn.execute(
        "UPDATE batches
         SET parent_id = ?1, variety = ?2, state = ?3, created_at = ?4,
             due_at = ?5, revision = ?6, body = ?7
         WHERE id = ?8 AND revision = ?9",
        params![
            next.parent_id.as_ref().map(|p| p.as_str()),
            next.variety,
            next.state,
            next.created_at.to_rfc3339(),
            next.due_at.to_rfc3339(),
            next.revision as i64,
            body,
            next.id.as_str(),
            expected_revision as i64,
        ],
    )?;

    if rows == 0 {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM batches WHERE id = ?1",
                params![next.id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        return Err(if exists.is_some() {
            StoreError::Conflict {
                id: next.id.to_string(),
            }
        } else {
            StoreError::NotFound {
                id: next.id.to_string(),
            }
        });
    }

    *batch = next;
    Ok(())
}

fn insert_packing_record(conn: &Connection, record: &PackingRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO packing_records
            (run_id, batch_id, variety, grade, mass_consumed, units_attributed,
             remaining_mass, operator, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.run_id,
            record.batch_id.as_str(),
            record.variety,
            record.grade,
            record.mass_consumed,
            record.units_attributed as i64,
            record.remaining_mass,
            record.operator,
            record.timestamp.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(super) fn upsert_inventory(
    conn: &Connection,
    variety: &str,
    grade: Grade,
    mass_delta: f64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO inventory (variety, grade, mass) VALUES (?1, ?2, ?3)
         ON CONFLICT(variety, grade) DO UPDATE SET mass = mass + excluded.mass",
        params![variety, grade, mass_delta],
    )?;
    Ok(())
}

pub(super) fn append_movement(
    conn: &Connection,
    movement: &StockMovement,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO stock_movements (kind, variety, grade, mass, reference, actor, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            movement.kind,
            movement.variety,
            movement.grade,
            movement.mass,
            movement.reference,
            movement.actor,
            movement.timestamp.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(super) fn bump_counter(
    conn: &Connection,
    product_key: &str,
    units: u64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO unit_counters (product_key, units) VALUES (?1, ?2)
         ON CONFLICT(product_key) DO UPDATE SET units = units + excluded.units",
        params![product_key, units as i64],
    )?;
    Ok(())
}
