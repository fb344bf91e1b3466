//! Snapshot export and import.
//!
//! Export is a read-only assembly of everything a user owns. Import merges a
//! previously exported snapshot back in: categories are deduplicated by
//! (name, kind), income and expense rows are always appended, and expense
//! category references are remapped by name because snapshot ids belong to
//! the exporting database and mean nothing here.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::{params, Connection, Result, Transaction};

use crate::db;
use crate::models::{ImportData, ImportSummary, Snapshot, SnapshotData};

pub const SNAPSHOT_VERSION: &str = "1.0";

pub fn export_snapshot(conn: &Connection, user_id: &str) -> Result<Snapshot> {
    Ok(Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        export_date: Utc::now().to_rfc3339(),
        data: SnapshotData {
            categories: db::owned_categories(conn, user_id)?,
            income: db::list_income(conn, user_id)?,
            expenses: db::list_expenses(conn, user_id)?,
        },
    })
}

/// Merges a snapshot into the user's dataset inside a single transaction:
/// either every row lands or none do.
pub fn import_snapshot(
    conn: &mut Connection,
    user_id: &str,
    data: &ImportData,
) -> Result<ImportSummary> {
    let tx = conn.transaction()?;
    let summary = merge(&tx, user_id, data)?;
    tx.commit()?;
    Ok(summary)
}

fn merge(tx: &Transaction<'_>, user_id: &str, data: &ImportData) -> Result<ImportSummary> {
    let now = Utc::now().to_rfc3339();
    let mut summary = ImportSummary::default();

    // Categories: one existence scan up front, then insert only the missing
    // (name, kind) keys. Newly inserted keys join the set so a payload that
    // repeats a category still inserts it once.
    let mut existing: HashSet<_> = db::category_keys(tx, user_id)?.into_iter().collect();
    for category in &data.categories {
        let key = (category.name.clone(), category.kind);
        if existing.contains(&key) {
            continue;
        }
        db::insert_category(tx, user_id, &category.name, category.kind, &now)?;
        existing.insert(key);
        summary.categories += 1;
    }

    // Income: appended as-is, duplicates and all. Rows carry no natural
    // dedup key in this model.
    {
        let mut stmt = tx.prepare(
            "
            INSERT INTO income (user_id, date, type, value, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ",
        )?;
        for row in &data.income {
            stmt.execute(params![
                user_id,
                row.date,
                row.label,
                row.value,
                row.description,
                now
            ])?;
            summary.income += 1;
        }
    }

    // Expenses: a snapshot category id is resolved to a destination id via
    // the name it had in the snapshot's own categories array. Anything that
    // does not resolve lands as uncategorized, and the row counts either way.
    let snapshot_names: HashMap<i64, &str> = data
        .categories
        .iter()
        .filter_map(|c| c.id.map(|id| (id, c.name.as_str())))
        .collect();
    let mut destination_ids: HashMap<String, i64> = HashMap::new();
    for (name, id) in db::expense_category_ids(tx, user_id)? {
        destination_ids.entry(name).or_insert(id);
    }

    let mut stmt = tx.prepare(
        "
        INSERT INTO expenses (user_id, date, category_id, value, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ",
    )?;
    for row in &data.expenses {
        let category_id = row
            .category_id
            .and_then(|id| snapshot_names.get(&id))
            .and_then(|name| destination_ids.get(*name))
            .copied();
        stmt.execute(params![
            user_id,
            row.date,
            category_id,
            row.value,
            row.description,
            now
        ])?;
        summary.expenses += 1;
    }

    Ok(summary)
}
