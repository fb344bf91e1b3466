use std::path::Path;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Result};

use crate::models::{
    AuthUser, Category, CategoryKind, CategoryTotal, Expense, Income, Visibility,
};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_db(path: &Path) -> DbPool {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::new(manager).expect("db pool");
    {
        let conn = pool.get().expect("db connection");
        run_migrations(&conn).expect("db migrations");
        seed_shared_categories(&conn).expect("seed shared categories");
    }
    pool
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id TEXT,
            visibility TEXT NOT NULL DEFAULT 'private'
                CHECK(visibility IN ('private', 'shared')),
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('receita', 'despesa')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS income (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            type TEXT NOT NULL,
            value REAL NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            category_id INTEGER,
            value REAL NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES categories(id)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            email TEXT,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_income_user_date ON income(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
        ",
    )
}

/// Shared reference categories visible to every account. Inserted once, on
/// first boot against an empty store.
fn seed_shared_categories(conn: &Connection) -> Result<()> {
    let shared: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE visibility = 'shared'",
        [],
        |row| row.get(0),
    )?;
    if shared > 0 {
        return Ok(());
    }

    let defaults = [
        ("Alimentação", CategoryKind::Expense),
        ("Transporte", CategoryKind::Expense),
        ("Moradia", CategoryKind::Expense),
        ("Saúde", CategoryKind::Expense),
        ("Lazer", CategoryKind::Expense),
        ("Salário", CategoryKind::Income),
        ("Investimentos", CategoryKind::Income),
    ];
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn.prepare(
        "
        INSERT INTO categories (user_id, visibility, name, kind, created_at, updated_at)
        VALUES (NULL, 'shared', ?1, ?2, ?3, ?3)
        ",
    )?;
    for (name, kind) in defaults {
        stmt.execute(params![name, kind, now])?;
    }
    Ok(())
}

fn category_from_row(row: &rusqlite::Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        visibility: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Categories a user can see: their own plus the shared reference set.
pub fn visible_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, user_id, visibility, name, kind, created_at, updated_at
        FROM categories
        WHERE user_id = ?1 OR visibility = 'shared'
        ORDER BY name ASC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], category_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Categories owned by the user only. Shared reference rows are not part of a
/// user's exported dataset.
pub fn owned_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, user_id, visibility, name, kind, created_at, updated_at
        FROM categories
        WHERE user_id = ?1
        ORDER BY name ASC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], category_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_category(
    conn: &Connection,
    user_id: &str,
    name: &str,
    kind: CategoryKind,
    now: &str,
) -> Result<i64> {
    conn.execute(
        "
        INSERT INTO categories (user_id, visibility, name, kind, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ",
        params![user_id, Visibility::Private, name, kind, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// (name, kind) pairs of the user's own categories, the dedup key for import.
pub fn category_keys(conn: &Connection, user_id: &str) -> Result<Vec<(String, CategoryKind)>> {
    let mut stmt = conn.prepare(
        "
        SELECT name, kind
        FROM categories
        WHERE user_id = ?1
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// (name, id) pairs of the user's own expense-kind categories, ordered by id
/// so that on duplicate names the oldest row wins.
pub fn expense_category_ids(conn: &Connection, user_id: &str) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "
        SELECT name, id
        FROM categories
        WHERE user_id = ?1 AND kind = 'despesa'
        ORDER BY id ASC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_income(conn: &Connection, user_id: &str) -> Result<Vec<Income>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, user_id, date, type, value, description, created_at, updated_at
        FROM income
        WHERE user_id = ?1
        ORDER BY date DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Income {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            label: row.get(3)?,
            value: row.get(4)?,
            description: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_income(
    conn: &Connection,
    user_id: &str,
    date: &str,
    label: &str,
    value: f64,
    description: Option<&str>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "
        INSERT INTO income (user_id, date, type, value, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ",
        params![user_id, date, label, value, description, now],
    )?;
    Ok(())
}

pub fn list_expenses(conn: &Connection, user_id: &str) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, user_id, date, category_id, value, description, created_at, updated_at
        FROM expenses
        WHERE user_id = ?1
        ORDER BY date DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            category_id: row.get(3)?,
            value: row.get(4)?,
            description: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_expense(
    conn: &Connection,
    user_id: &str,
    date: &str,
    category_id: Option<i64>,
    value: f64,
    description: Option<&str>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "
        INSERT INTO expenses (user_id, date, category_id, value, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ",
        params![user_id, date, category_id, value, description, now],
    )?;
    Ok(())
}

pub fn income_total(conn: &Connection, user_id: &str, start: &str, end: &str) -> Result<f64> {
    conn.query_row(
        "
        SELECT COALESCE(SUM(value), 0)
        FROM income
        WHERE user_id = ?1 AND date >= ?2 AND date < ?3
        ",
        params![user_id, start, end],
        |row| row.get(0),
    )
}

pub fn expense_total(conn: &Connection, user_id: &str, start: &str, end: &str) -> Result<f64> {
    conn.query_row(
        "
        SELECT COALESCE(SUM(value), 0)
        FROM expenses
        WHERE user_id = ?1 AND date >= ?2 AND date < ?3
        ",
        params![user_id, start, end],
        |row| row.get(0),
    )
}

/// Expense totals per visible expense-kind category inside `[start, end)`.
/// Categories with nothing spent in the window are left out.
pub fn expenses_by_category(
    conn: &Connection,
    user_id: &str,
    start: &str,
    end: &str,
) -> Result<Vec<CategoryTotal>> {
    let mut stmt = conn.prepare(
        "
        SELECT c.name, COALESCE(SUM(e.value), 0) AS total
        FROM categories c
        LEFT JOIN expenses e
            ON c.id = e.category_id
           AND e.user_id = ?1
           AND e.date >= ?2
           AND e.date < ?3
        WHERE (c.user_id = ?1 OR c.visibility = 'shared') AND c.kind = 'despesa'
        GROUP BY c.id, c.name
        HAVING total > 0
        ",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| {
        Ok(CategoryTotal {
            name: row.get(0)?,
            total: row.get(1)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Month-number → summed value for one calendar year, one row per month that
/// has any data.
fn monthly_totals(
    conn: &Connection,
    table: &str,
    user_id: &str,
    year: i32,
) -> Result<Vec<(u32, f64)>> {
    let start = format!("{year}-01-01");
    let end = format!("{}-01-01", year + 1);
    let mut stmt = conn.prepare(&format!(
        "
        SELECT CAST(substr(date, 6, 2) AS INTEGER) AS month, COALESCE(SUM(value), 0)
        FROM {table}
        WHERE user_id = ?1 AND date >= ?2 AND date < ?3
        GROUP BY month
        "
    ))?;
    let rows = stmt.query_map(params![user_id, start, end], |row| {
        Ok((row.get::<_, i64>(0)? as u32, row.get(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn monthly_income_totals(conn: &Connection, user_id: &str, year: i32) -> Result<Vec<(u32, f64)>> {
    monthly_totals(conn, "income", user_id, year)
}

pub fn monthly_expense_totals(
    conn: &Connection,
    user_id: &str,
    year: i32,
) -> Result<Vec<(u32, f64)>> {
    monthly_totals(conn, "expenses", user_id, year)
}

pub fn create_session(
    conn: &Connection,
    user_id: &str,
    email: Option<&str>,
    token: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, email, token, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, email, token, created_at],
    )?;
    Ok(())
}

pub fn user_by_session(conn: &Connection, token: &str) -> Result<Option<AuthUser>> {
    let mut stmt = conn.prepare(
        "
        SELECT user_id, email
        FROM sessions
        WHERE token = ?1
        ",
    )?;
    let mut rows = stmt.query(params![token])?;
    if let Some(row) = rows.next()? {
        Ok(Some(AuthUser {
            id: row.get(0)?,
            email: row.get(1)?,
        }))
    } else {
        Ok(None)
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}
