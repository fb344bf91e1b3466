use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Category kind as it appears on the wire and in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    #[serde(rename = "receita")]
    Income,
    #[serde(rename = "despesa")]
    Expense,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "receita",
            Self::Expense => "despesa",
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "receita" => Ok(Self::Income),
            "despesa" => Ok(Self::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown category kind: {other}").into(),
            )),
        }
    }
}

/// Two-tier visibility: a category is either owned by one user or shared
/// reference data visible to everyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "shared")]
    Shared,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
        }
    }
}

impl ToSql for Visibility {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Visibility {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            other => Err(FromSqlError::Other(
                format!("unknown visibility: {other}").into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Category {
    pub id: i64,
    pub user_id: Option<String>,
    pub visibility: Visibility,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct Income {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub label: String,
    pub value: f64,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub category_id: Option<i64>,
    pub value: f64,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
}

#[derive(Deserialize)]
pub struct NewIncome {
    pub date: String,
    #[serde(rename = "type")]
    pub label: String,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct NewExpense {
    pub date: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// The portable document produced by export and consumed by import.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub version: String,
    #[serde(rename = "exportDate")]
    pub export_date: String,
    pub data: SnapshotData,
}

#[derive(Debug, Serialize)]
pub struct SnapshotData {
    pub categories: Vec<Category>,
    pub income: Vec<Income>,
    pub expenses: Vec<Expense>,
}

/// Import accepts any object; only the `data` container is required.
#[derive(Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub data: Option<ImportData>,
}

/// All three arrays are optional; a snapshot with none of them merges as empty.
#[derive(Default, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub categories: Vec<ImportCategory>,
    #[serde(default)]
    pub income: Vec<ImportIncome>,
    #[serde(default)]
    pub expenses: Vec<ImportExpense>,
}

/// Snapshot category. The `id` is an opaque within-payload reference used only
/// to resolve expense rows; it is never reused as a destination row id.
#[derive(Deserialize)]
pub struct ImportCategory {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
}

#[derive(Deserialize)]
pub struct ImportIncome {
    pub date: String,
    #[serde(rename = "type")]
    pub label: String,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ImportExpense {
    pub date: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub categories: i64,
    pub income: i64,
    pub expenses: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    #[serde(rename = "totalIncome")]
    pub total_income: f64,
    #[serde(rename = "totalExpenses")]
    pub total_expenses: f64,
    pub balance: f64,
    #[serde(rename = "expensesByCategory")]
    pub expenses_by_category: Vec<CategoryTotal>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyReport {
    pub month: u32,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

/// Identity established for a request from the session cookie.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}
