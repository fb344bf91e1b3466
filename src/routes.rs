use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status;
use rocket::serde::json::{json, Json, Value};
use rocket::{Request, State};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, IdentityClient};
use crate::db::{self, DbPool};
use crate::error::ApiError;
use crate::models::{
    AuthUser, Category, DashboardSummary, Expense, ImportPayload, Income, MonthlyReport,
    NewCategory, NewExpense, NewIncome, Snapshot,
};
use crate::reconcile;

#[derive(Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    code: Option<String>,
}

#[get("/oauth/google/redirect_url")]
async fn oauth_redirect_url(identity: &State<IdentityClient>) -> Result<Json<Value>, ApiError> {
    let url = identity
        .redirect_url("google")
        .await
        .map_err(ApiError::internal("Failed to get redirect URL"))?;
    Ok(Json(json!({ "redirectUrl": url })))
}

#[post("/sessions", data = "<body>")]
async fn create_session(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    identity: &State<IdentityClient>,
    body: Json<SessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(code) = body.into_inner().code.filter(|code| !code.is_empty()) else {
        return Err(ApiError::BadRequest("No authorization code provided"));
    };
    let user = identity
        .exchange_code(&code)
        .await
        .map_err(ApiError::internal("Failed to create session"))?;

    let token = Uuid::new_v4().to_string();
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to create session"))?;
    db::create_session(
        &conn,
        &user.id,
        user.email.as_deref(),
        &token,
        &Utc::now().to_rfc3339(),
    )
    .map_err(ApiError::internal("Failed to create session"))?;

    let mut cookie = Cookie::new(auth::SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);

    Ok(Json(json!({ "success": true })))
}

#[get("/users/me")]
fn me(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<Json<AuthUser>, ApiError> {
    Ok(Json(auth::require_user(pool, cookies)?))
}

#[get("/logout")]
fn logout(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Json<Value> {
    if let Some(cookie) = cookies.get(auth::SESSION_COOKIE) {
        if let Ok(conn) = pool.get() {
            let _ = db::delete_session(&conn, cookie.value());
        }
    }
    cookies.remove(Cookie::build(auth::SESSION_COOKIE).path("/"));
    Json(json!({ "success": true }))
}

#[get("/categories")]
fn list_categories(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to load categories"))?;
    let list = db::visible_categories(&conn, &user.id)
        .map_err(ApiError::internal("Failed to load categories"))?;
    Ok(Json(list))
}

#[post("/categories", data = "<body>")]
fn create_category(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    body: Json<NewCategory>,
) -> Result<status::Custom<Json<Value>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let body = body.into_inner();
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Category name is required"));
    }
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to create category"))?;
    db::insert_category(&conn, &user.id, name, body.kind, &Utc::now().to_rfc3339())
        .map_err(ApiError::internal("Failed to create category"))?;
    Ok(status::Custom(
        Status::Created,
        Json(json!({ "success": true })),
    ))
}

#[get("/income")]
fn list_income(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
) -> Result<Json<Vec<Income>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to load income"))?;
    let list = db::list_income(&conn, &user.id)
        .map_err(ApiError::internal("Failed to load income"))?;
    Ok(Json(list))
}

#[post("/income", data = "<body>")]
fn create_income(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    body: Json<NewIncome>,
) -> Result<status::Custom<Json<Value>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let body = body.into_inner();
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to create income"))?;
    db::insert_income(
        &conn,
        &user.id,
        &body.date,
        &body.label,
        body.value,
        body.description.as_deref(),
        &Utc::now().to_rfc3339(),
    )
    .map_err(ApiError::internal("Failed to create income"))?;
    Ok(status::Custom(
        Status::Created,
        Json(json!({ "success": true })),
    ))
}

#[get("/expenses")]
fn list_expenses(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to load expenses"))?;
    let list = db::list_expenses(&conn, &user.id)
        .map_err(ApiError::internal("Failed to load expenses"))?;
    Ok(Json(list))
}

#[post("/expenses", data = "<body>")]
fn create_expense(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    body: Json<NewExpense>,
) -> Result<status::Custom<Json<Value>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let body = body.into_inner();
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to create expense"))?;
    db::insert_expense(
        &conn,
        &user.id,
        &body.date,
        body.category_id,
        body.value,
        body.description.as_deref(),
        &Utc::now().to_rfc3339(),
    )
    .map_err(ApiError::internal("Failed to create expense"))?;
    Ok(status::Custom(
        Status::Created,
        Json(json!({ "success": true })),
    ))
}

#[get("/dashboard/summary?<month>&<year>")]
fn dashboard_summary(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
    year: Option<String>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let window = month
        .as_deref()
        .and_then(|value| value.parse().ok())
        .zip(year.as_deref().and_then(|value| value.parse().ok()))
        .and_then(|(month, year)| month_window(year, month));
    let Some((start, end)) = window else {
        return Err(ApiError::BadRequest("Month and year are required"));
    };

    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to load summary"))?;
    let total_income = db::income_total(&conn, &user.id, &start, &end)
        .map_err(ApiError::internal("Failed to load summary"))?;
    let total_expenses = db::expense_total(&conn, &user.id, &start, &end)
        .map_err(ApiError::internal("Failed to load summary"))?;
    let expenses_by_category = db::expenses_by_category(&conn, &user.id, &start, &end)
        .map_err(ApiError::internal("Failed to load summary"))?;

    Ok(Json(DashboardSummary {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        expenses_by_category,
    }))
}

#[get("/reports/annual?<year>")]
fn annual_report(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    year: Option<String>,
) -> Result<Json<Vec<MonthlyReport>>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let year = match year {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid year"))?,
        None => Utc::now().year(),
    };

    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to load annual report"))?;
    let income: HashMap<u32, f64> = db::monthly_income_totals(&conn, &user.id, year)
        .map_err(ApiError::internal("Failed to load annual report"))?
        .into_iter()
        .collect();
    let expenses: HashMap<u32, f64> = db::monthly_expense_totals(&conn, &user.id, year)
        .map_err(ApiError::internal("Failed to load annual report"))?
        .into_iter()
        .collect();

    let report = (1..=12)
        .map(|month| {
            let income = income.get(&month).copied().unwrap_or(0.0);
            let expense = expenses.get(&month).copied().unwrap_or(0.0);
            MonthlyReport {
                month,
                income,
                expenses: expense,
                balance: income - expense,
            }
        })
        .collect();
    Ok(Json(report))
}

#[get("/export")]
fn export_data(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
) -> Result<Json<Snapshot>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to export data"))?;
    let snapshot = reconcile::export_snapshot(&conn, &user.id)
        .map_err(ApiError::internal("Failed to export data"))?;
    Ok(Json(snapshot))
}

#[post("/import", data = "<body>")]
fn import_data(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    body: Json<ImportPayload>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_user(pool, cookies)?;
    let Some(data) = body.into_inner().data else {
        return Err(ApiError::BadRequest("Invalid import format"));
    };

    let mut conn = pool
        .get()
        .map_err(ApiError::internal("Failed to import data"))?;
    let imported = reconcile::import_snapshot(&mut conn, &user.id, &data)
        .map_err(ApiError::internal("Failed to import data"))?;
    info!(
        user = %user.id,
        categories = imported.categories,
        income = imported.income,
        expenses = imported.expenses,
        "snapshot merged"
    );
    Ok(Json(json!({ "success": true, "imported": imported })))
}

/// First day of the month and of the next month, the half-open summary window.
fn month_window(year: i32, month: u32) -> Option<(String, String)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    ))
}

#[catch(default)]
fn fallback(status: Status, _request: &Request<'_>) -> Json<Value> {
    Json(json!({ "error": status.reason_lossy() }))
}

pub fn all() -> Vec<rocket::Route> {
    routes![
        oauth_redirect_url,
        create_session,
        me,
        logout,
        list_categories,
        create_category,
        list_income,
        create_income,
        list_expenses,
        create_expense,
        dashboard_summary,
        annual_report,
        export_data,
        import_data
    ]
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![fallback]
}
