use financeflow::auth::IdentityClient;
use financeflow::db;
use rocket::http::{ContentType, Cookie, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

const TOKEN: &str = "test-session-token";

fn spawn_client(user_id: &str) -> (Client, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let pool = db::init_db(&dir.path().join("test.sqlite"));
    {
        let conn = pool.get().expect("db connection");
        db::create_session(
            &conn,
            user_id,
            Some("user@example.com"),
            TOKEN,
            "2024-01-01T00:00:00Z",
        )
        .expect("session");
    }
    let identity = IdentityClient::new("http://identity.invalid".to_string(), String::new());
    let client = Client::tracked(financeflow::build(pool, identity)).expect("valid rocket");
    (client, dir)
}

fn session() -> Cookie<'static> {
    Cookie::new("session", TOKEN)
}

fn post_json(client: &Client, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(uri)
        .cookie(session())
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    let status = response.status();
    let body = response.into_json().expect("json body");
    (status, body)
}

fn get_json(client: &Client, uri: &str) -> (Status, Value) {
    let response = client.get(uri).cookie(session()).dispatch();
    let status = response.status();
    let body = response.into_json().expect("json body");
    (status, body)
}

#[test]
fn requests_without_a_session_are_rejected() {
    let (client, _dir) = spawn_client("u1");
    let response = client.get("/api/export").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
    let body: Value = response.into_json().expect("json body");
    assert_eq!(body["error"], "Unauthorized");
}

#[test]
fn session_creation_requires_a_code() {
    let (client, _dir) = spawn_client("u1");
    let response = client
        .post("/api/sessions")
        .header(ContentType::JSON)
        .body(json!({}).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().expect("json body");
    assert_eq!(body["error"], "No authorization code provided");
}

#[test]
fn users_me_reflects_the_session() {
    let (client, _dir) = spawn_client("user-42");
    let (status, body) = get_json(&client, "/api/users/me");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["id"], "user-42");
    assert_eq!(body["email"], "user@example.com");
}

#[test]
fn logout_invalidates_the_session() {
    let (client, _dir) = spawn_client("u1");
    let (status, body) = get_json(&client, "/api/logout");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);

    let response = client.get("/api/export").cookie(session()).dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn categories_include_shared_defaults_and_own_rows() {
    let (client, _dir) = spawn_client("u1");
    let (status, _) = post_json(
        &client,
        "/api/categories",
        json!({ "name": "Mercado", "type": "despesa" }),
    );
    assert_eq!(status, Status::Created);

    let (status, body) = get_json(&client, "/api/categories");
    assert_eq!(status, Status::Ok);
    let list = body.as_array().expect("array");
    assert!(list.iter().any(|c| c["name"] == "Mercado"));
    assert!(list.iter().any(|c| c["visibility"] == "shared"));

    let names: Vec<&str> = list.iter().map(|c| c["name"].as_str().unwrap()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn blank_category_names_are_rejected() {
    let (client, _dir) = spawn_client("u1");
    let (status, body) = post_json(
        &client,
        "/api/categories",
        json!({ "name": "   ", "type": "despesa" }),
    );
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Category name is required");
}

#[test]
fn dashboard_summary_covers_only_the_requested_month() {
    let (client, _dir) = spawn_client("u1");
    post_json(
        &client,
        "/api/categories",
        json!({ "name": "Mercado", "type": "despesa" }),
    );
    let (_, categories) = get_json(&client, "/api/categories");
    let mercado = categories
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Mercado")
        .expect("category")["id"]
        .clone();

    post_json(
        &client,
        "/api/income",
        json!({ "date": "2024-03-15", "type": "Salário", "value": 3000.0 }),
    );
    post_json(
        &client,
        "/api/income",
        json!({ "date": "2024-04-01", "type": "Salário", "value": 999.0 }),
    );
    post_json(
        &client,
        "/api/expenses",
        json!({ "date": "2024-03-20", "category_id": mercado, "value": 450.0 }),
    );
    post_json(
        &client,
        "/api/expenses",
        json!({ "date": "2024-02-28", "category_id": mercado, "value": 80.0 }),
    );

    let (status, body) = get_json(&client, "/api/dashboard/summary?month=3&year=2024");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["totalIncome"], 3000.0);
    assert_eq!(body["totalExpenses"], 450.0);
    assert_eq!(body["balance"], 2550.0);
    let breakdown = body["expensesByCategory"].as_array().expect("array");
    assert_eq!(breakdown.len(), 1);
    assert_eq!(breakdown[0]["name"], "Mercado");
    assert_eq!(breakdown[0]["total"], 450.0);
}

#[test]
fn dashboard_summary_requires_month_and_year() {
    let (client, _dir) = spawn_client("u1");
    let (status, body) = get_json(&client, "/api/dashboard/summary?month=3");
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Month and year are required");
}

#[test]
fn annual_report_always_lists_twelve_months() {
    let (client, _dir) = spawn_client("u1");
    post_json(
        &client,
        "/api/income",
        json!({ "date": "2024-01-10", "type": "Salário", "value": 100.0 }),
    );
    post_json(
        &client,
        "/api/expenses",
        json!({ "date": "2024-01-12", "value": 30.0 }),
    );

    let (status, body) = get_json(&client, "/api/reports/annual?year=2024");
    assert_eq!(status, Status::Ok);
    let months = body.as_array().expect("array");
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["month"], 1);
    assert_eq!(months[0]["income"], 100.0);
    assert_eq!(months[0]["expenses"], 30.0);
    assert_eq!(months[0]["balance"], 70.0);
    assert_eq!(months[4]["income"], 0.0);
}

#[test]
fn export_then_import_doubles_rows_but_not_categories() {
    let (client, _dir) = spawn_client("u1");
    post_json(
        &client,
        "/api/categories",
        json!({ "name": "Mercado", "type": "despesa" }),
    );
    let (_, categories) = get_json(&client, "/api/categories");
    let mercado = categories
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Mercado")
        .expect("category")["id"]
        .clone();

    post_json(
        &client,
        "/api/income",
        json!({ "date": "2024-03-15", "type": "Salário", "value": 3000.0 }),
    );
    post_json(
        &client,
        "/api/income",
        json!({ "date": "2024-03-16", "type": "Extra", "value": 120.0 }),
    );
    post_json(
        &client,
        "/api/expenses",
        json!({ "date": "2024-03-20", "category_id": mercado, "value": 450.0 }),
    );

    let (status, snapshot) = get_json(&client, "/api/export");
    assert_eq!(status, Status::Ok);
    assert_eq!(snapshot["version"], "1.0");
    assert_eq!(snapshot["data"]["categories"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["data"]["income"].as_array().unwrap().len(), 2);

    let (status, result) = post_json(&client, "/api/import", snapshot);
    assert_eq!(status, Status::Ok);
    assert_eq!(result["success"], true);
    assert_eq!(result["imported"]["categories"], 0);
    assert_eq!(result["imported"]["income"], 2);
    assert_eq!(result["imported"]["expenses"], 1);

    let (_, income) = get_json(&client, "/api/income");
    assert_eq!(income.as_array().unwrap().len(), 4);
    let (_, expenses) = get_json(&client, "/api/expenses");
    let expenses = expenses.as_array().unwrap();
    assert_eq!(expenses.len(), 2);
    // The re-imported expense still points at the one Mercado category.
    assert!(expenses.iter().all(|e| e["category_id"] == mercado));
    let (_, categories) = get_json(&client, "/api/categories");
    let own: Vec<_> = categories
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["visibility"] == "private")
        .collect();
    assert_eq!(own.len(), 1);
}

#[test]
fn import_without_data_key_writes_nothing() {
    let (client, _dir) = spawn_client("u1");
    let (status, body) = post_json(&client, "/api/import", json!({ "version": "1.0" }));
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Invalid import format");

    let (_, income) = get_json(&client, "/api/income");
    assert!(income.as_array().unwrap().is_empty());
}

#[test]
fn import_with_empty_data_reports_zero_counts() {
    let (client, _dir) = spawn_client("u1");
    let (status, body) = post_json(&client, "/api/import", json!({ "data": {} }));
    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);
    assert_eq!(body["imported"]["categories"], 0);
    assert_eq!(body["imported"]["income"], 0);
    assert_eq!(body["imported"]["expenses"], 0);
}

#[test]
fn unresolvable_snapshot_category_imports_as_uncategorized() {
    let (client, _dir) = spawn_client("u1");
    let payload = json!({
        "data": {
            "categories": [],
            "expenses": [
                { "date": "2024-02-01", "category_id": 99, "value": 12.5 }
            ]
        }
    });
    let (status, body) = post_json(&client, "/api/import", payload);
    assert_eq!(status, Status::Ok);
    assert_eq!(body["imported"]["expenses"], 1);

    let (_, expenses) = get_json(&client, "/api/expenses");
    assert_eq!(expenses[0]["category_id"], Value::Null);
}
