use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use expense_tracker::{build_app, AppState};
use tower::ServiceExt;

async fn test_app() -> Router {
    let state = AppState::in_memory().await.expect("in-memory state");
    build_app(state)
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("router is infallible")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of a cookie set by the response.
fn set_cookie(resp: &Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Registers and logs in, returning the session cookie pair.
async fn sign_up(app: &Router, username: &str, password: &str) -> String {
    let body = format!("username={}&password={}", username, password);
    let resp = send(app, post_form("/register", &body, None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = send(app, post_form("/login", &body, None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    set_cookie(&resp, "session").expect("session cookie")
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let resp = send(&app, get("/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let app = test_app().await;
    for uri in ["/", "/add_expense", "/view_expenses", "/summary", "/logout", "/edit_expense/1", "/delete_expense/1"] {
        let resp = send(&app, get(uri, None)).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&resp), "/login", "{}", uri);
    }
    let resp = send(&app, get("/", Some("session=forged.token.value"))).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn registration_flashes_and_rejects_duplicates() {
    let app = test_app().await;
    let resp = send(&app, post_form("/register", "username=alice&password=pw", None)).await;
    let flash = set_cookie(&resp, "flash").expect("success flash");

    let page = send(&app, get("/login", Some(&flash))).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(set_cookie(&page, "flash").is_some(), "flash is cleared once shown");
    assert!(body_string(page).await.contains("Registration successful! Please log in."));

    let resp = send(&app, post_form("/register", "username=alice&password=other", None)).await;
    assert_eq!(location(&resp), "/register");
    let flash = set_cookie(&resp, "flash").unwrap();
    let page = send(&app, get("/register", Some(&flash))).await;
    assert!(body_string(page).await.contains("Username already exists"));

    // original password still works
    let resp = send(&app, post_form("/login", "username=alice&password=pw", None)).await;
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn bad_login_flashes_error() {
    let app = test_app().await;
    sign_up(&app, "alice", "pw").await;

    let resp = send(&app, post_form("/login", "username=alice&password=nope", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert!(set_cookie(&resp, "session").is_none());
    let flash = set_cookie(&resp, "flash").unwrap();
    let page = send(&app, get("/login", Some(&flash))).await;
    assert!(body_string(page).await.contains("Invalid username or password."));
}

#[tokio::test]
async fn expense_lifecycle() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    let home = send(&app, get("/", Some(&session))).await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(body_string(home).await.contains("Welcome, alice."));

    let resp = send(
        &app,
        post_form("/add_expense", "description=Lunch&amount=12.50&category=food", Some(&session)),
    )
    .await;
    assert_eq!(location(&resp), "/view_expenses");
    send(
        &app,
        post_form("/add_expense", "description=Bus&amount=3&category=transport", Some(&session)),
    )
    .await;

    let page = body_string(send(&app, get("/view_expenses", Some(&session))).await).await;
    assert!(page.contains("Lunch"));
    assert!(page.contains("Bus"));
    assert!(page.contains(r#"<option value="all" selected>all</option>"#));

    let filtered = body_string(
        send(&app, post_form("/view_expenses", "category_filter=transport", Some(&session))).await,
    )
    .await;
    assert!(filtered.contains("Bus"));
    assert!(!filtered.contains("Lunch"));

    // the first expense of a fresh database has id 1
    let edit = body_string(send(&app, get("/edit_expense/1", Some(&session))).await).await;
    assert!(edit.contains(r#"value="Lunch""#));

    let resp = send(
        &app,
        post_form("/edit_expense/1", "description=Dinner&amount=20&category=food", Some(&session)),
    )
    .await;
    assert_eq!(location(&resp), "/view_expenses");
    let page = body_string(send(&app, get("/view_expenses", Some(&session))).await).await;
    assert!(page.contains("Dinner"));
    assert!(!page.contains("Lunch"));

    let resp = send(&app, get("/delete_expense/1", Some(&session))).await;
    assert_eq!(location(&resp), "/view_expenses");
    let page = body_string(send(&app, get("/view_expenses", Some(&session))).await).await;
    assert!(!page.contains("Dinner"));
    let resp = send(&app, get("/edit_expense/1", Some(&session))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_amount_redirects_back_with_notice() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    let resp = send(
        &app,
        post_form("/add_expense", "description=Lunch&amount=lots&category=food", Some(&session)),
    )
    .await;
    assert_eq!(location(&resp), "/add_expense");
    assert!(set_cookie(&resp, "flash").is_some());

    let page = body_string(send(&app, get("/view_expenses", Some(&session))).await).await;
    assert!(page.contains("No expenses recorded."));
}

#[tokio::test]
async fn other_users_expenses_are_not_found() {
    let app = test_app().await;
    let alice = sign_up(&app, "alice", "pw").await;
    let bob = sign_up(&app, "bob", "pw").await;

    send(
        &app,
        post_form("/add_expense", "description=Secret&amount=9&category=gifts", Some(&alice)),
    )
    .await;

    let resp = send(&app, get("/edit_expense/1", Some(&bob))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(
        &app,
        post_form("/edit_expense/1", "description=Mine&amount=1&category=x", Some(&bob)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, get("/delete_expense/1", Some(&bob))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, get("/edit_expense/999", Some(&bob))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let bobs = body_string(send(&app, get("/view_expenses", Some(&bob))).await).await;
    assert!(!bobs.contains("Secret"));
    let alices = body_string(send(&app, get("/view_expenses", Some(&alice))).await).await;
    assert!(alices.contains("Secret"));
}

#[tokio::test]
async fn summary_embeds_charts_and_totals() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    let empty = body_string(send(&app, get("/summary", Some(&session))).await).await;
    assert!(!empty.contains("data:image/png;base64,"));
    assert!(empty.contains(r#"id="category-totals">{}</script>"#));

    for body in [
        "description=a&amount=10.00&category=food",
        "description=b&amount=5.50&category=food",
        "description=c&amount=3.25&category=transport",
    ] {
        send(&app, post_form("/add_expense", body, Some(&session))).await;
    }

    let resp = send(&app, get("/summary", Some(&session))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_string(resp).await;
    assert_eq!(page.matches("data:image/png;base64,").count(), 3);
    assert!(page.contains(r#"{"food":15.5,"transport":3.25}"#));
    assert!(page.contains("82.7%"));
    assert!(page.contains("17.3%"));
}

#[tokio::test]
async fn logout_ends_session() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    let resp = send(&app, get("/logout", Some(&session))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert_eq!(set_cookie(&resp, "session").as_deref(), Some("session="));

    // replaying the old cookie no longer works
    let resp = send(&app, get("/", Some(&session))).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn malformed_expense_ids_are_not_found() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    for uri in [
        "/edit_expense/abc",
        "/delete_expense/abc",
        "/edit_expense/99999999999999999999",
        "/edit_expense/1.5",
    ] {
        let resp = send(&app, get(uri, Some(&session))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        let page = body_string(resp).await;
        assert!(page.contains("<h1>404 Not Found</h1>"), "{}", uri);
        assert!(!page.contains("Cannot parse"), "{}", uri);
    }

    let resp = send(
        &app,
        post_form("/edit_expense/abc", "description=x&amount=1&category=c", Some(&session)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // still a login redirect before the id is looked at
    let resp = send(&app, get("/edit_expense/abc", None)).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn pending_notice_is_cleared_by_error_page() {
    let app = test_app().await;
    let session = sign_up(&app, "alice", "pw").await;

    let resp = send(
        &app,
        post_form("/add_expense", "description=x&amount=nope&category=c", Some(&session)),
    )
    .await;
    let flash = set_cookie(&resp, "flash").unwrap();
    let cookies = format!("{}; {}", session, flash);

    let resp = send(&app, get("/edit_expense/42", Some(&cookies))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(set_cookie(&resp, "flash").as_deref(), Some("flash="));
}
