//! Generated endpoint tests: list, retrieve, create, update and delete on
//! plain, form-backed and admin-backed models.

use serde_json::{json, Value};

use rest_extras_db::Record;
use rest_extras_test::{build_test_app, control, TestApp, TestClient, PASSWORD};

async fn logged_in() -> (TestApp, TestClient) {
    let app = build_test_app().await.unwrap();
    let mut client = TestClient::new(app.router.clone());
    assert!(client.login("superuser", PASSWORD).await);
    (app, client)
}

async fn row(app: &TestApp, key: &str, pk: i64) -> Record {
    app.ctx.manager(key).unwrap().get(&json!(pk)).await.unwrap()
}

const NEW_ROW: [(&str, &str); 4] = [
    ("editable_field", "editable_field"),
    ("another_editable_field", "another_editable_field"),
    ("foreign_field", "http://testserver/tests-foo/1/"),
    ("many_field", "http://testserver/tests-bar/1/"),
];

#[tokio::test]
async fn test_vanilla_list() {
    let (_app, mut client) = logged_in().await;
    let response = client.get("/tests-vanilla/").await;
    assert_eq!(response.status_code(), 200);
    let body = response.json().unwrap();
    assert_eq!(body[0], control("vanilla", 1, ""));
}

#[tokio::test]
async fn test_vanilla_get() {
    let (_app, mut client) = logged_in().await;
    let response = client.get("/tests-vanilla/1/").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json().unwrap(), control("vanilla", 1, ""));
}

#[tokio::test]
async fn test_vanilla_create() {
    let (app, mut client) = logged_in().await;
    let response = client.post_form("/tests-vanilla/", &NEW_ROW).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    assert_eq!(response.json().unwrap(), control("vanilla", 2, ""));
    assert!(app.ctx.manager("tests.vanilla").unwrap().exists(&json!(2)).await.unwrap());
}

#[tokio::test]
async fn test_vanilla_create_json() {
    let (app, mut client) = logged_in().await;
    let data = json!({
        "editable_field": "editable_field",
        "another_editable_field": "another_editable_field",
        "foreign_field": "http://testserver/tests-foo/1/",
        "many_field": ["http://testserver/tests-bar/1/"],
    });
    let response = client.post_json("/tests-vanilla/", &data).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    assert_eq!(response.json().unwrap(), control("vanilla", 2, ""));
    assert_eq!(row(&app, "tests.vanilla", 2).await["many_field"], json!([1]));
}

#[tokio::test]
async fn test_vanilla_patch() {
    let (app, mut client) = logged_in().await;
    let response = client
        .patch_json("/tests-vanilla/1/", &json!({"editable_field": "editable_field_x"}))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    assert_eq!(response.json().unwrap()["editable_field"], "editable_field_x");
    assert_eq!(row(&app, "tests.vanilla", 1).await["editable_field"], "editable_field_x");
}

#[tokio::test]
async fn test_vanilla_put_requires_every_field() {
    let (_app, mut client) = logged_in().await;
    let response = client
        .put_json("/tests-vanilla/1/", &json!({"editable_field": "editable_field_x"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let body = response.json().unwrap();
    assert_eq!(body["another_editable_field"], json!(["This field is required."]));
    assert_eq!(body["foreign_field"], json!(["This field is required."]));
}

#[tokio::test]
async fn test_vanilla_delete() {
    let (_app, mut client) = logged_in().await;
    let response = client.delete("/tests-vanilla/1/").await;
    assert_eq!(response.status_code(), 204);
    let response = client.get("/tests-vanilla/1/").await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json().unwrap(), json!({"detail": "Not found."}));
}

#[tokio::test]
async fn test_non_editable_field_is_read_only() {
    let (app, mut client) = logged_in().await;
    let response = client
        .patch_json("/tests-vanilla/1/", &json!({"non_editable_field": "changed"}))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(row(&app, "tests.vanilla", 1).await["non_editable_field"], "");
}

#[tokio::test]
async fn test_invalid_hyperlinks() {
    let (_app, mut client) = logged_in().await;
    let cases = [
        ("http://testserver/tests-bar/1/", "Invalid hyperlink - Incorrect URL match."),
        ("http://testserver/nowhere/1/", "Invalid hyperlink - No URL match."),
        ("http://testserver/tests-foo/99/", "Invalid hyperlink - Object does not exist."),
    ];
    for (link, message) in cases {
        let response = client
            .patch_json("/tests-vanilla/1/", &json!({"foreign_field": link}))
            .await;
        assert_eq!(response.status_code(), 400, "{link}");
        assert_eq!(response.json().unwrap(), json!({"foreign_field": [message]}), "{link}");
    }
}

#[tokio::test]
async fn test_many_field_must_be_a_list() {
    let (_app, mut client) = logged_in().await;
    let response = client
        .patch_json("/tests-vanilla/1/", &json!({"many_field": "http://testserver/tests-bar/1/"}))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(
        response.json().unwrap(),
        json!({"many_field": ["Expected a list of items but got type \"str\"."]})
    );
}

#[tokio::test]
async fn test_with_form_list() {
    let (_app, mut client) = logged_in().await;
    let body = client.get("/tests-withform/").await.json().unwrap();
    assert_eq!(body[0], control("withform", 1, ""));
}

#[tokio::test]
async fn test_with_form_get() {
    let (_app, mut client) = logged_in().await;
    let body = client.get("/tests-withform/1/").await.json().unwrap();
    assert_eq!(body, control("withform", 1, ""));
}

#[tokio::test]
async fn test_with_form_create() {
    let (app, mut client) = logged_in().await;
    let response = client.post_form("/tests-withform/", &NEW_ROW).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    assert_eq!(response.json().unwrap(), control("withform", 2, ""));
    let created = row(&app, "tests.withform", 2).await;
    assert_eq!(created["foreign_field"], json!(1));
    assert_eq!(created["many_field"], json!([1]));
}

#[tokio::test]
async fn test_with_form_patch() {
    let (app, mut client) = logged_in().await;
    let response = client
        .patch_form("/tests-withform/1/", &[("editable_field", "editable_field_x")])
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    assert_eq!(response.json().unwrap()["editable_field"], "editable_field_x");
    let updated = row(&app, "tests.withform", 1).await;
    assert_eq!(updated["editable_field"], "editable_field_x");
    assert_eq!(updated["another_editable_field"], "another_editable_field");
    assert_eq!(updated["many_field"], json!([1]));
}

#[tokio::test]
async fn test_with_tricky_form_list() {
    let (_app, mut client) = logged_in().await;
    let body = client.get("/tests-withtrickyform/").await.json().unwrap();
    assert_eq!(body[0], control("withtrickyform", 1, ""));
}

#[tokio::test]
async fn test_with_tricky_form_create() {
    // Form-only fields never reach the form, so its required field fails.
    let (app, mut client) = logged_in().await;
    let mut data: Vec<(&str, &str)> = NEW_ROW.to_vec();
    data.push(("an_integer", "777"));
    let response = client.post_form("/tests-withtrickyform/", &data).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json().unwrap(), json!({"an_integer": ["This field is required."]}));
    assert!(!app.ctx.manager("tests.withtrickyform").unwrap().exists(&json!(2)).await.unwrap());
}

#[tokio::test]
async fn test_with_tricky_form_patch_is_lenient() {
    let (app, mut client) = logged_in().await;
    let response = client
        .patch_json("/tests-withtrickyform/1/", &json!({"editable_field": "editable_field_x"}))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    assert_eq!(row(&app, "tests.withtrickyform", 1).await["editable_field"], "editable_field_x");
}

#[tokio::test]
async fn test_with_admin_class_create_and_patch() {
    let (app, mut client) = logged_in().await;
    let response = client.post_form("/tests-withadminclass/", &NEW_ROW).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    assert_eq!(response.json().unwrap(), control("withadminclass", 2, ""));

    let response = client
        .patch_json(
            "/tests-withadminclass/2/",
            &json!({"another_editable_field": "another_editable_field_y"}),
        )
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    assert_eq!(response.json().unwrap(), control("withadminclass", 2, "_y"));
    assert_eq!(
        row(&app, "tests.withadminclass", 2).await["another_editable_field"],
        "another_editable_field_y"
    );
}

#[tokio::test]
async fn test_unknown_pk_is_not_found() {
    let (_app, mut client) = logged_in().await;
    assert_eq!(client.get("/tests-vanilla/99/").await.status_code(), 404);
    assert_eq!(client.get("/tests-vanilla/abc/").await.status_code(), 404);
}

#[tokio::test]
async fn test_anonymous_is_forbidden() {
    let app = build_test_app().await.unwrap();
    let mut client = TestClient::new(app.router.clone());
    assert_eq!(client.get("/tests-vanilla/").await.status_code(), 403);
    let response = client.post_form("/tests-vanilla/", &NEW_ROW).await;
    assert_eq!(response.status_code(), 403);
    assert_eq!(
        response.json().unwrap(),
        json!({"detail": "Authentication credentials were not provided."})
    );
}

#[tokio::test]
async fn test_logout_drops_session() {
    let (_app, mut client) = logged_in().await;
    assert_eq!(client.get("/tests-vanilla/").await.status_code(), 200);
    client.logout().await;
    assert_eq!(client.get("/tests-vanilla/").await.status_code(), 403);
}

#[tokio::test]
async fn test_login_failure() {
    let app = build_test_app().await.unwrap();
    let mut client = TestClient::new(app.router.clone());
    assert!(!client.login("superuser", "wrong").await);
    assert!(client.cookie("sessionid").is_none());
}

#[tokio::test]
async fn test_api_root_lists_endpoints() {
    let (_app, mut client) = logged_in().await;
    let body: Value = client.get("/").await.json().unwrap();
    assert_eq!(body["tests-vanilla"], "http://testserver/tests-vanilla/");
    assert_eq!(body["auth-user"], "http://testserver/auth-user/");
    assert!(body.get("tests-withoutmanager").is_none());
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (_app, mut client) = logged_in().await;
    let response = client.delete("/tests-vanilla/").await;
    assert_eq!(response.status_code(), 405);
}
