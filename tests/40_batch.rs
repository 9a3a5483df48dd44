mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{data, encode, error, TestApp, PREFIX};

#[tokio::test]
async fn batched_queries_share_a_status_when_all_succeed() -> Result<()> {
    let app = TestApp::new();
    app.create("investor", json!({ "logo": "https://a.io/l.png" })).await?;
    app.create("testimonial", json!({ "name": "Rin", "quote": "Great work." })).await?;

    let uri = format!(
        "{}/investor.getPublished,testimonial.getPublished,techstack.getPublished?batch=1",
        PREFIX
    );
    let (status, body) = app.get(&uri, None).await?;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().expect("batch array");
    assert_eq!(items.len(), 3);
    assert_eq!(data(&items[0]).as_array().map(Vec::len), Some(1));
    assert_eq!(data(&items[1])[0]["quote"], "Great work.");
    assert_eq!(data(&items[2]), &json!([]));
    Ok(())
}

#[tokio::test]
async fn mixed_batch_is_multi_status_with_independent_results() -> Result<()> {
    let app = TestApp::new();
    let token = common::token();
    let created = app.create("investor", json!({ "logo": "https://a.io/l.png" })).await?;

    let input = json!({
        "1": { "json": { "id": created["id"] } },
        "2": { "json": { "id": Uuid::new_v4() } },
    });
    let uri = format!(
        "{}/investor.getPublished,investor.getById,investor.getById,investor.nope?batch=1&input={}",
        PREFIX,
        encode(&input)
    );
    let (status, body) = app.get(&uri, Some(&token)).await?;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    let items = body.as_array().expect("batch array");
    assert_eq!(items.len(), 4);
    assert_eq!(data(&items[0]).as_array().map(Vec::len), Some(1));
    assert_eq!(data(&items[1])["id"], created["id"]);
    assert_eq!(error(&items[2])["code"], "NOT_FOUND");
    assert_eq!(error(&items[2])["data"]["httpStatus"], 404);
    assert_eq!(error(&items[3])["data"]["path"], "investor.nope");
    Ok(())
}

#[tokio::test]
async fn anonymous_batch_only_fails_protected_calls() -> Result<()> {
    let app = TestApp::new();

    let uri = format!("{}/investor.getPublished,investor.getAll?batch=1", PREFIX);
    let (status, body) = app.get(&uri, None).await?;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert!(body[0].get("result").is_some());
    assert_eq!(error(&body[1])["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn batched_mutations_run_each_call() -> Result<()> {
    let app = TestApp::new();
    let token = common::token();

    let body = json!({
        "0": { "json": { "name": "Rust", "icon": "https://icons.dev/rust.svg", "category": "language" } },
        "1": { "json": { "name": "", "icon": "https://icons.dev/blank.svg" } },
    });
    let (status, result) = app
        .post(
            &format!("{}/techstack.create,techstack.create?batch=1", PREFIX),
            body,
            Some(&token),
        )
        .await?;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(data(&result[0])["name"], "Rust");
    assert_eq!(error(&result[1])["data"]["fieldErrors"]["name"], "Required");

    let (_, listing) = app.query("techstack.getAll", None, Some(&token)).await?;
    assert_eq!(data(&listing).as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn method_must_match_procedure_kind() -> Result<()> {
    let app = TestApp::new();
    let token = common::token();

    let (status, body) = app
        .post(&format!("{}/investor.getAll", PREFIX), json!({ "json": null }), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error(&body)["code"], "METHOD_NOT_SUPPORTED");

    let (status, _) = app
        .query("investor.delete", Some(json!({ "id": Uuid::new_v4() })), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn oversized_batch_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let paths = vec!["investor.getPublished"; 11].join(",");

    let (status, body) = app.get(&format!("{}/{}?batch=1", PREFIX, paths), None).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let items = body.as_array().expect("batch array");
    assert_eq!(items.len(), 11);
    assert!(items.iter().all(|item| error(item)["code"] == "BAD_INPUT"));
    Ok(())
}

#[tokio::test]
async fn malformed_input_json_is_bad_input() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .get(&format!("{}/investor.getPublished?input=%7Bnope", PREFIX), None)
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body)["code"], "BAD_INPUT");
    Ok(())
}

#[tokio::test]
async fn undefined_meta_leaves_patch_field_untouched() -> Result<()> {
    let app = TestApp::new();
    let token = common::token();
    let created = app
        .create("testimonial", json!({ "name": "Rin", "role": "CTO", "quote": "Great work." }))
        .await?;

    let body = json!({
        "json": { "id": created["id"], "data": { "role": null, "company": null } },
        "meta": { "values": { "data.role": ["undefined"] } },
    });
    let (status, result) = app
        .post(&format!("{}/testimonial.update", PREFIX), body, Some(&token))
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&result)["role"], "CTO");
    assert_eq!(data(&result)["company"], Value::Null);
    Ok(())
}
