mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn find_id(server: &common::TestServer, bearer: &str, name: &str) -> Result<Option<i64>> {
    let body = reqwest::Client::new()
        .get(server.url("/api/pages"))
        .header("Authorization", bearer)
        .send()
        .await?
        .json::<Value>()
        .await?;
    let pages = body["pages"].as_array().context("pages array")?;
    Ok(pages
        .iter()
        .find(|page| page["name"] == name)
        .and_then(|page| page["id"].as_i64()))
}

#[tokio::test]
async fn page_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    let foo = common::bearer(server, "foo", "bar").await?;
    let client = reqwest::Client::new();
    let name = common::page_name("lifecycle");

    let res = client
        .post(server.url("/api/pages"))
        .header("Authorization", &foo)
        .json(&json!({"name": name, "markdown": "# Test"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await?, json!({"success": true}));

    let id = find_id(server, &foo, &name).await?.context("created page listed")?;

    let res = client
        .put(server.url(&format!("/api/pages/{}", id)))
        .header("Authorization", &foo)
        .json(&json!({"markdown": "Yo!"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = client
        .get(server.url(&format!("/api/pages/{}", id)))
        .header("Authorization", &foo)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["page"]["name"], name.as_str());
    assert_eq!(body["page"]["markdown"], "Yo!");
    assert_eq!(body["page"]["html"], "<p>Yo!</p>\n");

    let res = client
        .delete(server.url(&format!("/api/pages/{}", id)))
        .header("Authorization", &foo)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(find_id(server, &foo, &name).await?, None);

    let res = client
        .get(server.url(&format!("/api/pages/{}", id)))
        .header("Authorization", &foo)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn concurrent_creates_are_both_visible() -> Result<()> {
    let server = common::ensure_server().await?;
    let foo = common::bearer(server, "foo", "bar").await?;
    let client = reqwest::Client::new();
    let (first, second) = (common::page_name("left"), common::page_name("right"));

    let create = |name: String| {
        client
            .post(server.url("/api/pages"))
            .header("Authorization", &foo)
            .json(&json!({"name": name, "markdown": "same time"}))
            .send()
    };
    let (a, b) = tokio::join!(create(first.clone()), create(second.clone()));
    assert_eq!(a?.status(), StatusCode::CREATED);
    assert_eq!(b?.status(), StatusCode::CREATED);

    assert!(find_id(server, &foo, &first).await?.is_some());
    assert!(find_id(server, &foo, &second).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn duplicate_names_fail_without_leaking_storage_details() -> Result<()> {
    let server = common::ensure_server().await?;
    let foo = common::bearer(server, "foo", "bar").await?;
    let client = reqwest::Client::new();
    let name = common::page_name("dup");

    for expected in [StatusCode::CREATED, StatusCode::INTERNAL_SERVER_ERROR] {
        let res = client
            .post(server.url("/api/pages"))
            .header("Authorization", &foo)
            .json(&json!({"name": name, "markdown": "x"}))
            .send()
            .await?;
        assert_eq!(res.status(), expected);
        if expected != StatusCode::CREATED {
            let body = res.json::<Value>().await?;
            assert_eq!(body["success"], false);
            assert!(!body["error"].as_str().unwrap_or_default().contains("UNIQUE"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() -> Result<()> {
    let server = common::ensure_server().await?;
    let foo = common::bearer(server, "foo", "bar").await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/pages"))
        .header("Authorization", &foo)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url("/api/pages/not-a-number"))
        .header("Authorization", &foo)
        .json(&json!({"markdown": "x"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url("/api/pages/987654"))
        .header("Authorization", &foo)
        .json(&json!({"markdown": "x"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
