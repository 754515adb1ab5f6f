//! Store backed by the Supabase REST API (PostgREST).

use super::{Store, StoreError, REVIEWS_TABLE, TARGETS_TABLE};
use crate::models::{NewReview, NewTarget, Review, Target};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Error body PostgREST sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl PostgrestError {
    fn describe(self, fallback: String) -> (Option<String>, String) {
        let mut message = self.message.unwrap_or(fallback);
        if let Some(details) = self.details.filter(|d| !d.is_empty()) {
            message.push_str(&format!(" ({})", details));
        }
        if let Some(hint) = self.hint.filter(|h| !h.is_empty()) {
            message.push_str(&format!(" Hint: {}", hint));
        }
        (self.code, message)
    }
}

/// Client for the `targets` and `reviews` tables of a Supabase project.
pub struct PostgrestStore {
    http_client: reqwest::Client,
    rest_url: String,
}

impl PostgrestStore {
    /// Create a client for the project at `url` authenticated with `key`.
    pub fn new(url: &str, key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(key)
            .map_err(|_| StoreError::Config("supabase key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| StoreError::Config("supabase key is not a valid header value".into()))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Read every row of `table`. Rows that do not decode are skipped with a
    /// warning so one bad row cannot hide the rest of the table.
    async fn select_all<T>(&self, table: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        debug!("Selecting all rows from {}", table);

        let response = self
            .http_client
            .get(self.table_url(table))
            .query(&[("select", "*"), ("order", "id.asc")])
            .send()
            .await?;

        let raw_rows = check_status(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|source| StoreError::Decode { table, source })?;

        let fetched = raw_rows.len();
        let rows: Vec<T> = raw_rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").cloned().unwrap_or(serde_json::Value::Null);
                match serde_json::from_value(row) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!("Skipping unreadable {} row (id {}): {}", table, id, e);
                        None
                    }
                }
            })
            .collect();

        debug!("Fetched {} rows from {} ({} kept)", fetched, table, rows.len());
        Ok(rows)
    }

    async fn insert<B, T>(&self, table: &'static str, body: &B) -> Result<T, StoreError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Inserting into {}", table);

        let response = self
            .http_client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let rows = check_status(response)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|source| StoreError::Decode { table, source })?;

        rows.into_iter().next().ok_or(StoreError::EmptyInsert(table))
    }
}

/// Turn a non-2xx response into [`StoreError::Api`] carrying the server's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let fallback = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.clone()
    };

    let (code, message) = match serde_json::from_str::<PostgrestError>(&body) {
        Ok(parsed) => parsed.describe(fallback),
        Err(_) => (None, fallback),
    };

    warn!("Store request failed with HTTP {}: {}", status, message);
    Err(StoreError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl Store for PostgrestStore {
    fn kind(&self) -> &'static str {
        "supabase"
    }

    async fn insert_target(&self, target: &NewTarget) -> Result<Target, StoreError> {
        self.insert(TARGETS_TABLE, target).await
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        self.select_all(TARGETS_TABLE).await
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review, StoreError> {
        match self.insert(REVIEWS_TABLE, review).await {
            Err(err) if err.is_foreign_key_violation() => {
                Err(StoreError::UnknownTarget(review.target_id))
            }
            other => other,
        }
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        self.select_all(REVIEWS_TABLE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rating, Role};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> PostgrestStore {
        PostgrestStore::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_targets_sends_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/targets"))
            .and(query_param("select", "*"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Ana", "role": "Professor", "department": "COMP"},
                {"id": 2, "name": "RU", "role": "Lugar/Comida", "department": null}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let targets = store_for(&server).list_targets().await.unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].role, Role::Professor);
        assert_eq!(targets[1].department, "");
    }

    #[tokio::test]
    async fn test_insert_target_returns_created_row() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/targets"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({"name": "Ana", "role": "Professor", "department": "COMP"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"id": 10, "name": "Ana", "role": "Professor", "department": "COMP"}
            ])))
            .mount(&server)
            .await;

        let new_target = NewTarget::new("Ana", Role::Professor, "COMP").unwrap();
        let target = store_for(&server).insert_target(&new_target).await.unwrap();

        assert_eq!(target.id, 10);
        assert_eq!(target.name, "Ana");
    }

    #[tokio::test]
    async fn test_insert_review_maps_foreign_key_violation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/reviews"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23503",
                "message": "insert or update on table \"reviews\" violates foreign key constraint",
                "details": "Key (target_id)=(99) is not present in table \"targets\".",
                "hint": null
            })))
            .mount(&server)
            .await;

        let review = NewReview::new(99, Rating::new(4).unwrap(), "");
        let err = store_for(&server).insert_review(&review).await.unwrap_err();

        assert!(matches!(err, StoreError::UnknownTarget(99)));
    }

    #[tokio::test]
    async fn test_api_error_keeps_server_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/reviews"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Invalid API key",
                "hint": "Double check your Supabase `anon` or `service_role` API key."
            })))
            .mount(&server)
            .await;

        let err = store_for(&server).list_reviews().await.unwrap_err();

        match err {
            StoreError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.starts_with("Invalid API key"));
                assert!(message.contains("Hint:"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unlisted_role_does_not_hide_other_targets() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/targets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Ana", "role": "Professor", "department": "COMP"},
                {"id": 2, "name": "Zeca", "role": "Coordenador", "department": "DEX"}
            ])))
            .mount(&server)
            .await;

        let targets = store_for(&server).list_targets().await.unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].role, Role::Professor);
        assert_eq!(targets[1].name, "Zeca");
        assert_eq!(targets[1].role, Role::Other);
    }

    #[tokio::test]
    async fn test_unreadable_review_rows_are_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "target_id": 1, "rating": 4, "comment": "ok"},
                {"id": 2, "target_id": 1, "rating": 9, "comment": "off the scale"},
                {"id": 3, "target_id": 2, "rating": 1, "comment": null}
            ])))
            .mount(&server)
            .await;

        let reviews = store_for(&server).list_reviews().await.unwrap();

        let ids: Vec<_> = reviews.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
            .mount(&server)
            .await;

        let err = store_for(&server).list_reviews().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { table: "reviews", .. }));
    }
}
