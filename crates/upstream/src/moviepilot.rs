//! MoviePilot API client.
//!
//! Every call authenticates with `?token=<api key>`. Response shapes vary between
//! MoviePilot releases, so parsing here is deliberately lenient: lists may come bare
//! or wrapped in `data`, and numbers may arrive as strings.

use std::time::Duration;

use checkmp_core::{MediaCandidate, MediaStatistic, MediaType, Subscription, SubscriptionStatus};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::UpstreamError;
use crate::service::{MediaService, PopularFilter};

const API_PREFIX: &str = "/api/v1";

/// Connection settings for [`MoviePilotClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Reject self-signed certificates when true.
    pub verify_tls: bool,
}

pub struct MoviePilotClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl MoviePilotClient {
    pub fn new(config: &ClientConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| UpstreamError::Unexpected(format!("build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, UpstreamError> {
        let mut all_params = vec![("token", self.api_key.clone())];
        all_params.extend_from_slice(params);

        let url = format!("{}{API_PREFIX}{path}", self.base_url);
        debug!(method = %method, path = %path, "MoviePilot request");

        let mut req = self.client.request(method, &url).query(&all_params);
        if let Some(body) = body {
            req = req.json(body);
        }

        // Strip the URL from transport errors so the token never reaches a log line.
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Unavailable(format!("request timed out: {path}"))
            } else {
                UpstreamError::Unavailable(format!("{path}: {}", e.without_url()))
            }
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            UpstreamError::Unavailable(format!("{path}: read body: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(status_error(status, path, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Unexpected(format!("{path}: parse JSON: {e}")))
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        self.request(Method::GET, path, params, None).await
    }
}

#[async_trait::async_trait]
impl MediaService for MoviePilotClient {
    async fn search(
        &self,
        title: &str,
        page: u32,
        count: u32,
    ) -> Result<Vec<MediaCandidate>, UpstreamError> {
        let params = [
            ("title", title.to_string()),
            ("type", "media".to_string()),
            ("page", page.to_string()),
            ("count", count.to_string()),
        ];
        let data = self.get("/media/search", &params).await?;
        Ok(list_items(&data).iter().map(parse_media).collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, UpstreamError> {
        let data = self.get("/subscribe/list", &[]).await?;
        Ok(list_items(&data)
            .iter()
            .filter_map(parse_subscription)
            .collect())
    }

    async fn create_subscription(
        &self,
        candidate: &MediaCandidate,
        season: Option<i32>,
    ) -> Result<Subscription, UpstreamError> {
        let tmdb_id = candidate
            .tmdb_id
            .ok_or_else(|| UpstreamError::Validation("candidate has no TMDB id".into()))?;
        let payload = subscribe_payload(candidate, season);

        let data = self
            .request(Method::POST, "/subscribe/", &[], Some(&payload))
            .await?;
        let data = check_mutation(data, "/subscribe/", MutationKind::Create)?;

        let id = as_i64(&data["data"]["id"])
            .or_else(|| as_i64(&data["id"]))
            .ok_or_else(|| UpstreamError::Unexpected("create response carries no id".into()))?;

        let media_type = candidate.media_type.unwrap_or_default();
        Ok(Subscription {
            id,
            tmdb_id: Some(tmdb_id),
            title: candidate.title.clone(),
            year: candidate.year.clone(),
            media_type: Some(media_type),
            season: season.filter(|_| media_type == MediaType::Tv),
            poster: candidate.poster.clone(),
            rating: candidate.rating,
            description: candidate.overview.clone(),
            status: SubscriptionStatus::Pending,
        })
    }

    async fn delete_subscription(&self, id: i64) -> Result<(), UpstreamError> {
        let path = format!("/subscribe/{id}");
        let data = self.request(Method::DELETE, &path, &[], None).await?;
        check_mutation(data, &path, MutationKind::Delete)?;
        Ok(())
    }

    async fn popular(
        &self,
        media_type: MediaType,
        filter: &PopularFilter,
    ) -> Result<Vec<MediaCandidate>, UpstreamError> {
        let mut params = vec![
            ("stype", media_type.upstream_label().to_string()),
            ("page", filter.page.to_string()),
            ("count", filter.count.to_string()),
        ];
        if let Some(genre_id) = filter.genre_id {
            params.push(("genre_id", genre_id.to_string()));
        }
        if let Some(min_rating) = filter.min_rating {
            params.push(("min_rating", min_rating.to_string()));
        }

        let data = self.get("/subscribe/popular", &params).await?;
        Ok(list_items(&data).iter().map(parse_media).collect())
    }

    async fn statistic(&self) -> Result<MediaStatistic, UpstreamError> {
        let data = self.get("/dashboard/statistic2", &[]).await?;
        Ok(parse_statistic(unwrap_data(&data)))
    }

    async fn storage(&self) -> Result<Value, UpstreamError> {
        self.get("/dashboard/storage2", &[]).await
    }

    async fn downloader(&self) -> Result<Value, UpstreamError> {
        self.get("/dashboard/downloader2", &[]).await
    }
}

fn status_error(status: StatusCode, path: &str, body: &str) -> UpstreamError {
    let detail = upstream_message(body).unwrap_or_else(|| format!("{path} returned {status}"));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamError::Auth(detail),
        StatusCode::NOT_FOUND => UpstreamError::NotFound(detail),
        StatusCode::CONFLICT => UpstreamError::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            UpstreamError::Validation(detail)
        }
        s if s.is_server_error() => UpstreamError::Unavailable(detail),
        _ => UpstreamError::Unexpected(detail),
    }
}

/// Pull a human-readable message out of an error body (`message` or FastAPI's `detail`).
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(message) = value["message"].as_str().filter(|m| !m.is_empty()) {
        return Some(message.to_string());
    }
    match &value["detail"] {
        Value::String(d) if !d.is_empty() => Some(d.clone()),
        detail @ (Value::Array(_) | Value::Object(_)) => Some(detail.to_string()),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum MutationKind {
    Create,
    Delete,
}

/// Interpret the `{ success, message, data }` envelope of a mutating call.
///
/// MoviePilot answers an already-present subscription with the existing id and an
/// "already exists" message, sometimes with `success: true`.
fn check_mutation(data: Value, path: &str, kind: MutationKind) -> Result<Value, UpstreamError> {
    let message = data["message"].as_str().unwrap_or("").to_string();
    let success = data["success"].as_bool().unwrap_or(true);

    if matches!(kind, MutationKind::Create) && is_duplicate_message(&message) {
        return Err(UpstreamError::Conflict(message));
    }
    if success {
        return Ok(data);
    }

    let message = if message.is_empty() {
        format!("{path} was rejected")
    } else {
        message
    };
    Err(match kind {
        MutationKind::Create => UpstreamError::Validation(message),
        MutationKind::Delete => UpstreamError::NotFound(message),
    })
}

fn is_duplicate_message(message: &str) -> bool {
    message.contains("已存在") || message.to_lowercase().contains("already exist")
}

fn subscribe_payload(candidate: &MediaCandidate, season: Option<i32>) -> Value {
    let media_type = candidate.media_type.unwrap_or_default();
    let mut payload = json!({
        "name": candidate.title,
        "type": media_type.upstream_label(),
        "tmdbid": candidate.tmdb_id,
        "year": candidate.year,
        "poster": candidate.poster,
        "backdrop": candidate.backdrop,
        "vote": candidate.rating,
        "description": candidate.overview,
    });
    if let (MediaType::Tv, Some(season)) = (media_type, season) {
        payload["season"] = json!(season);
    }
    payload
}

fn unwrap_data(value: &Value) -> &Value {
    match value.get("data") {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => value,
    }
}

fn list_items(value: &Value) -> Vec<Value> {
    unwrap_data(value).as_array().cloned().unwrap_or_default()
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric value from a number or numeric string. Non-finite values count as absent.
fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| as_text(&item[*k]).filter(|s| !s.is_empty()))
        .unwrap_or_default()
}

fn parse_media(item: &Value) -> MediaCandidate {
    MediaCandidate {
        tmdb_id: as_i64(&item["tmdb_id"]).or_else(|| as_i64(&item["tmdbid"])),
        douban_id: as_text(&item["douban_id"]).filter(|s| !s.is_empty()),
        title: first_text(item, &["title", "name"]),
        year: first_text(item, &["year"]),
        media_type: item["type"].as_str().and_then(MediaType::from_label),
        rating: as_f64(&item["vote_average"])
            .or_else(|| as_f64(&item["vote"]))
            .unwrap_or(0.0),
        overview: first_text(item, &["overview"]),
        poster: first_text(item, &["poster_path", "poster"]),
        backdrop: first_text(item, &["backdrop_path", "backdrop"]),
        season: as_i64(&item["season"]).and_then(|s| i32::try_from(s).ok()),
        original_language: item["original_language"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()),
    }
}

fn parse_subscription(item: &Value) -> Option<Subscription> {
    Some(Subscription {
        id: as_i64(&item["id"])?,
        tmdb_id: as_i64(&item["tmdbid"]).or_else(|| as_i64(&item["tmdb_id"])),
        title: first_text(item, &["name", "title"]),
        year: first_text(item, &["year"]),
        media_type: item["type"].as_str().and_then(MediaType::from_label),
        season: as_i64(&item["season"]).and_then(|s| i32::try_from(s).ok()),
        poster: first_text(item, &["poster"]),
        rating: as_f64(&item["vote"]).unwrap_or(0.0),
        description: first_text(item, &["description"]),
        status: SubscriptionStatus::from_upstream(item["state"].as_str().unwrap_or("")),
    })
}

fn parse_statistic(data: &Value) -> MediaStatistic {
    let count = |key: &str| as_i64(&data[key]).map(|n| n.max(0) as u64).unwrap_or(0);
    MediaStatistic {
        movie_count: count("movie_count"),
        tv_count: count("tv_count"),
        episode_count: count("episode_count"),
        user_count: count("user_count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_media_from_search_json() {
        let json = json!({
            "tmdb_id": 93405,
            "douban_id": "34812928",
            "title": "鱿鱼游戏",
            "year": "2021",
            "type": "电视剧",
            "vote_average": 7.8,
            "overview": "Hundreds of cash-strapped players...",
            "poster_path": "https://image.tmdb.org/t/p/w500/poster.jpg",
            "backdrop_path": "",
            "season": null,
            "original_language": "ko"
        });

        let media = parse_media(&json);
        assert_eq!(media.tmdb_id, Some(93405));
        assert_eq!(media.douban_id.as_deref(), Some("34812928"));
        assert_eq!(media.title, "鱿鱼游戏");
        assert_eq!(media.media_type, Some(MediaType::Tv));
        assert!((media.rating - 7.8).abs() < 0.01);
        assert!(media.poster.ends_with("/poster.jpg"));
        assert_eq!(media.backdrop, "");
        assert_eq!(media.season, None);
        assert_eq!(media.original_language.as_deref(), Some("ko"));
    }

    #[test]
    fn parse_media_tolerates_string_numbers() {
        let json = json!({
            "tmdb_id": "1396",
            "name": "Breaking Bad",
            "year": 2008,
            "type": "人物",
            "vote_average": "9.5"
        });

        let media = parse_media(&json);
        assert_eq!(media.tmdb_id, Some(1396));
        assert_eq!(media.title, "Breaking Bad");
        assert_eq!(media.year, "2008");
        assert_eq!(media.media_type, None);
        assert!((media.rating - 9.5).abs() < 0.01);
    }

    #[test]
    fn parse_media_rejects_non_finite_rating_and_oversized_season() {
        let json = json!({
            "tmdb_id": 2,
            "title": "Broken",
            "type": "电视剧",
            "vote_average": "NaN",
            "vote": "inf",
            "season": 4_294_967_298_i64
        });

        let media = parse_media(&json);
        assert_eq!(media.rating, 0.0);
        assert_eq!(media.season, None);

        let sub = parse_subscription(&json!({ "id": 3, "vote": "NaN", "season": -4_294_967_295_i64 }))
            .unwrap();
        assert_eq!(sub.rating, 0.0);
        assert_eq!(sub.season, None);
    }

    #[test]
    fn parse_subscription_from_list_json() {
        let json = json!({
            "id": 12,
            "name": "鱿鱼游戏",
            "year": "2021",
            "type": "电视剧",
            "tmdbid": 93405,
            "season": 2,
            "poster": "/p.jpg",
            "vote": 8.0,
            "description": "",
            "state": "R"
        });

        let sub = parse_subscription(&json).unwrap();
        assert_eq!(sub.id, 12);
        assert_eq!(sub.tmdb_id, Some(93405));
        assert_eq!(sub.season, Some(2));
        assert_eq!(sub.media_type, Some(MediaType::Tv));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn subscription_without_id_is_skipped() {
        assert!(parse_subscription(&json!({ "name": "orphan" })).is_none());
    }

    #[test]
    fn list_items_accepts_bare_wrapped_and_null() {
        assert_eq!(list_items(&json!([{ "id": 1 }])).len(), 1);
        assert_eq!(list_items(&json!({ "data": [{ "id": 1 }, { "id": 2 }] })).len(), 2);
        assert!(list_items(&Value::Null).is_empty());
        assert!(list_items(&json!({ "success": true })).is_empty());
    }

    #[test]
    fn statistic_reads_wrapped_counts() {
        let json = json!({ "data": { "movie_count": 120, "tv_count": "45", "episode_count": 900 } });
        let stat = parse_statistic(unwrap_data(&json));
        assert_eq!(stat.movie_count, 120);
        assert_eq!(stat.tv_count, 45);
        assert_eq!(stat.episode_count, 900);
        assert_eq!(stat.user_count, 0);
    }

    #[test]
    fn payload_sends_season_only_for_tv() {
        let mut candidate = MediaCandidate {
            tmdb_id: Some(93405),
            title: "Squid Game".into(),
            year: "2021".into(),
            media_type: Some(MediaType::Tv),
            ..Default::default()
        };
        let payload = subscribe_payload(&candidate, Some(2));
        assert_eq!(payload["type"], "电视剧");
        assert_eq!(payload["tmdbid"], 93405);
        assert_eq!(payload["season"], 2);

        candidate.media_type = Some(MediaType::Movie);
        let payload = subscribe_payload(&candidate, Some(2));
        assert_eq!(payload["type"], "电影");
        assert!(payload.get("season").is_none());
    }

    #[test]
    fn duplicate_create_is_a_conflict_even_on_success() {
        let data = json!({ "success": true, "message": "订阅已存在", "data": { "id": 3 } });
        let err = check_mutation(data, "/subscribe/", MutationKind::Create).unwrap_err();
        assert!(matches!(err, UpstreamError::Conflict(_)));
    }

    #[test]
    fn rejected_mutations_map_by_kind() {
        let data = json!({ "success": false, "message": "bad season" });
        let err = check_mutation(data.clone(), "/subscribe/", MutationKind::Create).unwrap_err();
        assert!(matches!(err, UpstreamError::Validation(_)));

        let err = check_mutation(data, "/subscribe/9", MutationKind::Delete).unwrap_err();
        assert!(matches!(err, UpstreamError::NotFound(_)));

        let ok = check_mutation(Value::Null, "/subscribe/9", MutationKind::Delete);
        assert!(ok.is_ok());
    }

    #[test]
    fn status_errors_follow_taxonomy() {
        let auth = status_error(StatusCode::UNAUTHORIZED, "/subscribe/list", "");
        assert!(matches!(auth, UpstreamError::Auth(_)));
        let forbidden = status_error(StatusCode::FORBIDDEN, "/subscribe/list", "");
        assert!(matches!(forbidden, UpstreamError::Auth(_)));
        let unavailable = status_error(StatusCode::BAD_GATEWAY, "/media/search", "");
        assert!(matches!(unavailable, UpstreamError::Unavailable(_)));
        let invalid = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "/subscribe/",
            r#"{"detail":[{"loc":["body","tmdbid"],"msg":"field required"}]}"#,
        );
        match invalid {
            UpstreamError::Validation(msg) => assert!(msg.contains("field required")),
            other => panic!("expected validation error, got {other:?}"),
        }
        let teapot = status_error(StatusCode::IM_A_TEAPOT, "/x", r#"{"message":"nope"}"#);
        assert!(matches!(teapot, UpstreamError::Unexpected(ref m) if m == "nope"));
    }
}
