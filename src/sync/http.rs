//! HTTP implementation of [`Remote`] on reqwest.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::remote::{
    Credentials, NewWorkout, PageRequest, PageResponse, PeriodDayMark, Remote, RemoteError,
    RemoteResult,
};
use crate::model::{Tag, TagId, TaggedDate, UserSettings, WeightEntry, Workout, WorkoutId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP client for the Aro API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.client.request(method, url).timeout(REQUEST_TIMEOUT);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn dispatch(&self, builder: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        debug!(status = status.as_u16(), %message, "Request rejected");
        Err(if status == StatusCode::UNAUTHORIZED {
            RemoteError::Unauthorized(message)
        } else {
            RemoteError::Status {
                status: status.as_u16(),
                message,
            }
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> RemoteResult<T> {
        self.dispatch(builder)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> RemoteResult<()> {
        self.dispatch(builder).await.map(drop)
    }
}

/// Error body returned by the server on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct IdsBody<'a> {
    ids: &'a [i64],
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkoutsBody<T> {
    workouts: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct TagsBody<T> {
    tags: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaggedDatesBody<'a> {
    tagged_dates: &'a [TaggedDate],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeightEntriesBody<'a> {
    weight_entries: &'a [WeightEntry],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PeriodDaysBody<'a> {
    period_days: &'a [PeriodDayMark],
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    jwt: String,
}

impl Remote for HttpRemote {
    async fn create_workouts(&self, token: &str, workouts: &[NewWorkout]) -> RemoteResult<Vec<Workout>> {
        let builder = self
            .request(Method::POST, "/auth/workout", Some(token))
            .json(&WorkoutsBody { workouts });
        let body: WorkoutsBody<Vec<Workout>> = self.send(builder).await?;
        Ok(body.workouts)
    }

    async fn delete_workouts(&self, token: &str, ids: &[WorkoutId]) -> RemoteResult<()> {
        let builder = self
            .request(Method::DELETE, "/auth/workout", Some(token))
            .json(&IdsBody { ids });
        self.send_empty(builder).await
    }

    async fn upsert_tags(&self, token: &str, tags: &[Tag]) -> RemoteResult<Vec<Tag>> {
        let builder = self
            .request(Method::POST, "/auth/tag", Some(token))
            .json(&TagsBody { tags });
        let body: TagsBody<Vec<Tag>> = self.send(builder).await?;
        Ok(body.tags)
    }

    async fn delete_tags(&self, token: &str, ids: &[TagId]) -> RemoteResult<()> {
        let builder = self
            .request(Method::DELETE, "/auth/tag", Some(token))
            .json(&IdsBody { ids });
        self.send_empty(builder).await
    }

    async fn upsert_tagged_dates(&self, token: &str, dates: &[TaggedDate]) -> RemoteResult<()> {
        let builder = self
            .request(Method::POST, "/auth/tagged-dates", Some(token))
            .json(&TaggedDatesBody {
                tagged_dates: dates,
            });
        self.send_empty(builder).await
    }

    async fn upsert_weight_entries(&self, token: &str, entries: &[WeightEntry]) -> RemoteResult<()> {
        let builder = self
            .request(Method::POST, "/auth/weight", Some(token))
            .json(&WeightEntriesBody {
                weight_entries: entries,
            });
        self.send_empty(builder).await
    }

    async fn set_period_days(&self, token: &str, days: &[PeriodDayMark]) -> RemoteResult<()> {
        let builder = self
            .request(Method::POST, "/auth/period", Some(token))
            .json(&PeriodDaysBody { period_days: days });
        self.send_empty(builder).await
    }

    async fn update_settings(&self, token: &str, settings: &UserSettings) -> RemoteResult<()> {
        let builder = self
            .request(Method::PUT, "/auth/settings", Some(token))
            .json(settings);
        self.send_empty(builder).await
    }

    async fn fetch_page(&self, token: &str, request: &PageRequest) -> RemoteResult<PageResponse> {
        let builder = self
            .request(Method::POST, "/auth/userinfo", Some(token))
            .json(request);
        self.send(builder).await
    }

    async fn login(&self, credentials: &Credentials) -> RemoteResult<String> {
        let builder = self.request(Method::POST, "/login", None).json(credentials);
        let body: TokenBody = self.send(builder).await?;
        Ok(body.jwt)
    }

    async fn signup(&self, credentials: &Credentials) -> RemoteResult<String> {
        let builder = self.request(Method::POST, "/signup", None).json(credentials);
        let body: TokenBody = self.send(builder).await?;
        Ok(body.jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let remote = HttpRemote::new("http://localhost:8080/");
        assert_eq!(remote.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        // Port 9 (discard) is essentially never listening on loopback.
        let remote = HttpRemote::new("http://127.0.0.1:9");
        let err = remote
            .delete_workouts("token", &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_error_body_shape() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"bad token"}"#).unwrap();
        assert_eq!(body.error, "bad token");
    }
}
