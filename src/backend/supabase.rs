use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{BackendClient, Query, Table, UploadObject, UploadOptions, dto};
use crate::error::{AppError, BackendError};
use crate::models::{Session, User};

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| AppError::BadRequest("SUPABASE_URL is not set".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AppError::BadRequest("SUPABASE_ANON_KEY is not set".to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }
}

/// REST, storage and auth client for the hosted backend.
pub struct SupabaseClient {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Url::parse(&format!("{}/{}", self.config.url, path))
            .map_err(|e| BackendError::new(format!("invalid backend url: {}", e)))
    }

    /// PostgREST url for a table query: `?select=..&col=eq.val&order=..&limit=..`.
    pub(crate) fn rest_url(&self, query: &Query, with_select: bool) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", query.table.as_str()))?;
        {
            let mut pairs = url.query_pairs_mut();
            if with_select {
                pairs.append_pair("select", &query.projection());
            }
            for filter in &query.filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = &query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.config.anon_key);
        request
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<dto::ApiErrorBody>(&body)
            .ok()
            .and_then(dto::ApiErrorBody::into_message)
            .unwrap_or_else(|| format!("backend responded {}: {}", status, body));
        warn!("backend error {}: {}", status, message);
        Err(BackendError::with_status(status.as_u16(), message))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let response = Self::check(response).await?;
        let body = response.text().await?;
        serde_json::from_str::<T>(&body)
            .map_err(|e| BackendError::new(format!("Failed to parse backend response: {}", e)))
    }
}

#[async_trait]
impl BackendClient for SupabaseClient {
    async fn select(&self, query: &Query, access_token: Option<&str>) -> Result<Vec<Value>, BackendError> {
        let url = self.rest_url(query, true)?;
        debug!("select {}", url);
        let response = self
            .authorize(self.client.get(url), access_token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn insert(&self, table: Table, row: Value, access_token: Option<&str>) -> Result<Value, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{}", table.as_str()))?;
        // visitors may insert but not read back, so they get the submitted row
        let prefer = if access_token.is_some() {
            "return=representation"
        } else {
            "return=minimal"
        };
        let response = self
            .authorize(self.client.post(url), access_token)
            .header("Prefer", prefer)
            .json(&Value::Array(vec![row.clone()]))
            .send()
            .await?;
        if access_token.is_none() {
            Self::check(response).await?;
            return Ok(row);
        }
        let mut rows: Vec<Value> = Self::read_json(response).await?;
        rows.pop()
            .ok_or_else(|| BackendError::new(format!("insert into {} returned no row", table.as_str())))
    }

    async fn update(&self, query: &Query, patch: Value, access_token: Option<&str>) -> Result<Vec<Value>, BackendError> {
        let url = self.rest_url(query, false)?;
        let response = self
            .authorize(self.client.patch(url), access_token)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete(&self, query: &Query, access_token: Option<&str>) -> Result<u64, BackendError> {
        let url = self.rest_url(query, false)?;
        let response = self
            .authorize(self.client.delete(url), access_token)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<Value> = Self::read_json(response).await?;
        Ok(rows.len() as u64)
    }

    async fn upload(
        &self,
        object: UploadObject<'_>,
        options: UploadOptions,
        access_token: Option<&str>,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", object.bucket, object.path))?;
        let response = self
            .authorize(self.client.post(url), access_token)
            .header("Content-Type", object.content_type)
            .header("cache-control", format!("max-age={}", options.cache_control_secs))
            .header("x-upsert", options.upsert.to_string())
            .body(object.bytes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.config.url, bucket, path)
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .authorize(self.client.get(url), Some(access_token))
            .send()
            .await?;
        match Self::read_json::<dto::UserDto>(response).await {
            Ok(user) => Ok(Some(user.into())),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self
            .authorize(self.client.post(url), None)
            .json(&dto::PasswordGrantRequest { email, password })
            .send()
            .await?;
        let session: dto::SessionDto = Self::read_json(response).await?;
        Ok(session.into())
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<User, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let body = dto::SignUpRequest {
            email,
            password,
            data: dto::SignUpMetadata { full_name },
        };
        let response = self
            .authorize(self.client.post(url), None)
            .json(&body)
            .send()
            .await?;
        let created: dto::SignUpResponse = Self::read_json(response).await?;
        Ok(created.into_user())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .authorize(self.client.post(url), Some(access_token))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(SupabaseConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
        })
        .expect("client")
    }

    #[test]
    fn rest_url_encodes_query_modifiers() {
        let query = Query::from(Table::Courses)
            .eq("id", "1f0c")
            .order("created_at", false)
            .limit(3);
        let url = client().rest_url(&query, true).unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/courses?select=*&id=eq.1f0c&order=created_at.desc&limit=3"
        );
    }

    #[test]
    fn mutation_url_carries_only_filters() {
        let query = Query::from(Table::Applications).eq("id", "a-1");
        let url = client().rest_url(&query, false).unwrap();
        assert_eq!(url.as_str(), "https://project.supabase.co/rest/v1/applications?id=eq.a-1");
    }

    #[test]
    fn public_url_points_at_public_bucket() {
        assert_eq!(
            client().public_url("course-images", "1700000000000_ab12cd.png"),
            "https://project.supabase.co/storage/v1/object/public/course-images/1700000000000_ab12cd.png"
        );
    }
}
