use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::settings::Credentials;
use crate::error::{EtlError, Result};
use crate::record::{Applicant, SourceRecord};

const USERS_SELECT_PATH: &str = "/rest/v1/users?select=*";
const USERS_TABLE_PATH: &str = "/rest/v1/users";

/// Thin PostgREST client for the hosted `users` table.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
}

impl SupabaseClient {
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .default_headers(auth_headers(&credentials.api_key)?)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: credentials.base_url.clone(),
        })
    }

    /// One GET of every row. No retry, no pagination.
    pub async fn fetch_users(&self) -> Result<Vec<SourceRecord>> {
        let url = format!("{}{}", self.base_url, USERS_SELECT_PATH);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let records = decode_users(status, &body)?;
        info!("Extracted {} records from Supabase", records.len());
        Ok(records)
    }

    /// Insert one submission into the hosted table. Returns the rows echoed back.
    pub async fn insert_user(&self, applicant: &Applicant) -> Result<usize> {
        let url = format!("{}{}", self.base_url, USERS_TABLE_PATH);
        let response = self
            .http
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&applicant.to_json())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        ensure_success(status, &body)?;

        let echoed: Vec<Value> = if body.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&body)?
        };
        if echoed.is_empty() {
            warn!("Supabase accepted the insert but returned no rows");
        } else {
            info!("Data inserted successfully");
        }
        Ok(echoed.len())
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let invalid =
        |_: InvalidHeaderValue| EtlError::Config("API key is not a valid header value".into());
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(api_key).map_err(invalid)?;
    key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(invalid)?;
    bearer.set_sensitive(true);
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn ensure_success(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(EtlError::UpstreamFetch {
            status: status.as_u16(),
            body: body.to_string(),
        })
    }
}

/// Status check, JSON decode and the empty-payload guard of the extract step.
pub fn decode_users(status: StatusCode, body: &str) -> Result<Vec<SourceRecord>> {
    ensure_success(status, body)?;
    let records: Vec<SourceRecord> = serde_json::from_str(body)?;
    if records.is_empty() {
        return Err(EtlError::NoDataExtracted);
    }
    Ok(records)
}
