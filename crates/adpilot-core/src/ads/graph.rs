//! Marketing API client over the Graph HTTP interface.
//!
//! Each create call is one `POST /{version}/act_{id}/{edge}`. Nested parameter
//! values (targeting, object_story_spec, ...) are sent JSON-encoded inside
//! the form body, which is how the Graph API expects them. Every request is
//! signed with `appsecret_proof`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::path::Path;
use std::time::Duration;

use crate::ads::{normalize_account_id, AdAccount, AdImage, AdObject, AdParams};
use crate::config::MetaConfig;
use crate::errors::AgentError;

type HmacSha256 = Hmac<Sha256>;

/// Credentials for one Marketing API session.
#[derive(Clone)]
pub struct AdsSession {
    access_token: String,
    app_id: String,
    app_secret: String,
}

impl std::fmt::Debug for AdsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsSession")
            .field("app_id", &self.app_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl AdsSession {
    pub fn new(access_token: String, app_id: String, app_secret: String) -> Self {
        Self {
            access_token,
            app_id,
            app_secret,
        }
    }

    pub fn from_config(meta: &MetaConfig) -> Result<Self, AgentError> {
        let require = |value: &Option<String>, env: &Option<String>, what: &str| {
            value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
                AgentError::AdsAuthentication(format!(
                    "missing {}; set {} or meta.{} in the configuration",
                    what,
                    env.as_deref().unwrap_or("the environment variable"),
                    what
                ))
            })
        };

        Ok(Self::new(
            require(&meta.access_token, &meta.access_token_env, "access_token")?,
            require(&meta.app_id, &meta.app_id_env, "app_id")?,
            require(&meta.app_secret, &meta.app_secret_env, "app_secret")?,
        ))
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// HMAC-SHA256 of the access token keyed by the app secret, hex encoded.
    pub fn appsecret_proof(&self) -> Result<String, AgentError> {
        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| AgentError::AdsAuthentication(format!("invalid app secret: {}", e)))?;
        mac.update(self.access_token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// The request never got an API answer, so this is not an Ads error.
fn transport_error(what: &str, e: reqwest::Error) -> AgentError {
    AgentError::IoError(format!("Marketing API {} failed: {}", what, e.without_url()))
}

pub struct GraphApiAccount {
    client: Client,
    base_url: String,
    api_version: String,
    account_id: String,
    session: AdsSession,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error_subcode: Option<i64>,
    #[serde(default)]
    fbtrace_id: Option<String>,
}

impl GraphApiAccount {
    pub fn new(session: AdsSession, account_id: &str) -> Self {
        Self::with_base_url(session, account_id, "https://graph.facebook.com", "v21.0")
    }

    pub fn with_base_url(
        session: AdsSession,
        account_id: &str,
        base_url: &str,
        api_version: &str,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            account_id: normalize_account_id(account_id),
            session,
        }
    }

    /// Build an account from resolved configuration.
    pub fn from_config(meta: &MetaConfig) -> Result<Self, AgentError> {
        let session = AdsSession::from_config(meta)?;
        let account_id = meta
            .ad_account_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AgentError::AdsAuthentication(format!(
                    "missing ad account id; set {} or meta.ad_account_id",
                    meta.ad_account_id_env.as_deref().unwrap_or("META_AD_ACCOUNT_ID")
                ))
            })?;
        log::info!(
            "Marketing API session for app {} on account {}",
            session.app_id(),
            normalize_account_id(account_id)
        );
        Ok(Self::with_base_url(
            session,
            account_id,
            &meta.base_url,
            &meta.api_version,
        ))
    }

    fn edge_url(&self, edge: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, self.api_version, self.account_id, edge
        )
    }

    fn form_fields(&self, params: AdParams) -> Result<Vec<(String, String)>, AgentError> {
        let mut fields: Vec<(String, String)> = params
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let encoded = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, encoded)
            })
            .collect();
        fields.push(("access_token".to_string(), self.session.access_token.clone()));
        fields.push(("appsecret_proof".to_string(), self.session.appsecret_proof()?));
        Ok(fields)
    }

    async fn post_edge(&self, edge: &str, params: AdParams) -> Result<Value, AgentError> {
        let url = self.edge_url(edge);
        log::info!("Marketing API POST {}", url);
        log::debug!("Marketing API params for {}: {:?}", edge, params);

        let fields = self.form_fields(params)?;
        let response = self
            .client
            .post(&url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| transport_error(&format!("request to {}", edge), e))?;

        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, AgentError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("reading the response body", e))?;
        Self::parse_response(status, &body)
    }

    fn parse_response(status: StatusCode, body: &str) -> Result<Value, AgentError> {
        if status.is_success() {
            return serde_json::from_str(body).map_err(|e| {
                AgentError::ParsingError(format!("Marketing API returned invalid JSON: {}", e))
            });
        }

        match serde_json::from_str::<GraphErrorEnvelope>(body) {
            Ok(envelope) => Err(Self::classify_error(status, envelope.error)),
            Err(_) => Err(AgentError::AdsApiError {
                status: status.as_u16(),
                code: None,
                message: body.to_string(),
            }),
        }
    }

    fn classify_error(status: StatusCode, error: GraphErrorBody) -> AgentError {
        let message = format!(
            "{}{}{}",
            error.message,
            error
                .error_subcode
                .map(|s| format!(" (subcode {})", s))
                .unwrap_or_default(),
            error
                .fbtrace_id
                .map(|t| format!(" [fbtrace_id {}]", t))
                .unwrap_or_default()
        );
        log::error!(
            "Marketing API error {:?} ({:?}): {}",
            error.code,
            error.error_type,
            message
        );

        // 102/190: session and token problems, 10 and 200-299: permissions.
        let auth_code = matches!(error.code, Some(102 | 190 | 10 | 200..=299));
        if auth_code || status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            AgentError::AdsAuthentication(message)
        } else {
            AgentError::AdsApiError {
                status: status.as_u16(),
                code: error.code,
                message,
            }
        }
    }

    fn object_from(value: &Value, edge: &str) -> Result<AdObject, AgentError> {
        value
            .get("id")
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|id| AdObject { id })
            .ok_or_else(|| {
                AgentError::ParsingError(format!("{} response carried no id: {}", edge, value))
            })
    }

    fn image_from(value: &Value) -> Result<AdImage, AgentError> {
        value
            .get("images")
            .and_then(Value::as_object)
            .and_then(|images| images.values().next())
            .and_then(|image| serde_json::from_value::<AdImage>(image.clone()).ok())
            .ok_or_else(|| {
                AgentError::ParsingError(format!("adimages response carried no hash: {}", value))
            })
    }
}

#[async_trait]
impl AdAccount for GraphApiAccount {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn create_campaign(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let value = self.post_edge("campaigns", params).await?;
        Self::object_from(&value, "campaigns")
    }

    async fn create_ad_set(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let value = self.post_edge("adsets", params).await?;
        Self::object_from(&value, "adsets")
    }

    async fn create_ad_image(&self, image_path: &Path) -> Result<AdImage, AgentError> {
        let bytes = tokio::fs::read(image_path).await.map_err(|e| {
            AgentError::IoError(format!("cannot read image {}: {}", image_path.display(), e))
        })?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ad_image.png".to_string());

        let url = self.edge_url("adimages");
        log::info!("Marketing API upload {} to {}", file_name, url);

        let form = Form::new()
            .text("access_token", self.session.access_token.clone())
            .text("appsecret_proof", self.session.appsecret_proof()?)
            .part("filename", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error("image upload", e))?;

        let value = Self::read_response(response).await?;
        Self::image_from(&value)
    }

    async fn create_ad_creative(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let value = self.post_edge("adcreatives", params).await?;
        Self::object_from(&value, "adcreatives")
    }

    async fn create_ad(&self, params: AdParams) -> Result<AdObject, AgentError> {
        let value = self.post_edge("ads", params).await?;
        Self::object_from(&value, "ads")
    }
}
