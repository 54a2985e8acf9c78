//! Blocking Stripe REST client.

use super::{
    CouponParams, CouponUpdateParams, FormPairs, ListParams, PromotionCodeParams,
    PromotionCodeUpdateParams, StripeBackend,
};
use crate::config::ConfigStore;
use crate::error::{CouponError, Result};
use crate::model::{Coupon, DeletedObject, PromotionCode, StripeList};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Stripe API client bound to one environment's key.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    environment: String,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// API version pinned on every request so payload shapes stay stable.
    pub const API_VERSION: &'static str = "2025-03-31.basil";

    pub fn new(api_key: impl Into<String>, environment: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = Url::parse(Self::BASE_URL)
            .map_err(|e| CouponError::validation(format!("invalid base url: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
            environment: environment.into(),
        })
    }

    /// Build a client for `environment` (or the current one). Fails when the
    /// environment has no key configured.
    pub fn initialize(store: &ConfigStore, environment: Option<&str>) -> Result<Self> {
        let (name, env) = store.resolve(environment)?;
        if !env.has_api_key() {
            return Err(CouponError::MissingApiKey(name));
        }

        tracing::debug!(environment = %name, key = %env.masked_api_key(), "initializing stripe client");
        Self::new(env.stripe_api_key.clone(), name)
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| CouponError::validation(format!("invalid base url: {}", e)))?;
        Ok(self)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn test_connection(&self) -> Result<()> {
        super::test_connection(self)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CouponError::validation("base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Stripe-Version", Self::API_VERSION)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &FormPairs) -> Result<T> {
        let url = self.url(segments)?;
        tracing::debug!(method = "GET", %url, "stripe request");

        let response = self
            .authorized(self.client.get(url))
            .query(query)
            .send()?;
        Self::handle_response(response)
    }

    /// POST a form body. Creates carry a fresh `Idempotency-Key` so a retried
    /// request cannot create the object twice.
    fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: &FormPairs,
        idempotent: bool,
    ) -> Result<T> {
        let url = self.url(segments)?;
        tracing::debug!(method = "POST", %url, fields = form.len(), "stripe request");

        let mut request = self.authorized(self.client.post(url)).form(form);
        if idempotent {
            request = request.header("Idempotency-Key", Uuid::new_v4().to_string());
        }
        Self::handle_response(request.send()?)
    }

    fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        tracing::debug!(method = "DELETE", %url, "stripe request");

        let response = self.authorized(self.client.delete(url)).send()?;
        Self::handle_response(response)
    }

    fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json()?);
        }

        let body = response.text().unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "stripe returned an error");
        Err(stripe_error(status, &body))
    }
}

/// Map a non-2xx response body to `CouponError::Stripe`. Bodies that are not
/// Stripe's `{"error": {...}}` shape become an `unknown` error.
fn stripe_error(status: StatusCode, body: &str) -> CouponError {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(parsed) => CouponError::Stripe {
            status: status.as_u16(),
            error_type: parsed.error.error_type,
            message: parsed.error.message,
            code: parsed.error.code,
        },
        Err(_) => CouponError::Stripe {
            status: status.as_u16(),
            error_type: "unknown".to_string(),
            message: format!("HTTP {}", status),
            code: None,
        },
    }
}

impl StripeBackend for StripeClient {
    fn list_coupons(&self, params: &ListParams) -> Result<StripeList<Coupon>> {
        self.get(&["coupons"], &params.form())
    }

    fn get_coupon(&self, id: &str) -> Result<Coupon> {
        self.get(&["coupons", id], &FormPairs::new())
    }

    fn create_coupon(&mut self, params: &CouponParams) -> Result<Coupon> {
        self.post(&["coupons"], &params.form(), true)
    }

    fn update_coupon(&mut self, id: &str, params: &CouponUpdateParams) -> Result<Coupon> {
        self.post(&["coupons", id], &params.form(), false)
    }

    fn delete_coupon(&mut self, id: &str) -> Result<DeletedObject> {
        self.delete(&["coupons", id])
    }

    fn list_promotion_codes(&self, params: &ListParams) -> Result<StripeList<PromotionCode>> {
        // The coupon comes embedded in each code, no expansion needed.
        self.get(&["promotion_codes"], &params.form())
    }

    fn get_promotion_code(&self, id: &str) -> Result<PromotionCode> {
        self.get(&["promotion_codes", id], &FormPairs::new())
    }

    fn create_promotion_code(&mut self, params: &PromotionCodeParams) -> Result<PromotionCode> {
        self.post(&["promotion_codes"], &params.form(), true)
    }

    fn update_promotion_code(
        &mut self,
        id: &str,
        params: &PromotionCodeUpdateParams,
    ) -> Result<PromotionCode> {
        self.post(&["promotion_codes", id], &params.form(), false)
    }
}
