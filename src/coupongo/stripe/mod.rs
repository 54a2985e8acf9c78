//! # Stripe Backend
//!
//! Every remote operation goes through the [`StripeBackend`] trait, the same way
//! every pad operation in a storage-backed app goes through its store trait:
//!
//! - [`http::StripeClient`]: production client, one instance per invocation,
//!   bound to a single environment's API key.
//! - [`memory::InMemoryStripe`]: in-process stand-in used by tests. It mimics
//!   the Stripe behaviours the command layer relies on (id assignment,
//!   duplicate-code rejection, pagination) and can be told to fail specific
//!   create calls.
//!
//! Request parameters are typed structs ([`CouponParams`], [`PromotionCodeParams`], …).
//! The HTTP client flattens them into Stripe's bracketed form encoding via
//! their `form()` methods, the in-memory backend reads the fields directly.

use crate::error::{CouponError, Result};
use crate::model::{
    Coupon, CouponDuration, DeletedObject, Metadata, PromotionCode, StripeList,
};
use std::collections::BTreeMap;

pub mod http;
pub mod memory;

/// Page size used when walking list endpoints.
pub const PAGE_SIZE: u32 = 100;

pub type FormPairs = Vec<(String, String)>;

pub trait StripeBackend {
    fn list_coupons(&self, params: &ListParams) -> Result<StripeList<Coupon>>;

    fn get_coupon(&self, id: &str) -> Result<Coupon>;

    fn create_coupon(&mut self, params: &CouponParams) -> Result<Coupon>;

    fn update_coupon(&mut self, id: &str, params: &CouponUpdateParams) -> Result<Coupon>;

    fn delete_coupon(&mut self, id: &str) -> Result<DeletedObject>;

    fn list_promotion_codes(&self, params: &ListParams) -> Result<StripeList<PromotionCode>>;

    fn get_promotion_code(&self, id: &str) -> Result<PromotionCode>;

    fn create_promotion_code(&mut self, params: &PromotionCodeParams) -> Result<PromotionCode>;

    fn update_promotion_code(
        &mut self,
        id: &str,
        params: &PromotionCodeUpdateParams,
    ) -> Result<PromotionCode>;
}

/// Objects that can be used as a pagination cursor.
pub trait StripeObject {
    fn object_id(&self) -> &str;
}

impl StripeObject for Coupon {
    fn object_id(&self) -> &str {
        &self.id
    }
}

impl StripeObject for PromotionCode {
    fn object_id(&self) -> &str {
        &self.id
    }
}

/// Probe credentials and connectivity with a single one-item list call.
pub fn test_connection<S: StripeBackend + ?Sized>(backend: &S) -> Result<()> {
    let params = ListParams {
        limit: Some(1),
        ..ListParams::default()
    };
    backend
        .list_coupons(&params)
        .map(|_| ())
        .map_err(|e| CouponError::ConnectionFailed(e.to_string()))
}

/// Follow `starting_after` cursors until Stripe reports no more pages.
pub fn collect_pages<T, F>(base: ListParams, mut fetch: F) -> Result<Vec<T>>
where
    T: StripeObject,
    F: FnMut(&ListParams) -> Result<StripeList<T>>,
{
    let mut params = ListParams {
        limit: base.limit.or(Some(PAGE_SIZE)),
        ..base
    };
    let mut items = Vec::new();

    loop {
        let page = fetch(&params)?;
        let cursor = page.data.last().map(|item| item.object_id().to_string());
        items.extend(page.data);

        match cursor {
            Some(last) if page.has_more => params.starting_after = Some(last),
            _ => break,
        }
    }

    Ok(items)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub starting_after: Option<String>,
    /// Promotion codes only: restrict to one coupon.
    pub coupon: Option<String>,
}

impl ListParams {
    pub fn form(&self) -> FormPairs {
        let mut pairs = FormPairs::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".into(), limit.to_string()));
        }
        if let Some(cursor) = &self.starting_after {
            pairs.push(("starting_after".into(), cursor.clone()));
        }
        if let Some(coupon) = &self.coupon {
            pairs.push(("coupon".into(), coupon.clone()));
        }
        pairs
    }
}

/// Validated body of `POST /v1/coupons`.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponParams {
    pub id: Option<String>,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<i64>,
    pub currency: Option<String>,
    pub duration: CouponDuration,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub redeem_by: Option<i64>,
    pub metadata: Metadata,
    pub applies_to_products: Vec<String>,
    /// currency → amount_off in that currency's minor units
    pub currency_options: BTreeMap<String, i64>,
}

impl CouponParams {
    pub fn form(&self) -> FormPairs {
        let mut pairs = FormPairs::new();
        push_opt(&mut pairs, "id", &self.id);
        push_opt(&mut pairs, "name", &self.name);
        push_opt(&mut pairs, "percent_off", &self.percent_off);
        push_opt(&mut pairs, "amount_off", &self.amount_off);
        push_opt(&mut pairs, "currency", &self.currency);
        pairs.push(("duration".into(), self.duration.to_string()));
        push_opt(&mut pairs, "duration_in_months", &self.duration_in_months);
        push_opt(&mut pairs, "max_redemptions", &self.max_redemptions);
        push_opt(&mut pairs, "redeem_by", &self.redeem_by);
        push_metadata(&mut pairs, &self.metadata);

        for (i, product) in self.applies_to_products.iter().enumerate() {
            pairs.push((format!("applies_to[products][{}]", i), product.clone()));
        }
        for (currency, amount) in &self.currency_options {
            pairs.push((
                format!("currency_options[{}][amount_off]", currency),
                amount.to_string(),
            ));
        }
        pairs
    }
}

/// Stripe only allows renaming a coupon and editing its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouponUpdateParams {
    pub name: Option<String>,
    pub metadata: Metadata,
}

impl CouponUpdateParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.metadata.is_empty()
    }

    pub fn form(&self) -> FormPairs {
        let mut pairs = FormPairs::new();
        push_opt(&mut pairs, "name", &self.name);
        push_metadata(&mut pairs, &self.metadata);
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestrictionParams {
    pub first_time_transaction: Option<bool>,
    pub minimum_amount: Option<i64>,
    pub minimum_amount_currency: Option<String>,
}

/// Validated body of `POST /v1/promotion_codes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionCodeParams {
    pub coupon: String,
    pub code: Option<String>,
    pub active: Option<bool>,
    pub customer: Option<String>,
    pub max_redemptions: Option<i64>,
    pub expires_at: Option<i64>,
    pub metadata: Metadata,
    pub restrictions: Option<RestrictionParams>,
}

impl PromotionCodeParams {
    pub fn form(&self) -> FormPairs {
        let mut pairs = FormPairs::new();
        pairs.push(("coupon".into(), self.coupon.clone()));
        push_opt(&mut pairs, "code", &self.code);
        push_opt(&mut pairs, "active", &self.active);
        push_opt(&mut pairs, "customer", &self.customer);
        push_opt(&mut pairs, "max_redemptions", &self.max_redemptions);
        push_opt(&mut pairs, "expires_at", &self.expires_at);
        push_metadata(&mut pairs, &self.metadata);

        if let Some(r) = &self.restrictions {
            push_opt(
                &mut pairs,
                "restrictions[first_time_transaction]",
                &r.first_time_transaction,
            );
            push_opt(&mut pairs, "restrictions[minimum_amount]", &r.minimum_amount);
            push_opt(
                &mut pairs,
                "restrictions[minimum_amount_currency]",
                &r.minimum_amount_currency,
            );
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionCodeUpdateParams {
    pub active: Option<bool>,
    pub metadata: Metadata,
}

impl PromotionCodeUpdateParams {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.metadata.is_empty()
    }

    pub fn form(&self) -> FormPairs {
        let mut pairs = FormPairs::new();
        push_opt(&mut pairs, "active", &self.active);
        push_metadata(&mut pairs, &self.metadata);
        pairs
    }
}

fn push_opt<T: ToString>(pairs: &mut FormPairs, key: &str, value: &Option<T>) {
    if let Some(v) = value {
        pairs.push((key.to_string(), v.to_string()));
    }
}

fn push_metadata(pairs: &mut FormPairs, metadata: &Metadata) {
    for (key, value) in metadata {
        pairs.push((format!("metadata[{}]", key), value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::percent_coupon;

    fn has(pairs: &FormPairs, key: &str, value: &str) -> bool {
        pairs.iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn coupon_form_uses_bracketed_keys() {
        let params = CouponParams {
            id: None,
            name: Some("Launch".into()),
            percent_off: None,
            amount_off: Some(1000),
            currency: Some("usd".into()),
            duration: CouponDuration::Repeating,
            duration_in_months: Some(3),
            max_redemptions: None,
            redeem_by: None,
            metadata: [("campaign".to_string(), "launch".to_string())].into(),
            applies_to_products: vec!["prod_A".into(), "prod_B".into()],
            currency_options: [("eur".to_string(), 950)].into(),
        };

        let form = params.form();
        assert!(has(&form, "amount_off", "1000"));
        assert!(has(&form, "duration", "repeating"));
        assert!(has(&form, "duration_in_months", "3"));
        assert!(has(&form, "metadata[campaign]", "launch"));
        assert!(has(&form, "applies_to[products][1]", "prod_B"));
        assert!(has(&form, "currency_options[eur][amount_off]", "950"));
        assert!(!form.iter().any(|(k, _)| k == "id" || k == "percent_off"));
    }

    #[test]
    fn promotion_form_includes_restrictions_only_when_set() {
        let mut params = PromotionCodeParams {
            coupon: "SUMMER".into(),
            code: Some("SAVE10".into()),
            active: Some(false),
            ..PromotionCodeParams::default()
        };
        let form = params.form();
        assert!(has(&form, "active", "false"));
        assert!(!form.iter().any(|(k, _)| k.starts_with("restrictions")));

        params.restrictions = Some(RestrictionParams {
            first_time_transaction: Some(true),
            minimum_amount: Some(2500),
            minimum_amount_currency: Some("usd".into()),
        });
        let form = params.form();
        assert!(has(&form, "restrictions[first_time_transaction]", "true"));
        assert!(has(&form, "restrictions[minimum_amount]", "2500"));
        assert!(has(&form, "restrictions[minimum_amount_currency]", "usd"));
    }

    #[test]
    fn collect_pages_follows_cursor() {
        let all: Vec<Coupon> = (0..5)
            .map(|i| percent_coupon(&format!("c{}", i), 10.0))
            .collect();
        let mut cursors = Vec::new();

        let items = collect_pages(
            ListParams {
                limit: Some(2),
                ..ListParams::default()
            },
            |params| {
                cursors.push(params.starting_after.clone());
                let start = match &params.starting_after {
                    Some(id) => all.iter().position(|c| &c.id == id).unwrap() + 1,
                    None => 0,
                };
                let end = (start + 2).min(all.len());
                Ok(StripeList {
                    data: all[start..end].to_vec(),
                    has_more: end < all.len(),
                })
            },
        )
        .unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(
            cursors,
            vec![None, Some("c1".to_string()), Some("c3".to_string())]
        );
    }

    #[test]
    fn connection_errors_are_wrapped() {
        let backend = memory::InMemoryStripe::new().fail_list_calls();
        let err = test_connection(&backend).unwrap_err();
        assert!(matches!(err, CouponError::ConnectionFailed(_)));

        assert!(test_connection(&memory::InMemoryStripe::new()).is_ok());
    }
}
