use super::{
    CouponParams, CouponUpdateParams, ListParams, PromotionCodeParams, PromotionCodeUpdateParams,
    StripeBackend,
};
use crate::error::{CouponError, Result};
use crate::model::{
    AppliesTo, Coupon, CurrencyOption, DeletedObject, PromotionCode, Restrictions, StripeList,
};
use std::collections::BTreeSet;

/// Stripe's default page size when `limit` is omitted.
const DEFAULT_LIMIT: usize = 10;
const CREATED_AT: i64 = 1_700_000_000;

/// In-process backend with Stripe-like semantics, for tests.
#[derive(Debug, Default)]
pub struct InMemoryStripe {
    coupons: Vec<Coupon>,
    promotion_codes: Vec<PromotionCode>,
    next_id: u64,
    promotion_code_creates: usize,
    failing_creates: BTreeSet<usize>,
    fail_lists: bool,
}

impl InMemoryStripe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coupon(mut self, coupon: Coupon) -> Self {
        self.coupons.push(coupon);
        self
    }

    /// Make the given promotion-code create calls (1-based) fail with an API error.
    pub fn fail_promotion_code_creates(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_creates.extend(calls);
        self
    }

    /// Make every list call fail, as an unreachable or unauthorized API would.
    pub fn fail_list_calls(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn promotion_code_create_calls(&self) -> usize {
        self.promotion_code_creates
    }

    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }

    pub fn promotion_codes(&self) -> &[PromotionCode] {
        &self.promotion_codes
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{:06}", prefix, self.next_id)
    }

    fn coupon(&self, id: &str) -> Result<&Coupon> {
        self.coupons
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| missing("coupon", id))
    }

    fn coupon_mut(&mut self, id: &str) -> Result<&mut Coupon> {
        self.coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| missing("coupon", id))
    }

    fn promotion_code_mut(&mut self, id: &str) -> Result<&mut PromotionCode> {
        self.promotion_codes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("promotion_code", id))
    }
}

impl StripeBackend for InMemoryStripe {
    fn list_coupons(&self, params: &ListParams) -> Result<StripeList<Coupon>> {
        if self.fail_lists {
            return Err(unauthorized());
        }
        Ok(paginate(&self.coupons, params, |c| c.id.as_str()))
    }

    fn get_coupon(&self, id: &str) -> Result<Coupon> {
        self.coupon(id).cloned()
    }

    fn create_coupon(&mut self, params: &CouponParams) -> Result<Coupon> {
        let id = match &params.id {
            Some(id) if self.coupons.iter().any(|c| &c.id == id) => {
                return Err(invalid_request(
                    "Coupon already exists.",
                    Some("resource_already_exists"),
                ))
            }
            Some(id) => id.clone(),
            None => self.next_id("coupon"),
        };

        let coupon = Coupon {
            id,
            name: params.name.clone(),
            percent_off: params.percent_off,
            amount_off: params.amount_off,
            currency: params.currency.clone(),
            duration: params.duration,
            duration_in_months: params.duration_in_months,
            max_redemptions: params.max_redemptions,
            times_redeemed: 0,
            redeem_by: params.redeem_by,
            valid: true,
            created: CREATED_AT,
            livemode: false,
            metadata: params.metadata.clone(),
            applies_to: (!params.applies_to_products.is_empty()).then(|| AppliesTo {
                products: params.applies_to_products.clone(),
            }),
            currency_options: (!params.currency_options.is_empty()).then(|| {
                params
                    .currency_options
                    .iter()
                    .map(|(cur, amount)| {
                        (
                            cur.clone(),
                            CurrencyOption {
                                amount_off: *amount,
                            },
                        )
                    })
                    .collect()
            }),
        };

        self.coupons.push(coupon.clone());
        Ok(coupon)
    }

    fn update_coupon(&mut self, id: &str, params: &CouponUpdateParams) -> Result<Coupon> {
        let coupon = self.coupon_mut(id)?;
        if let Some(name) = &params.name {
            coupon.name = Some(name.clone());
        }
        merge_metadata(&mut coupon.metadata, &params.metadata);
        let updated = coupon.clone();

        // Promotion codes embed their coupon.
        for promo in self.promotion_codes.iter_mut().filter(|p| p.coupon.id == id) {
            promo.coupon = updated.clone();
        }
        Ok(updated)
    }

    fn delete_coupon(&mut self, id: &str) -> Result<DeletedObject> {
        self.coupon(id)?;
        self.coupons.retain(|c| c.id != id);
        Ok(DeletedObject {
            id: id.to_string(),
            deleted: true,
        })
    }

    fn list_promotion_codes(&self, params: &ListParams) -> Result<StripeList<PromotionCode>> {
        if self.fail_lists {
            return Err(unauthorized());
        }
        let matching: Vec<PromotionCode> = self
            .promotion_codes
            .iter()
            .filter(|p| params.coupon.as_deref().map_or(true, |c| p.coupon.id == c))
            .cloned()
            .collect();
        Ok(paginate(&matching, params, |p| p.id.as_str()))
    }

    fn get_promotion_code(&self, id: &str) -> Result<PromotionCode> {
        self.promotion_codes
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| missing("promotion_code", id))
    }

    fn create_promotion_code(&mut self, params: &PromotionCodeParams) -> Result<PromotionCode> {
        self.promotion_code_creates += 1;
        if self.failing_creates.contains(&self.promotion_code_creates) {
            return Err(CouponError::Stripe {
                status: 500,
                error_type: "api_error".to_string(),
                message: "An unknown error occurred".to_string(),
                code: None,
            });
        }

        let coupon = self.coupon(&params.coupon)?.clone();
        let active = params.active.unwrap_or(true);

        let code = match &params.code {
            Some(code) => code.clone(),
            None => self.next_id("CODE").replace('_', ""),
        };
        let taken = self
            .promotion_codes
            .iter()
            .any(|p| p.active && p.code.eq_ignore_ascii_case(&code));
        if active && taken {
            return Err(invalid_request(
                &format!("An active promotion code with `code: {}` already exists.", code),
                Some("resource_already_exists"),
            ));
        }

        let restrictions = params
            .restrictions
            .as_ref()
            .map(|r| Restrictions {
                first_time_transaction: r.first_time_transaction.unwrap_or(false),
                minimum_amount: r.minimum_amount,
                minimum_amount_currency: r.minimum_amount_currency.clone(),
            })
            .unwrap_or_default();

        let promo = PromotionCode {
            id: self.next_id("promo"),
            code,
            coupon,
            active,
            customer: params.customer.clone(),
            max_redemptions: params.max_redemptions,
            times_redeemed: 0,
            expires_at: params.expires_at,
            created: CREATED_AT,
            livemode: false,
            restrictions,
            metadata: params.metadata.clone(),
        };

        self.promotion_codes.push(promo.clone());
        Ok(promo)
    }

    fn update_promotion_code(
        &mut self,
        id: &str,
        params: &PromotionCodeUpdateParams,
    ) -> Result<PromotionCode> {
        let promo = self.promotion_code_mut(id)?;
        if let Some(active) = params.active {
            promo.active = active;
        }
        merge_metadata(&mut promo.metadata, &params.metadata);
        Ok(promo.clone())
    }
}

fn paginate<T: Clone>(items: &[T], params: &ListParams, id: impl Fn(&T) -> &str) -> StripeList<T> {
    let start = params
        .starting_after
        .as_deref()
        .and_then(|cursor| items.iter().position(|item| id(item) == cursor))
        .map_or(0, |pos| pos + 1);
    let limit = params.limit.map_or(DEFAULT_LIMIT, |l| l as usize);
    let end = (start + limit).min(items.len());

    StripeList {
        data: items[start.min(end)..end].to_vec(),
        has_more: end < items.len(),
    }
}

/// Stripe unsets a metadata key when it is sent with an empty value.
fn merge_metadata(target: &mut crate::model::Metadata, updates: &crate::model::Metadata) {
    for (key, value) in updates {
        if value.is_empty() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn missing(kind: &str, id: &str) -> CouponError {
    CouponError::Stripe {
        status: 404,
        error_type: "invalid_request_error".to_string(),
        message: format!("No such {}: '{}'", kind, id),
        code: Some("resource_missing".to_string()),
    }
}

fn invalid_request(message: &str, code: Option<&str>) -> CouponError {
    CouponError::Stripe {
        status: 400,
        error_type: "invalid_request_error".to_string(),
        message: message.to_string(),
        code: code.map(str::to_string),
    }
}

fn unauthorized() -> CouponError {
    CouponError::Stripe {
        status: 401,
        error_type: "invalid_request_error".to_string(),
        message: "Invalid API Key provided".to_string(),
        code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::percent_coupon;

    fn promo_params(coupon: &str, code: &str) -> PromotionCodeParams {
        PromotionCodeParams {
            coupon: coupon.to_string(),
            code: Some(code.to_string()),
            ..PromotionCodeParams::default()
        }
    }

    #[test]
    fn rejects_duplicate_active_codes() {
        let mut stripe = InMemoryStripe::new().with_coupon(percent_coupon("SUMMER", 10.0));
        stripe.create_promotion_code(&promo_params("SUMMER", "SAVE10")).unwrap();

        let err = stripe
            .create_promotion_code(&promo_params("SUMMER", "save10"))
            .unwrap_err();
        assert!(matches!(err, CouponError::Stripe { status: 400, .. }));
        assert_eq!(stripe.promotion_codes().len(), 1);
    }

    #[test]
    fn injected_failures_count_calls() {
        let mut stripe = InMemoryStripe::new()
            .with_coupon(percent_coupon("SUMMER", 10.0))
            .fail_promotion_code_creates([2]);

        assert!(stripe.create_promotion_code(&promo_params("SUMMER", "A")).is_ok());
        assert!(stripe.create_promotion_code(&promo_params("SUMMER", "B")).is_err());
        assert!(stripe.create_promotion_code(&promo_params("SUMMER", "C")).is_ok());
        assert_eq!(stripe.promotion_code_create_calls(), 3);
    }

    #[test]
    fn paginates_with_cursor() {
        let mut stripe = InMemoryStripe::new();
        for i in 0..3 {
            stripe = stripe.with_coupon(percent_coupon(&format!("C{}", i), 5.0));
        }

        let first = stripe
            .list_coupons(&ListParams {
                limit: Some(2),
                ..ListParams::default()
            })
            .unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.has_more);

        let second = stripe
            .list_coupons(&ListParams {
                limit: Some(2),
                starting_after: Some("C1".into()),
                ..ListParams::default()
            })
            .unwrap();
        assert_eq!(second.data.len(), 1);
        assert!(!second.has_more);
    }

    #[test]
    fn unknown_coupon_is_resource_missing() {
        let stripe = InMemoryStripe::new();
        let err = stripe.get_coupon("nope").unwrap_err();
        assert!(
            matches!(err, CouponError::Stripe { status: 404, code: Some(ref c), .. } if c == "resource_missing")
        );
    }
}
