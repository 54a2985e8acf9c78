use crate::codegen::CodeGenerator;
use crate::commands::{require_id, require_positive, CmdMessage, CmdResult};
use crate::config::validate_currency;
use crate::error::{CouponError, Result};
use crate::model::{Metadata, PromotionCode};
use crate::stripe::{
    collect_pages, ListParams, PromotionCodeParams, PromotionCodeUpdateParams, RestrictionParams,
    StripeBackend,
};

pub const MAX_BATCH_SIZE: i64 = 1000;
const REPORTED_FAILURES: usize = 5;

/// Restrictions and limits shared by single and batch creation.
#[derive(Debug, Clone, Default)]
pub struct PromotionRules {
    pub customer: Option<String>,
    pub max_redemptions: Option<i64>,
    pub expires_at: Option<i64>,
    pub first_time_transaction: bool,
    pub minimum_amount: Option<i64>,
    pub minimum_amount_currency: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct PromotionCodeCreate {
    pub coupon_id: String,
    /// Explicit code; Stripe generates one when both this and `prefix` are unset.
    pub code: Option<String>,
    /// Generate `PREFIX_XXXXXXXX` locally.
    pub prefix: Option<String>,
    pub active: Option<bool>,
    pub rules: PromotionRules,
}

#[derive(Debug, Clone, Default)]
pub struct BatchCreate {
    pub coupon_id: String,
    pub count: i64,
    pub prefix: Option<String>,
    pub rules: PromotionRules,
}

#[derive(Debug, Clone, Default)]
pub struct PromotionCodeUpdate {
    pub active: Option<bool>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub code: String,
    pub error: String,
}

/// What a batch produced. Failed codes are kept alongside the created ones.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub requested: usize,
    pub codes: Vec<PromotionCode>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn created(&self) -> usize {
        self.codes.len()
    }

    /// `PartialBatchFailure` summarizing the failed items, if there were any.
    pub fn partial_failure(&self) -> Option<CouponError> {
        if self.failures.is_empty() {
            return None;
        }
        Some(self.summary_error())
    }

    fn summary_error(&self) -> CouponError {
        let mut summary = format!(
            "created {}/{} codes successfully",
            self.created(),
            self.requested
        );
        for failure in self.failures.iter().take(REPORTED_FAILURES) {
            summary.push_str(&format!(
                "\n  failed to create code {}: {}",
                failure.code, failure.error
            ));
        }
        if self.failures.len() > REPORTED_FAILURES {
            summary.push_str(&format!(
                "\n  ... and {} more errors",
                self.failures.len() - REPORTED_FAILURES
            ));
        }

        CouponError::PartialBatchFailure {
            created: self.created(),
            requested: self.requested,
            summary,
        }
    }
}

fn build_params(coupon_id: &str, rules: &PromotionRules) -> Result<PromotionCodeParams> {
    let coupon = require_id(coupon_id, "coupon")?;
    require_positive(rules.max_redemptions, "max_redemptions")?;
    require_positive(rules.expires_at, "expires_at")?;
    require_positive(rules.minimum_amount, "minimum_amount")?;

    let minimum_amount_currency = match rules.minimum_amount {
        Some(_) => {
            let currency = rules
                .minimum_amount_currency
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    CouponError::validation("a currency is required with minimum_amount")
                })?;
            Some(validate_currency(currency)?)
        }
        None => None,
    };

    let restrictions = (rules.first_time_transaction || rules.minimum_amount.is_some()).then(|| {
        RestrictionParams {
            first_time_transaction: rules.first_time_transaction.then_some(true),
            minimum_amount: rules.minimum_amount,
            minimum_amount_currency,
        }
    });

    Ok(PromotionCodeParams {
        coupon: coupon.to_string(),
        code: None,
        active: None,
        customer: rules
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        max_redemptions: rules.max_redemptions,
        expires_at: rules.expires_at,
        metadata: rules.metadata.clone(),
        restrictions,
    })
}

pub fn list<S: StripeBackend>(backend: &S, coupon_id: Option<&str>) -> Result<CmdResult> {
    let coupon = coupon_id.map(str::trim).filter(|c| !c.is_empty());
    let base = ListParams {
        coupon: coupon.map(str::to_string),
        ..ListParams::default()
    };
    let codes = collect_pages(base, |params| backend.list_promotion_codes(params))?;

    let mut result = CmdResult::default();
    if codes.is_empty() {
        let message = match coupon {
            Some(c) => format!("No promotion codes found for coupon: {}", c),
            None => "No promotion codes found.".to_string(),
        };
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_promotion_codes(codes))
}

pub fn get<S: StripeBackend>(backend: &S, id: &str) -> Result<CmdResult> {
    let id = require_id(id, "promotion code")?;
    let code = backend.get_promotion_code(id)?;
    Ok(CmdResult::default().with_promotion_codes(vec![code]))
}

pub fn create<S: StripeBackend>(
    backend: &mut S,
    opts: &PromotionCodeCreate,
    generator: &mut CodeGenerator,
) -> Result<CmdResult> {
    let explicit = opts.code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let prefix = opts.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if explicit.is_some() && prefix.is_some() {
        return Err(CouponError::validation(
            "cannot specify both a code and a prefix",
        ));
    }

    let mut params = build_params(&opts.coupon_id, &opts.rules)?;
    params.active = opts.active;
    params.code = match (explicit, prefix) {
        (Some(code), _) => Some(code.to_string()),
        (None, Some(prefix)) => Some(generator.single_code(prefix)),
        (None, None) => None,
    };

    let code = backend.create_promotion_code(&params)?;
    tracing::info!(id = %code.id, code = %code.code, "promotion code created");

    let message = CmdMessage::success(format!(
        "Promotion code created successfully: {} ({})",
        code.code, code.id
    ));
    Ok(CmdResult::default()
        .with_message(message)
        .with_promotion_codes(vec![code]))
}

/// Create `count` codes one call at a time. Individual failures are collected
/// in the outcome; only a batch where nothing succeeded is an `Err`.
pub fn batch_create<S: StripeBackend>(
    backend: &mut S,
    opts: &BatchCreate,
    generator: &mut CodeGenerator,
) -> Result<BatchOutcome> {
    if opts.count <= 0 || opts.count > MAX_BATCH_SIZE {
        return Err(CouponError::validation(format!(
            "count must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }
    let template = build_params(&opts.coupon_id, &opts.rules)?;
    let requested = opts.count as usize;

    let mut outcome = BatchOutcome {
        requested,
        codes: Vec::with_capacity(requested),
        failures: Vec::new(),
    };

    for index in 1..=requested {
        let code = generator.batch_code(opts.prefix.as_deref(), index);
        let params = PromotionCodeParams {
            code: Some(code.clone()),
            ..template.clone()
        };

        match backend.create_promotion_code(&params) {
            Ok(created) => outcome.codes.push(created),
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "failed to create promotion code");
                outcome.failures.push(BatchFailure {
                    code,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        created = outcome.created(),
        requested,
        coupon = %template.coupon,
        "batch finished"
    );

    if outcome.codes.is_empty() {
        return Err(outcome.summary_error());
    }
    Ok(outcome)
}

pub fn update<S: StripeBackend>(
    backend: &mut S,
    id: &str,
    opts: &PromotionCodeUpdate,
) -> Result<CmdResult> {
    let id = require_id(id, "promotion code")?;
    let params = PromotionCodeUpdateParams {
        active: opts.active,
        metadata: opts.metadata.clone(),
    };

    if params.is_empty() {
        return Ok(CmdResult::default().with_message(CmdMessage::info("Nothing to update.")));
    }

    let code = backend.update_promotion_code(id, &params)?;
    let message = CmdMessage::success(format!(
        "Promotion code updated successfully: {} ({})",
        code.code, code.id
    ));
    Ok(CmdResult::default()
        .with_message(message)
        .with_promotion_codes(vec![code]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::percent_coupon;
    use crate::stripe::memory::InMemoryStripe;

    fn stripe() -> InMemoryStripe {
        InMemoryStripe::new().with_coupon(percent_coupon("SUMMER", 20.0))
    }

    fn batch(count: i64) -> BatchCreate {
        BatchCreate {
            coupon_id: "SUMMER".into(),
            count,
            prefix: Some("summer".into()),
            rules: PromotionRules::default(),
        }
    }

    #[test]
    fn batch_count_bounds_issue_no_calls() {
        for count in [0, -3, 1001] {
            let mut stripe = stripe();
            let err = batch_create(&mut stripe, &batch(count), &mut CodeGenerator::seeded(1))
                .unwrap_err();
            assert!(matches!(err, CouponError::Validation(_)));
            assert_eq!(stripe.promotion_code_create_calls(), 0);
        }
    }

    #[test]
    fn batch_requires_coupon() {
        let mut stripe = stripe();
        let opts = BatchCreate {
            coupon_id: " ".into(),
            ..batch(3)
        };
        let err = batch_create(&mut stripe, &opts, &mut CodeGenerator::seeded(1)).unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));
        assert_eq!(stripe.promotion_code_create_calls(), 0);
    }

    #[test]
    fn batch_accumulates_failures() {
        let mut stripe = stripe().fail_promotion_code_creates([2, 5, 9]);
        let outcome = batch_create(&mut stripe, &batch(10), &mut CodeGenerator::seeded(3)).unwrap();

        assert_eq!(stripe.promotion_code_create_calls(), 10);
        assert_eq!(outcome.codes.len(), 7);
        assert_eq!(outcome.failures.len(), 3);
        assert!(outcome.failures[0].code.starts_with("SUMMER2_"));

        let err = outcome.partial_failure().unwrap();
        let message = err.to_string();
        assert!(message.starts_with("created 7/10 codes successfully"));
        assert_eq!(message.matches("failed to create code").count(), 3);
        assert!(!message.contains("more errors"));
        assert!(matches!(
            err,
            CouponError::PartialBatchFailure {
                created: 7,
                requested: 10,
                ..
            }
        ));
    }

    #[test]
    fn batch_reports_first_five_failures() {
        let mut stripe = stripe().fail_promotion_code_creates(1..=8);
        let outcome = batch_create(&mut stripe, &batch(10), &mut CodeGenerator::seeded(5)).unwrap();
        let message = outcome.partial_failure().unwrap().to_string();

        assert!(message.starts_with("created 2/10 codes successfully"));
        assert_eq!(message.matches("failed to create code").count(), 5);
        assert!(message.ends_with("... and 3 more errors"));
    }

    #[test]
    fn batch_fails_when_nothing_created() {
        let mut stripe = stripe().fail_promotion_code_creates(1..=4);
        let err = batch_create(&mut stripe, &batch(4), &mut CodeGenerator::seeded(5)).unwrap_err();
        assert!(err.to_string().starts_with("created 0/4 codes successfully"));
    }

    #[test]
    fn clean_batch_has_no_partial_failure() {
        let mut stripe = stripe();
        let outcome = batch_create(&mut stripe, &batch(5), &mut CodeGenerator::seeded(8)).unwrap();
        assert_eq!(outcome.created(), 5);
        assert!(outcome.partial_failure().is_none());
        assert!(outcome
            .codes
            .iter()
            .enumerate()
            .all(|(i, c)| c.code.starts_with(&format!("SUMMER{}_", i + 1))));
    }

    #[test]
    fn create_with_prefix_generates_code() {
        let mut stripe = stripe();
        let opts = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            prefix: Some("vip".into()),
            ..PromotionCodeCreate::default()
        };
        let result = create(&mut stripe, &opts, &mut CodeGenerator::seeded(2)).unwrap();
        let code = &result.promotion_codes[0].code;
        assert!(code.starts_with("VIP_"));
        assert_eq!(code.len(), "VIP_".len() + 8);
    }

    #[test]
    fn create_rejects_code_and_prefix() {
        let opts = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            code: Some("SAVE".into()),
            prefix: Some("VIP".into()),
            ..PromotionCodeCreate::default()
        };
        let err = create(&mut stripe(), &opts, &mut CodeGenerator::seeded(2)).unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));
    }

    #[test]
    fn restrictions_only_when_requested() {
        let mut stripe = stripe();
        let plain = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            code: Some("PLAIN".into()),
            ..PromotionCodeCreate::default()
        };
        let result = create(&mut stripe, &plain, &mut CodeGenerator::seeded(2)).unwrap();
        assert!(result.promotion_codes[0].restrictions.is_empty());

        let restricted = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            code: Some("FIRST".into()),
            rules: PromotionRules {
                first_time_transaction: true,
                minimum_amount: Some(5000),
                minimum_amount_currency: Some("USD".into()),
                ..PromotionRules::default()
            },
            ..PromotionCodeCreate::default()
        };
        let result = create(&mut stripe, &restricted, &mut CodeGenerator::seeded(2)).unwrap();
        let restrictions = &result.promotion_codes[0].restrictions;
        assert!(restrictions.first_time_transaction);
        assert_eq!(restrictions.minimum_amount, Some(5000));
        assert_eq!(restrictions.minimum_amount_currency.as_deref(), Some("usd"));
    }

    #[test]
    fn minimum_amount_needs_currency() {
        let opts = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            rules: PromotionRules {
                minimum_amount: Some(5000),
                ..PromotionRules::default()
            },
            ..PromotionCodeCreate::default()
        };
        let mut stripe = stripe();
        let err = create(&mut stripe, &opts, &mut CodeGenerator::seeded(2)).unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));
        assert_eq!(stripe.promotion_code_create_calls(), 0);
    }

    #[test]
    fn list_filters_by_coupon() {
        let mut stripe = stripe().with_coupon(percent_coupon("WINTER", 5.0));
        let mut gen = CodeGenerator::seeded(4);
        batch_create(&mut stripe, &batch(3), &mut gen).unwrap();
        let winter = BatchCreate {
            coupon_id: "WINTER".into(),
            prefix: Some("winter".into()),
            ..batch(2)
        };
        batch_create(&mut stripe, &winter, &mut gen).unwrap();

        assert_eq!(list(&stripe, None).unwrap().promotion_codes.len(), 5);
        assert_eq!(list(&stripe, Some("WINTER")).unwrap().promotion_codes.len(), 2);

        let empty = list(&stripe, Some("NONE")).unwrap();
        assert_eq!(
            empty.messages[0].content,
            "No promotion codes found for coupon: NONE"
        );
    }

    #[test]
    fn update_toggles_active() {
        let mut stripe = stripe();
        let opts = PromotionCodeCreate {
            coupon_id: "SUMMER".into(),
            code: Some("TOGGLE".into()),
            ..PromotionCodeCreate::default()
        };
        let created = create(&mut stripe, &opts, &mut CodeGenerator::seeded(2)).unwrap();
        let id = created.promotion_codes[0].id.clone();

        let update_opts = PromotionCodeUpdate {
            active: Some(false),
            ..PromotionCodeUpdate::default()
        };
        let result = update(&mut stripe, &id, &update_opts).unwrap();
        assert!(!result.promotion_codes[0].active);
        assert!(!get(&stripe, &id).unwrap().promotion_codes[0].active);
    }
}
