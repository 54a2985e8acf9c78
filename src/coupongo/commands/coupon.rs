use crate::commands::{require_id, require_positive, CmdMessage, CmdResult};
use crate::config::validate_currency;
use crate::error::{CouponError, Result};
use crate::model::{CouponDuration, Metadata};
use crate::stripe::{collect_pages, CouponParams, CouponUpdateParams, ListParams, StripeBackend};
use std::collections::BTreeMap;

/// Unvalidated coupon fields, as collected from flags or prompts.
#[derive(Debug, Clone, Default)]
pub struct CouponCreate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<i64>,
    pub currency: Option<String>,
    /// Defaults to `once`.
    pub duration: Option<String>,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub redeem_by: Option<i64>,
    pub applies_to: Vec<String>,
    pub currency_options: BTreeMap<String, i64>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct CouponUpdate {
    pub name: Option<String>,
    pub metadata: Metadata,
}

pub fn validate(opts: &CouponCreate) -> Result<CouponParams> {
    match (opts.percent_off, opts.amount_off) {
        (None, None) => {
            return Err(CouponError::validation(
                "either percent_off or amount_off must be specified",
            ))
        }
        (Some(_), Some(_)) => {
            return Err(CouponError::validation(
                "cannot specify both percent_off and amount_off",
            ))
        }
        (Some(percent), None) if !(percent > 0.0 && percent <= 100.0) => {
            return Err(CouponError::validation(
                "percent_off must be greater than 0 and at most 100",
            ))
        }
        _ => {}
    }

    require_positive(opts.amount_off, "amount_off")?;
    let currency = match (&opts.amount_off, non_blank(&opts.currency)) {
        (Some(_), None) => {
            return Err(CouponError::validation(
                "currency is required when using amount_off",
            ))
        }
        (_, Some(currency)) => Some(validate_currency(currency)?),
        (None, None) => None,
    };

    let duration = match non_blank(&opts.duration) {
        Some(d) => d.parse::<CouponDuration>()?,
        None => CouponDuration::Once,
    };
    require_positive(opts.duration_in_months, "duration_in_months")?;
    if duration == CouponDuration::Repeating && opts.duration_in_months.is_none() {
        return Err(CouponError::validation(
            "duration_in_months is required when duration is repeating",
        ));
    }
    let duration_in_months = match duration {
        CouponDuration::Repeating => opts.duration_in_months,
        _ => None,
    };

    require_positive(opts.max_redemptions, "max_redemptions")?;
    require_positive(opts.redeem_by, "redeem_by")?;

    if !opts.currency_options.is_empty() && opts.amount_off.is_none() {
        return Err(CouponError::validation(
            "currency_options can only be used with amount_off",
        ));
    }
    let mut currency_options = BTreeMap::new();
    for (cur, amount) in &opts.currency_options {
        require_positive(Some(*amount), &format!("currency_options[{}]", cur))?;
        currency_options.insert(validate_currency(cur)?, *amount);
    }

    Ok(CouponParams {
        id: non_blank(&opts.id).map(str::to_string),
        name: non_blank(&opts.name).map(str::to_string),
        percent_off: opts.percent_off,
        amount_off: opts.amount_off,
        currency,
        duration,
        duration_in_months,
        max_redemptions: opts.max_redemptions,
        redeem_by: opts.redeem_by,
        metadata: opts.metadata.clone(),
        applies_to_products: opts
            .applies_to
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        currency_options,
    })
}

pub fn list<S: StripeBackend>(backend: &S) -> Result<CmdResult> {
    let coupons = collect_pages(ListParams::default(), |params| backend.list_coupons(params))?;
    let mut result = CmdResult::default();
    if coupons.is_empty() {
        result.add_message(CmdMessage::info("No coupons found."));
    }
    Ok(result.with_coupons(coupons))
}

pub fn get<S: StripeBackend>(backend: &S, id: &str) -> Result<CmdResult> {
    let id = require_id(id, "coupon")?;
    let coupon = backend.get_coupon(id)?;
    Ok(CmdResult::default().with_coupons(vec![coupon]))
}

pub fn create<S: StripeBackend>(backend: &mut S, opts: &CouponCreate) -> Result<CmdResult> {
    let params = validate(opts)?;
    let coupon = backend.create_coupon(&params)?;
    tracing::info!(id = %coupon.id, "coupon created");

    let message = CmdMessage::success(format!("Coupon created successfully: {}", coupon.id));
    Ok(CmdResult::default()
        .with_message(message)
        .with_coupons(vec![coupon]))
}

pub fn update<S: StripeBackend>(backend: &mut S, id: &str, opts: &CouponUpdate) -> Result<CmdResult> {
    let id = require_id(id, "coupon")?;
    let params = CouponUpdateParams {
        name: non_blank(&opts.name).map(str::to_string),
        metadata: opts.metadata.clone(),
    };

    if params.is_empty() {
        return Ok(CmdResult::default().with_message(CmdMessage::info("Nothing to update.")));
    }

    let coupon = backend.update_coupon(id, &params)?;
    let message = CmdMessage::success(format!("Coupon updated successfully: {}", coupon.id));
    Ok(CmdResult::default()
        .with_message(message)
        .with_coupons(vec![coupon]))
}

pub fn delete<S: StripeBackend>(backend: &mut S, id: &str) -> Result<CmdResult> {
    let id = require_id(id, "coupon")?;
    let deleted = backend.delete_coupon(id)?;
    let message = CmdMessage::success(format!("Coupon deleted successfully: {}", deleted.id));
    Ok(CmdResult::default()
        .with_message(message)
        .with_deleted(deleted))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
