//! Stripe resource types as returned by the coupons and promotion codes endpoints.
//!
//! Only the fields this tool reads or prints are modelled. Unknown fields are
//! ignored on deserialization, and optional fields that Stripe returns as
//! `null` map to `None`.

use crate::error::{CouponError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type Metadata = BTreeMap<String, String>;

/// Currencies whose amounts are already expressed in whole units.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponDuration {
    Once,
    Forever,
    Repeating,
}

impl CouponDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponDuration::Once => "once",
            CouponDuration::Forever => "forever",
            CouponDuration::Repeating => "repeating",
        }
    }
}

impl fmt::Display for CouponDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponDuration {
    type Err = CouponError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(CouponDuration::Once),
            "forever" => Ok(CouponDuration::Forever),
            "repeating" => Ok(CouponDuration::Repeating),
            other => Err(CouponError::validation(format!(
                "invalid duration: {} (must be forever, once, or repeating)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliesTo {
    #[serde(default)]
    pub products: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyOption {
    pub amount_off: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub percent_off: Option<f64>,
    #[serde(default)]
    pub amount_off: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub duration: CouponDuration,
    #[serde(default)]
    pub duration_in_months: Option<i64>,
    #[serde(default)]
    pub max_redemptions: Option<i64>,
    #[serde(default)]
    pub times_redeemed: i64,
    #[serde(default)]
    pub redeem_by: Option<i64>,
    #[serde(default = "default_true")]
    pub valid: bool,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<AppliesTo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_options: Option<BTreeMap<String, CurrencyOption>>,
}

fn default_true() -> bool {
    true
}

impl Coupon {
    /// `"25.0% off"` or `"10.00 usd off"`.
    pub fn value_label(&self) -> String {
        match (self.percent_off, self.amount_off) {
            (Some(percent), _) if percent > 0.0 => format!("{:.1}% off", percent),
            (_, Some(amount)) if amount > 0 => {
                let currency = self.currency.as_deref().unwrap_or_default();
                format!("{} {} off", format_amount(amount, currency), currency)
            }
            _ => "Unknown discount".to_string(),
        }
    }

    pub fn duration_label(&self) -> String {
        match self.duration {
            CouponDuration::Forever => "Forever".to_string(),
            CouponDuration::Once => "One time".to_string(),
            CouponDuration::Repeating => {
                format!("{} months", self.duration_in_months.unwrap_or_default())
            }
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_redemptions, Some(max) if max > 0 && self.times_redeemed >= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default)]
    pub first_time_transaction: bool,
    #[serde(default)]
    pub minimum_amount: Option<i64>,
    #[serde(default)]
    pub minimum_amount_currency: Option<String>,
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        !self.first_time_transaction && self.minimum_amount.unwrap_or_default() <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCode {
    pub id: String,
    pub code: String,
    pub coupon: Coupon,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub max_redemptions: Option<i64>,
    #[serde(default)]
    pub times_redeemed: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub restrictions: Restrictions,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Derived lifecycle state of a promotion code; Stripe does not store it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionStatus {
    Active,
    Inactive,
    Expired,
    MaxRedemptionsReached,
}

impl PromotionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PromotionStatus::Active => "Active",
            PromotionStatus::Inactive => "Inactive",
            PromotionStatus::Expired => "Expired",
            PromotionStatus::MaxRedemptionsReached => "Max redemptions reached",
        }
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl PromotionCode {
    pub fn status(&self) -> PromotionStatus {
        self.status_at(Utc::now().timestamp())
    }

    pub fn status_at(&self, now: i64) -> PromotionStatus {
        if !self.active {
            return PromotionStatus::Inactive;
        }
        if matches!(self.expires_at, Some(at) if at > 0 && at < now) {
            return PromotionStatus::Expired;
        }
        if self.is_exhausted() {
            return PromotionStatus::MaxRedemptionsReached;
        }
        PromotionStatus::Active
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_redemptions, Some(max) if max > 0 && self.times_redeemed >= max)
    }

    /// `"3/100"` or `"3/unlimited"`.
    pub fn redemptions_label(&self) -> String {
        match self.max_redemptions {
            Some(max) if max > 0 => format!("{}/{}", self.times_redeemed, max),
            _ => format!("{}/unlimited", self.times_redeemed),
        }
    }

    pub fn expiry_label(&self) -> String {
        match self.expires_at {
            Some(at) if at > 0 => format_timestamp(at),
            _ => "Never".to_string(),
        }
    }
}

/// One page of a Stripe list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Response body of a `DELETE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Render minor units as a decimal string for the given currency.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let currency = currency.to_ascii_lowercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        return amount.to_string();
    }

    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// `YYYY-MM-DD HH:MM` in UTC.
pub fn format_timestamp(unix: i64) -> String {
    to_datetime(unix)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| unix.to_string())
}

pub fn to_datetime(unix: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(unix, 0)
}
