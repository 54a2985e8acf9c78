use crate::config::Config;
use crate::error::{CouponError, Result};
use crate::model::{Coupon, DeletedObject, Metadata, PromotionCode};

pub mod config;
pub mod coupon;
pub mod promo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub coupons: Vec<Coupon>,
    pub promotion_codes: Vec<PromotionCode>,
    pub deleted: Vec<DeletedObject>,
    /// Always masked; safe to print.
    pub config: Option<Config>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_coupons(mut self, coupons: Vec<Coupon>) -> Self {
        self.coupons = coupons;
        self
    }

    pub fn with_promotion_codes(mut self, codes: Vec<PromotionCode>) -> Self {
        self.promotion_codes = codes;
        self
    }

    pub fn with_deleted(mut self, deleted: DeletedObject) -> Self {
        self.deleted.push(deleted);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Parse `key=value` pairs. An empty value is kept; Stripe treats it as
/// "remove this key" on updates.
pub fn parse_metadata<I, S>(pairs: I) -> Result<Metadata>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut metadata = Metadata::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CouponError::validation(format!("invalid metadata '{}': expected key=value", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CouponError::validation(format!(
                "invalid metadata '{}': key cannot be empty",
                pair
            )));
        }
        metadata.insert(key.to_string(), value.trim().to_string());
    }
    Ok(metadata)
}

pub(crate) fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CouponError::validation(format!("{} ID is required", what)));
    }
    Ok(id)
}

pub(crate) fn require_positive(value: Option<i64>, field: &str) -> Result<()> {
    match value {
        Some(v) if v <= 0 => Err(CouponError::validation(format!(
            "{} must be greater than 0",
            field
        ))),
        _ => Ok(()),
    }
}
