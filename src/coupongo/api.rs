//! # API Facade
//!
//! Thin facade over the command layer and the single entry point for coupon
//! and promotion code operations, whatever UI sits on top.
//!
//! The facade:
//! - **Dispatches** to the matching function in `commands/*.rs`
//! - **Owns** the backend and the process-wide [`CodeGenerator`]
//! - **Returns structured types** (`Result<CmdResult>`), never strings
//!
//! `CouponApi<S: StripeBackend>` is generic over the backend:
//! - Production: `CouponApi<StripeClient>`
//! - Testing: `CouponApi<InMemoryStripe>`
//!
//! Config management does not go through here; it needs no backend and runs
//! directly against a [`ConfigStore`](crate::config::ConfigStore) via
//! [`commands::config::run`].

use crate::codegen::CodeGenerator;
use crate::commands::{self, CmdMessage, CmdResult};
use crate::error::Result;
use crate::stripe::{self, StripeBackend};

pub struct CouponApi<S: StripeBackend> {
    backend: S,
    generator: CodeGenerator,
}

impl<S: StripeBackend> CouponApi<S> {
    pub fn new(backend: S) -> Self {
        Self::with_generator(backend, CodeGenerator::from_entropy())
    }

    pub fn with_generator(backend: S, generator: CodeGenerator) -> Self {
        Self { backend, generator }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn test_connection(&self) -> Result<()> {
        stripe::test_connection(&self.backend)
    }

    pub fn list_coupons(&self) -> Result<CmdResult> {
        commands::coupon::list(&self.backend)
    }

    pub fn get_coupon(&self, id: &str) -> Result<CmdResult> {
        commands::coupon::get(&self.backend, id)
    }

    pub fn create_coupon(&mut self, opts: &commands::coupon::CouponCreate) -> Result<CmdResult> {
        commands::coupon::create(&mut self.backend, opts)
    }

    pub fn update_coupon(
        &mut self,
        id: &str,
        opts: &commands::coupon::CouponUpdate,
    ) -> Result<CmdResult> {
        commands::coupon::update(&mut self.backend, id, opts)
    }

    pub fn delete_coupon(&mut self, id: &str) -> Result<CmdResult> {
        commands::coupon::delete(&mut self.backend, id)
    }

    pub fn list_promotion_codes(&self, coupon_id: Option<&str>) -> Result<CmdResult> {
        commands::promo::list(&self.backend, coupon_id)
    }

    pub fn get_promotion_code(&self, id: &str) -> Result<CmdResult> {
        commands::promo::get(&self.backend, id)
    }

    pub fn create_promotion_code(
        &mut self,
        opts: &commands::promo::PromotionCodeCreate,
    ) -> Result<CmdResult> {
        commands::promo::create(&mut self.backend, opts, &mut self.generator)
    }

    /// Runs the batch and folds a partial failure into a warning message, so
    /// the created codes are still returned. Fails only if nothing was created.
    pub fn batch_create_promotion_codes(
        &mut self,
        opts: &commands::promo::BatchCreate,
    ) -> Result<CmdResult> {
        let outcome = commands::promo::batch_create(&mut self.backend, opts, &mut self.generator)?;

        let mut result = CmdResult::default().with_message(CmdMessage::success(format!(
            "Created {} promotion codes for coupon {}",
            outcome.created(),
            opts.coupon_id.trim()
        )));
        if let Some(err) = outcome.partial_failure() {
            result.add_message(CmdMessage::warning(err.to_string()));
        }
        Ok(result.with_promotion_codes(outcome.codes))
    }

    pub fn update_promotion_code(
        &mut self,
        id: &str,
        opts: &commands::promo::PromotionCodeUpdate,
    ) -> Result<CmdResult> {
        commands::promo::update(&mut self.backend, id, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::coupon::CouponCreate;
    use crate::commands::promo::{BatchCreate, PromotionCodeCreate};
    use crate::commands::MessageLevel;
    use crate::stripe::memory::InMemoryStripe;

    fn api() -> CouponApi<InMemoryStripe> {
        CouponApi::with_generator(InMemoryStripe::new(), CodeGenerator::seeded(11))
    }

    #[test]
    fn coupon_roundtrip_through_facade() {
        let mut api = api();
        let opts = CouponCreate {
            id: Some("SPRING".into()),
            percent_off: Some(15.0),
            ..CouponCreate::default()
        };
        api.create_coupon(&opts).unwrap();

        assert_eq!(api.list_coupons().unwrap().coupons.len(), 1);
        assert_eq!(api.get_coupon("SPRING").unwrap().coupons[0].id, "SPRING");
        api.delete_coupon("SPRING").unwrap();
        assert!(api.backend().coupons().is_empty());
    }

    #[test]
    fn promotion_code_is_bound_to_coupon() {
        let mut api = api();
        api.create_coupon(&CouponCreate {
            id: Some("SPRING".into()),
            percent_off: Some(15.0),
            ..CouponCreate::default()
        })
        .unwrap();

        let result = api
            .create_promotion_code(&PromotionCodeCreate {
                coupon_id: "SPRING".into(),
                code: Some("SPRING15".into()),
                ..PromotionCodeCreate::default()
            })
            .unwrap();
        assert_eq!(result.promotion_codes[0].coupon.id, "SPRING");
        assert_eq!(api.list_promotion_codes(Some("SPRING")).unwrap().promotion_codes.len(), 1);
    }

    #[test]
    fn partial_batch_is_reported_as_warning() {
        let backend = InMemoryStripe::new()
            .with_coupon(crate::model::fixtures::percent_coupon("SPRING", 10.0))
            .fail_promotion_code_creates([1]);
        let mut api = CouponApi::with_generator(backend, CodeGenerator::seeded(3));

        let result = api
            .batch_create_promotion_codes(&BatchCreate {
                coupon_id: "SPRING".into(),
                count: 3,
                ..BatchCreate::default()
            })
            .unwrap();

        assert_eq!(result.promotion_codes.len(), 2);
        assert_eq!(result.messages[0].content, "Created 2 promotion codes for coupon SPRING");
        assert_eq!(result.messages[1].level, MessageLevel::Warning);
        assert!(result.messages[1]
            .content
            .starts_with("created 2/3 codes successfully"));
    }

    #[test]
    fn connection_probe_uses_backend() {
        assert!(api().test_connection().is_ok());
        let broken = CouponApi::new(InMemoryStripe::new().fail_list_calls());
        assert!(broken.test_connection().is_err());
    }
}
