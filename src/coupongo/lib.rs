//! # Coupongo Architecture
//!
//! Coupongo manages Stripe coupons and promotion codes across several named
//! Stripe accounts ("environments"). The crate is a library with a thin CLI on
//! top; nothing below the CLI layer prints, prompts or exits.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prompts, renders tables / JSON / lists │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands, owns backend + code generator │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Parameter validation, pagination, batch accounting       │
//! │  - Returns `Result<CmdResult>`                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Backend Layer (stripe/)                                    │
//! │  - StripeBackend trait                                      │
//! │  - StripeClient (HTTPS), InMemoryStripe (testing)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration (`config.rs`) sits beside the stack: the CLI loads a
//! [`config::ConfigStore`], resolves an environment and builds one
//! [`stripe::http::StripeClient`] from its key. There is no global client.
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: unit tests against `InMemoryStripe`, which can inject
//!    failures into chosen create calls. Most tests live here.
//! 2. **API**: dispatch tests.
//! 3. **CLI**: render functions return strings and are tested directly; the
//!    binary is exercised end to end in `tests/` with `COUPONGO_CONFIG`
//!    pointing into a temp dir.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Business logic per command group
//! - [`stripe`]: Backend trait, HTTP client, in-memory backend
//! - [`model`]: Stripe resource types and display helpers
//! - [`config`]: Multi-environment config file
//! - [`codegen`]: Promotion code generation
//! - [`error`]: Error types

pub mod api;
pub mod codegen;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod stripe;
