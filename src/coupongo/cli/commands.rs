//! # CLI Layer
//!
//! This module is **one possible UI client** for coupongo. It is not the application itself.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, prompts)
//! - Installs the tracing subscriber
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: Convert shell arguments into typed commands via clap
//! 2. **Context Setup**: Load the config, resolve the environment, build `AppContext`
//! 3. **Input Completion**: Prompt for values that were not given as flags
//! 4. **API Dispatch**: Call the matching `CouponApi` method
//! 5. **Output Formatting**: Render `CmdResult` as a table, list or JSON
//!
//! Rendered output goes to stdout. Prompts, logs and (in JSON mode) status
//! messages go to stderr, so `-f json` output can be piped.
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Builds `AppContext` for coupon and promo commands
//! - `handle_*()`: Per-command handlers that call the API and print output

use super::prompt::Prompter;
use super::render::{
    print_messages, render_batch_examples, render_config, render_coupon, render_coupons,
    render_environments, render_promotion_code, render_promotion_codes,
};
use super::setup::{
    get_version, Cli, Commands, ConfigCommands, CouponCommands, CouponCreateArgs, PromoCommands,
    PromoCreateArgs,
};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use coupongo::api::CouponApi;
use coupongo::commands::config::{self as config_cmd, ConfigAction};
use coupongo::commands::coupon::{CouponCreate, CouponUpdate};
use coupongo::commands::promo::{
    BatchCreate, PromotionCodeCreate, PromotionCodeUpdate, PromotionRules, MAX_BATCH_SIZE,
};
use coupongo::commands::{parse_metadata, CmdMessage, CmdResult, MessageLevel};
use coupongo::config::{
    default_config_path, validate_api_key, validate_currency, validate_environment_name,
    ConfigStore, Environment, OutputFormat, DEFAULT_CURRENCY, DEFAULT_ENVIRONMENT,
};
use coupongo::error::{CouponError, Result};
use coupongo::model::Coupon;
use coupongo::stripe::http::StripeClient;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

/// Log filter override, e.g. `COUPONGO_LOG=coupongo=trace`.
const LOG_ENV: &str = "COUPONGO_LOG";
const SECONDS_PER_DAY: i64 = 86_400;

struct AppContext {
    api: CouponApi<StripeClient>,
    format: OutputFormat,
    currency: String,
    prompter: Prompter,
}

impl AppContext {
    /// Status messages; kept off stdout when it carries JSON.
    fn report(&self, messages: &[CmdMessage]) {
        report(self.format, messages);
    }
}

fn report(format: OutputFormat, messages: &[CmdMessage]) {
    if format == OutputFormat::Json {
        for message in messages {
            eprintln!("{}", message.content);
        }
    } else {
        print_messages(messages);
    }
}

fn emit(output: &str) {
    println!("{}", output.trim_end());
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("coupongo {}", get_version());
            Ok(())
        }
        Commands::Config(cmd) => handle_config(cmd, cli.format),
        Commands::Coupon(cmd) => {
            let mut ctx = init_context(cli.env.as_deref(), cli.format)?;
            match cmd {
                CouponCommands::List => handle_coupon_list(&ctx),
                CouponCommands::Get { id } => handle_coupon_get(&ctx, &id),
                CouponCommands::Create(args) => handle_coupon_create(&mut ctx, args),
                CouponCommands::Update { id, name, metadata } => {
                    handle_coupon_update(&mut ctx, &id, name, metadata)
                }
                CouponCommands::Delete { id, yes } => handle_coupon_delete(&mut ctx, &id, yes),
            }
        }
        Commands::Promo(cmd) => {
            let mut ctx = init_context(cli.env.as_deref(), cli.format)?;
            match cmd {
                PromoCommands::List { coupon } => handle_promo_list(&ctx, coupon.as_deref()),
                PromoCommands::Get { id } => handle_promo_get(&ctx, &id),
                PromoCommands::Create(args) => handle_promo_create(&mut ctx, args),
                PromoCommands::Batch {
                    coupon_id,
                    count,
                    prefix,
                    max_redemptions,
                    expires_at,
                    first_time_only,
                    metadata,
                } => {
                    let rules = PromotionRules {
                        max_redemptions,
                        expires_at,
                        first_time_transaction: first_time_only,
                        metadata: parse_metadata(&metadata)?,
                        ..PromotionRules::default()
                    };
                    handle_promo_batch(&mut ctx, coupon_id, count, prefix, rules)
                }
                PromoCommands::Update {
                    id,
                    active,
                    metadata,
                } => handle_promo_update(&mut ctx, &id, active, metadata),
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "coupongo=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when run from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(env: Option<&str>, format: Option<OutputFormat>) -> Result<AppContext> {
    let mut store = ConfigStore::load(default_config_path()?)?;
    let prompter = Prompter::new();

    let (name, environment) = store.resolve(env)?;
    let environment = environment.clone();
    if !environment.has_api_key() {
        ensure_api_key(&mut store, &prompter, &name)?;
    }

    let client = StripeClient::initialize(&store, Some(&name))?;
    Ok(AppContext {
        api: CouponApi::new(client),
        format: format.unwrap_or(environment.output_format),
        currency: environment.default_currency,
        prompter,
    })
}

/// Asks for a key when the environment has none, and saves it.
fn ensure_api_key(store: &mut ConfigStore, prompter: &Prompter, name: &str) -> Result<()> {
    if !prompter.is_interactive() {
        return Err(CouponError::MissingApiKey(name.to_string()));
    }

    prompter.say(&format!("No API key found for environment '{}'.", name))?;
    let key = prompter.secret("Enter your Stripe API key")?;
    validate_api_key(&key)?;
    store.update_environment_api_key(name, &key)?;
    prompter.say(&"API key saved successfully!".green().to_string())?;
    Ok(())
}

/// Calls Stripe with `key`. On failure the user decides whether to keep it.
fn check_api_key(prompter: &Prompter, key: &str, environment: &str) -> Result<bool> {
    prompter.say("Testing API key...")?;
    match StripeClient::new(key, environment)?.test_connection() {
        Ok(()) => {
            prompter.say(&"API key is valid!".green().to_string())?;
            Ok(true)
        }
        Err(e) => {
            prompter.say(&format!("{} {}", "Warning: API key test failed:".yellow(), e))?;
            prompter.confirm("Continue anyway?")
        }
    }
}

fn cancelled() -> Result<()> {
    println!("{}", "Operation cancelled.".yellow());
    Ok(())
}

// --- config -----------------------------------------------------------------

fn handle_config(cmd: ConfigCommands, format: Option<OutputFormat>) -> Result<()> {
    let mut store = ConfigStore::load(default_config_path()?)?;
    let prompter = Prompter::new();
    let format = format.unwrap_or_else(|| {
        store
            .current_environment()
            .map(|env| env.output_format)
            .unwrap_or_default()
    });

    match cmd {
        ConfigCommands::Init => handle_init(&mut store, &prompter),
        ConfigCommands::Show => {
            let result = config_cmd::run(&mut store, ConfigAction::Show)?;
            if let Some(config) = &result.config {
                emit(&render_config(config, format)?);
            }
            Ok(())
        }
        ConfigCommands::ListEnv => {
            let result = config_cmd::run(&mut store, ConfigAction::ListEnvironments)?;
            if let Some(config) = &result.config {
                emit(&render_environments(config, format)?);
            }
            Ok(())
        }
        ConfigCommands::Use { name } => {
            let result = config_cmd::run(&mut store, ConfigAction::Use(name))?;
            print_messages(&result.messages);
            Ok(())
        }
        ConfigCommands::AddEnv {
            name,
            key,
            currency,
            default_format,
        } => handle_add_env(&mut store, &prompter, name, key, currency, default_format),
        ConfigCommands::RemoveEnv { name, yes } => {
            if !yes && !prompter.confirm(&format!("Remove environment '{}'?", name))? {
                return cancelled();
            }
            let result = config_cmd::run(&mut store, ConfigAction::RemoveEnvironment(name))?;
            print_messages(&result.messages);
            Ok(())
        }
        ConfigCommands::SetKey { name, key } => {
            store.environment(&name)?;
            let key = match key {
                Some(key) => key,
                None => {
                    let key = prompter.secret(&format!("Stripe API key for '{}'", name))?;
                    validate_api_key(&key)?;
                    if !check_api_key(&prompter, &key, &name)? {
                        return cancelled();
                    }
                    key
                }
            };
            let result = config_cmd::run(&mut store, ConfigAction::SetKey(name, key))?;
            print_messages(&result.messages);
            Ok(())
        }
        ConfigCommands::Reset { yes } => {
            if !yes
                && !prompter.confirm("Reset configuration? All environments and keys will be removed.")?
            {
                return cancelled();
            }
            let result = config_cmd::run(&mut store, ConfigAction::Reset)?;
            print_messages(&result.messages);
            Ok(())
        }
    }
}

fn handle_add_env(
    store: &mut ConfigStore,
    prompter: &Prompter,
    name: String,
    key: Option<String>,
    currency: Option<String>,
    default_format: Option<OutputFormat>,
) -> Result<()> {
    validate_environment_name(&name)?;

    let key = match key {
        Some(key) => key,
        None if prompter.is_interactive() => {
            let key = prompter.secret(&format!("Stripe API key for '{}' (empty to skip)", name))?;
            if !key.is_empty() {
                validate_api_key(&key)?;
                if !check_api_key(prompter, &key, &name)? {
                    return cancelled();
                }
            }
            key
        }
        None => String::new(),
    };

    let env = Environment {
        stripe_api_key: key,
        default_currency: currency.unwrap_or_default(),
        output_format: default_format.unwrap_or_default(),
    };
    let result = config_cmd::run(store, ConfigAction::AddEnvironment(name, env))?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_init(store: &mut ConfigStore, prompter: &Prompter) -> Result<()> {
    prompter.say(
        &"Welcome to CouponGo! Let's set up your configuration."
            .bold()
            .to_string(),
    )?;

    let configured = store
        .config()
        .environments
        .values()
        .any(Environment::has_api_key);
    let mut adding = false;
    if configured {
        let choice = prompter.select(
            "Configuration already exists. What would you like to do?",
            &["Add new environment", "Reconfigure from scratch", "Cancel"],
        )?;
        match choice {
            0 => adding = true,
            1 => store.reset()?,
            _ => return cancelled(),
        }
    }

    let label = "Environment name (e.g., test, production, dev)";
    let name = if adding {
        prompter.text(label)?
    } else {
        prompter.text_or(label, DEFAULT_ENVIRONMENT)?
    };
    check_init_name(store, &name, adding)?;

    let key = prompter.secret("Stripe API key")?;
    validate_api_key(&key)?;

    let currency = validate_currency(&prompter.text_or("Default currency", DEFAULT_CURRENCY)?)?;

    let formats = [OutputFormat::Table, OutputFormat::Json, OutputFormat::List];
    let labels: Vec<&str> = formats.iter().map(OutputFormat::as_str).collect();
    let output_format = formats[prompter.select("Default output format", &labels)?];

    if !check_api_key(prompter, &key, &name)? {
        return cancelled();
    }

    let env = Environment {
        stripe_api_key: key,
        default_currency: currency,
        output_format,
    };
    store.add_environment(&name, env)?;
    store.set_current_environment(&name)?;

    println!("{}", "Configuration saved successfully!".green());
    println!("Current environment: {}", name.bold());
    Ok(())
}

/// Adding next to configured environments must not replace one of them.
/// A first run or a reset may reuse a name, which only holds the empty default.
fn check_init_name(store: &ConfigStore, name: &str, adding: bool) -> Result<()> {
    validate_environment_name(name)?;
    if adding && store.contains(name) {
        return Err(CouponError::validation(format!(
            "environment '{}' already exists",
            name
        )));
    }
    Ok(())
}

// --- coupons ----------------------------------------------------------------

fn show_coupons(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    if result.coupons.is_empty() && ctx.format != OutputFormat::Json {
        ctx.report(&result.messages);
        return Ok(());
    }
    emit(&render_coupons(&result.coupons, ctx.format)?);
    Ok(())
}

fn show_coupon(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    ctx.report(&result.messages);
    if let Some(coupon) = result.coupons.first() {
        emit(&render_coupon(coupon, ctx.format)?);
    }
    Ok(())
}

fn handle_coupon_list(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list_coupons()?;
    show_coupons(ctx, &result)
}

fn handle_coupon_get(ctx: &AppContext, id: &str) -> Result<()> {
    let result = ctx.api.get_coupon(id)?;
    show_coupon(ctx, &result)
}

fn handle_coupon_create(ctx: &mut AppContext, args: CouponCreateArgs) -> Result<()> {
    let has_discount = args.has_discount();
    let mut opts = CouponCreate {
        currency_options: parse_currency_options(&args.currency_options)?,
        metadata: parse_metadata(&args.metadata)?,
        id: args.id,
        name: args.name,
        percent_off: args.percent_off,
        amount_off: args.amount_off,
        currency: args.currency,
        duration: args.duration,
        duration_in_months: args.duration_in_months,
        max_redemptions: args.max_redemptions,
        redeem_by: args.redeem_by,
        applies_to: args.applies_to,
    };

    if !has_discount {
        prompt_coupon(&ctx.prompter, &ctx.currency, &mut opts)?;
    }

    let result = ctx.api.create_coupon(&opts)?;
    show_coupon(ctx, &result)
}

/// Fills the discount and whatever else was not passed as a flag.
fn prompt_coupon(prompter: &Prompter, currency: &str, opts: &mut CouponCreate) -> Result<()> {
    let kind = prompter.select("Discount type", &["Percentage off", "Fixed amount off"])?;
    if kind == 0 {
        opts.percent_off = prompter.parsed("Percent off (e.g., 25)", true, |p: &f64| {
            if *p > 0.0 && *p <= 100.0 {
                Ok(())
            } else {
                Err("must be greater than 0 and at most 100".to_string())
            }
        })?;
    } else {
        opts.amount_off = prompter.positive("Amount off in cents (e.g., 500 for $5.00)", true)?;
        if opts.currency.is_none() {
            opts.currency = Some(prompter.text_or("Currency", currency)?);
        }
    }

    if opts.name.is_none() {
        opts.name = prompter.optional("Name (optional)")?;
    }

    if opts.duration.is_none() {
        let durations = ["once", "forever", "repeating"];
        let choice = prompter.select("Duration", &durations)?;
        opts.duration = Some(durations[choice].to_string());
    }
    if opts.duration.as_deref() == Some("repeating") && opts.duration_in_months.is_none() {
        opts.duration_in_months = prompter.positive("Duration in months", true)?;
    }

    if opts.max_redemptions.is_none() {
        opts.max_redemptions = prompter.positive("Max redemptions", false)?;
    }
    Ok(())
}

fn handle_coupon_update(
    ctx: &mut AppContext,
    id: &str,
    name: Option<String>,
    metadata: Vec<String>,
) -> Result<()> {
    let mut opts = CouponUpdate {
        name,
        metadata: parse_metadata(&metadata)?,
    };
    if opts.name.is_none() && opts.metadata.is_empty() && ctx.prompter.is_interactive() {
        opts.name = ctx.prompter.optional("New name (empty to keep)")?;
    }

    let result = ctx.api.update_coupon(id, &opts)?;
    show_coupon(ctx, &result)
}

fn handle_coupon_delete(ctx: &mut AppContext, id: &str, yes: bool) -> Result<()> {
    if !yes
        && !ctx
            .prompter
            .confirm(&format!("Delete coupon '{}'? This cannot be undone.", id))?
    {
        return cancelled();
    }

    let result = ctx.api.delete_coupon(id)?;
    if ctx.format == OutputFormat::Json {
        if let Some(deleted) = result.deleted.first() {
            emit(&serde_json::to_string_pretty(deleted)?);
        }
    } else {
        print_messages(&result.messages);
    }
    Ok(())
}

/// `eur:950` pairs for `--currency-option`.
fn parse_currency_options(pairs: &[String]) -> Result<BTreeMap<String, i64>> {
    pairs
        .iter()
        .map(|pair| {
            let (currency, amount) = pair.split_once(':').ok_or_else(|| {
                CouponError::validation(format!(
                    "invalid currency option '{}': expected CUR:AMOUNT",
                    pair
                ))
            })?;
            let amount = amount.trim().parse::<i64>().map_err(|_| {
                CouponError::validation(format!("invalid amount in currency option '{}'", pair))
            })?;
            Ok((currency.trim().to_string(), amount))
        })
        .collect()
}

// --- promotion codes --------------------------------------------------------

fn show_promotion_codes(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    if result.promotion_codes.is_empty() && ctx.format != OutputFormat::Json {
        ctx.report(&result.messages);
        return Ok(());
    }
    emit(&render_promotion_codes(&result.promotion_codes, ctx.format)?);
    Ok(())
}

fn show_promotion_code(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    ctx.report(&result.messages);
    if let Some(code) = result.promotion_codes.first() {
        emit(&render_promotion_code(code, ctx.format)?);
    }
    Ok(())
}

/// Looks the coupon up first so a typo fails before anything is created.
fn fetch_coupon(ctx: &AppContext, coupon_id: &str) -> Result<Coupon> {
    let result = ctx.api.get_coupon(coupon_id)?;
    result
        .coupons
        .into_iter()
        .next()
        .ok_or_else(|| CouponError::validation(format!("coupon not found: {}", coupon_id)))
}

fn handle_promo_list(ctx: &AppContext, coupon: Option<&str>) -> Result<()> {
    let result = ctx.api.list_promotion_codes(coupon)?;
    show_promotion_codes(ctx, &result)
}

fn handle_promo_get(ctx: &AppContext, id: &str) -> Result<()> {
    let result = ctx.api.get_promotion_code(id)?;
    show_promotion_code(ctx, &result)
}

fn handle_promo_create(ctx: &mut AppContext, args: PromoCreateArgs) -> Result<()> {
    let coupon = fetch_coupon(ctx, &args.coupon_id)?;
    if ctx.format != OutputFormat::Json {
        println!(
            "Creating promotion code for coupon: {} ({})",
            coupon.id.cyan(),
            coupon.value_label()
        );
    }

    let interactive = !args.has_options() && ctx.prompter.is_interactive();
    let mut opts = PromotionCodeCreate {
        coupon_id: coupon.id.clone(),
        code: args.code,
        prefix: args.prefix,
        active: args.active,
        rules: PromotionRules {
            customer: args.customer,
            max_redemptions: args.max_redemptions,
            expires_at: args.expires_at,
            first_time_transaction: args.first_time_only,
            minimum_amount: args.minimum_amount,
            minimum_amount_currency: args.currency,
            metadata: parse_metadata(&args.metadata)?,
        },
    };
    if interactive {
        prompt_promotion_code(&ctx.prompter, &mut opts)?;
    }
    if opts.rules.minimum_amount.is_some() && opts.rules.minimum_amount_currency.is_none() {
        opts.rules.minimum_amount_currency = Some(ctx.currency.clone());
    }

    let result = ctx.api.create_promotion_code(&opts)?;
    if let (Some(prefix), Some(code)) = (&opts.prefix, result.promotion_codes.first()) {
        if ctx.format != OutputFormat::Json {
            println!("Generated code with prefix '{}': {}", prefix, code.code.bold());
        }
    }
    show_promotion_code(ctx, &result)
}

fn prompt_promotion_code(prompter: &Prompter, opts: &mut PromotionCodeCreate) -> Result<()> {
    opts.code = prompter.optional("Custom code (empty for auto-generated)")?;
    if opts.code.is_none() {
        opts.prefix = prompter.optional("Code prefix (optional)")?;
    }
    opts.rules.max_redemptions = prompter.positive("Max redemptions", false)?;
    opts.rules.expires_at = prompter
        .positive("Expires in days", false)?
        .map(|days| Utc::now().timestamp() + days * SECONDS_PER_DAY);
    opts.rules.first_time_transaction = prompter.confirm("First-time customers only?")?;
    opts.rules.minimum_amount = prompter.positive("Minimum order amount in cents", false)?;
    Ok(())
}

fn handle_promo_batch(
    ctx: &mut AppContext,
    coupon_id: String,
    count: Option<i64>,
    prefix: Option<String>,
    rules: PromotionRules,
) -> Result<()> {
    let count = match count {
        Some(count) => count,
        None => ctx
            .prompter
            .parsed("Number of codes to create", true, |n: &i64| {
                if (1..=MAX_BATCH_SIZE).contains(n) {
                    Ok(())
                } else {
                    Err(format!("must be between 1 and {}", MAX_BATCH_SIZE))
                }
            })?
            .unwrap_or_default(),
    };
    let opts = BatchCreate {
        coupon_id,
        count,
        prefix,
        rules,
    };

    // Count problems should not cost a remote lookup.
    if count <= 0 || count > MAX_BATCH_SIZE {
        return Err(CouponError::validation(format!(
            "count must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }

    let coupon = fetch_coupon(ctx, &opts.coupon_id)?;
    if ctx.format != OutputFormat::Json {
        println!(
            "Creating {} promotion codes for coupon: {} ({})",
            count,
            coupon.id.cyan(),
            coupon.value_label()
        );
    }

    let result = ctx.api.batch_create_promotion_codes(&opts)?;
    if ctx.format == OutputFormat::Json {
        ctx.report(&result.messages);
        emit(&render_promotion_codes(&result.promotion_codes, ctx.format)?);
        return Ok(());
    }

    let (warnings, others): (Vec<CmdMessage>, Vec<CmdMessage>) = result
        .messages
        .iter()
        .cloned()
        .partition(|m| m.level == MessageLevel::Warning);
    print_messages(&others);
    emit(&render_batch_examples(&result.promotion_codes));
    print_messages(&warnings);
    Ok(())
}

fn handle_promo_update(
    ctx: &mut AppContext,
    id: &str,
    active: Option<bool>,
    metadata: Vec<String>,
) -> Result<()> {
    let mut opts = PromotionCodeUpdate {
        active,
        metadata: parse_metadata(&metadata)?,
    };
    if opts.active.is_none() && opts.metadata.is_empty() && ctx.prompter.is_interactive() {
        let choice = ctx.prompter.select("Status", &["Active", "Inactive"])?;
        opts.active = Some(choice == 0);
    }

    let result = ctx.api.update_promotion_code(id, &opts)?;
    show_promotion_code(ctx, &result)
}
