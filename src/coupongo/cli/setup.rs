use clap::{Args, Parser, Subcommand};
use coupongo::config::OutputFormat;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "1.0.0" for releases, "1.0.0@abc1234 2024-01-15 14:30" for dev builds
pub fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "coupongo", bin_name = "coupongo", version = get_version())]
#[command(
    about = "Manage Stripe coupons and promotion codes across environments",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Environment to use (overrides the current environment)
    #[arg(short, long, global = true, value_name = "ENV", help_heading = "Options")]
    pub env: Option<String>,

    /// Output format: table, json or list
    #[arg(short, long, global = true, value_name = "FORMAT", help_heading = "Options")]
    pub format: Option<OutputFormat>,

    /// Debug logging on stderr
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage environments and API keys
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Manage coupons
    #[command(subcommand)]
    Coupon(CouponCommands),

    /// Manage promotion codes
    #[command(subcommand)]
    Promo(PromoCommands),

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set up the current environment's API key interactively
    Init,

    /// Show the configuration (keys masked)
    Show,

    /// List environments
    ListEnv,

    /// Switch the current environment
    Use {
        #[arg(value_name = "ENV")]
        name: String,
    },

    /// Add an environment
    AddEnv {
        #[arg(value_name = "ENV")]
        name: String,

        /// Stripe secret or restricted key (prompted for when omitted)
        #[arg(long)]
        key: Option<String>,

        /// Default currency, e.g. usd
        #[arg(long)]
        currency: Option<String>,

        /// Default output format for this environment
        #[arg(long, value_name = "FORMAT")]
        default_format: Option<OutputFormat>,
    },

    /// Remove an environment
    RemoveEnv {
        #[arg(value_name = "ENV")]
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Replace an environment's API key
    SetKey {
        #[arg(value_name = "ENV")]
        name: String,

        /// New key (prompted for when omitted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Restore the default configuration
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CouponCommands {
    /// List all coupons
    List,

    /// Show one coupon
    Get { id: String },

    /// Create a coupon (prompts when no discount is given)
    Create(CouponCreateArgs),

    /// Rename a coupon or edit its metadata
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// key=value, repeatable; an empty value removes the key
        #[arg(long = "metadata", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },

    /// Delete a coupon
    Delete {
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CouponCreateArgs {
    /// Coupon ID (generated by Stripe when omitted)
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// Percentage discount, 0 < n <= 100
    #[arg(long)]
    pub percent_off: Option<f64>,

    /// Fixed discount in minor units (cents)
    #[arg(long)]
    pub amount_off: Option<i64>,

    /// Currency for --amount-off
    #[arg(long)]
    pub currency: Option<String>,

    /// once, forever or repeating
    #[arg(long)]
    pub duration: Option<String>,

    #[arg(long)]
    pub duration_in_months: Option<i64>,

    #[arg(long)]
    pub max_redemptions: Option<i64>,

    /// Last redemption time, Unix timestamp
    #[arg(long)]
    pub redeem_by: Option<i64>,

    /// Restrict to product IDs (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "PRODUCTS")]
    pub applies_to: Vec<String>,

    /// Amount in another currency, e.g. eur:950 (repeatable)
    #[arg(long = "currency-option", value_name = "CUR:AMOUNT")]
    pub currency_options: Vec<String>,

    /// key=value, repeatable
    #[arg(long = "metadata", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
}

impl CouponCreateArgs {
    /// True when the discount itself was given on the command line.
    pub fn has_discount(&self) -> bool {
        self.percent_off.is_some() || self.amount_off.is_some()
    }
}

#[derive(Subcommand, Debug)]
pub enum PromoCommands {
    /// List promotion codes
    List {
        /// Only codes for this coupon
        #[arg(short, long)]
        coupon: Option<String>,
    },

    /// Show one promotion code
    Get { id: String },

    /// Create a promotion code (prompts when no options are given)
    Create(PromoCreateArgs),

    /// Create many promotion codes for one coupon
    Batch {
        coupon_id: String,

        /// Number of codes, 1 to 1000 (prompted for when omitted)
        #[arg(short = 'n', long)]
        count: Option<i64>,

        /// Code prefix (default PROMO)
        #[arg(short, long)]
        prefix: Option<String>,

        /// Maximum redemptions per code
        #[arg(long)]
        max_redemptions: Option<i64>,

        /// Expiry, Unix timestamp
        #[arg(long)]
        expires_at: Option<i64>,

        #[arg(long)]
        first_time_only: bool,

        /// key=value, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },

    /// Activate or deactivate a promotion code
    Update {
        id: String,

        #[arg(long, value_name = "true|false")]
        active: Option<bool>,

        /// key=value, repeatable; an empty value removes the key
        #[arg(long = "metadata", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct PromoCreateArgs {
    pub coupon_id: String,

    /// Exact code to create
    #[arg(long, conflicts_with = "prefix")]
    pub code: Option<String>,

    /// Generate PREFIX_XXXXXXXX
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Restrict to one customer ID
    #[arg(long)]
    pub customer: Option<String>,

    #[arg(short, long, value_name = "true|false")]
    pub active: Option<bool>,

    /// Expiry, Unix timestamp
    #[arg(long)]
    pub expires_at: Option<i64>,

    #[arg(short, long)]
    pub max_redemptions: Option<i64>,

    #[arg(long)]
    pub first_time_only: bool,

    /// Minimum order amount in minor units
    #[arg(long)]
    pub minimum_amount: Option<i64>,

    /// Currency for --minimum-amount (defaults to the environment's currency)
    #[arg(long)]
    pub currency: Option<String>,

    /// key=value, repeatable
    #[arg(long = "metadata", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
}

impl PromoCreateArgs {
    pub fn has_options(&self) -> bool {
        self.code.is_some()
            || self.prefix.is_some()
            || self.customer.is_some()
            || self.active.is_some()
            || self.expires_at.is_some()
            || self.max_redemptions.is_some()
            || self.first_time_only
            || self.minimum_amount.is_some()
            || !self.metadata.is_empty()
    }
}
