//! Output rendering for the three formats.
//!
//! Every `render_*` function returns a `String`; printing happens in the
//! handlers. Column widths are measured on the uncolored text so ANSI codes
//! never break the table borders.

use chrono::Utc;
use colored::{Color, ColoredString, Colorize};
use coupongo::commands::{CmdMessage, MessageLevel};
use coupongo::config::{Config, OutputFormat};
use coupongo::error::Result;
use coupongo::model::{
    format_amount, format_timestamp, Coupon, CouponDuration, PromotionCode, PromotionStatus,
};
use serde_json::json;
use unicode_width::UnicodeWidthStr;

const LIST_RULE_WIDTH: usize = 50;
const DETAIL_RULE_WIDTH: usize = 60;
const BATCH_EXAMPLES: usize = 5;

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}

struct Cell {
    text: String,
    color: Option<Color>,
    bold: bool,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
        }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            bold: false,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn paint(&self) -> String {
        let mut styled: ColoredString = self.text.as_str().normal();
        if let Some(color) = self.color {
            styled = styled.color(color);
        }
        if self.bold {
            styled = styled.bold();
        }
        styled.to_string()
    }
}

/// Bordered `+---+` table.
struct Table {
    headers: Vec<&'static str>,
    header_color: Color,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    fn new(headers: Vec<&'static str>, header_color: Color) -> Self {
        Self {
            headers,
            header_color,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.text.width());
                }
            }
        }

        let mut border = String::from("+");
        for w in &widths {
            border.push_str(&"-".repeat(w + 2));
            border.push('+');
        }

        let header: Vec<Cell> = self
            .headers
            .iter()
            .map(|h| Cell::colored(h.to_uppercase(), self.header_color).bold())
            .collect();

        let mut out = String::new();
        out.push_str(&border);
        out.push('\n');
        out.push_str(&table_line(&header, &widths));
        out.push('\n');
        out.push_str(&border);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&table_line(row, &widths));
            out.push('\n');
        }
        out.push_str(&border);
        out.push('\n');
        out
    }
}

fn table_line(cells: &[Cell], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.text.width());
        line.push(' ');
        line.push_str(&cell.paint());
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

fn title(text: &str) -> String {
    format!("\n{}\n", text.bold())
}

fn total(count: usize, noun: &str) -> String {
    format!(
        "{} {}\n",
        "Total:".cyan(),
        format!("{} {}(s)", count, noun).bold()
    )
}

fn field(indent: &str, label: &str, value: impl std::fmt::Display) -> String {
    format!("{}{} {}\n", indent, label.cyan(), value)
}

fn rule(ch: &str, width: usize) -> String {
    format!("{}\n", ch.repeat(width))
}

/// `2023-11-14 22:13 (2 years ago)`.
fn created_label(unix: i64) -> String {
    let elapsed = Utc::now().timestamp().saturating_sub(unix).max(0) as u64;
    let ago = timeago::Formatter::new().convert(std::time::Duration::from_secs(elapsed));
    format!("{} ({})", format_timestamp(unix), ago)
}

fn is_past(unix: i64) -> bool {
    unix > 0 && unix < Utc::now().timestamp()
}

fn expiry_field(indent: &str, unix: Option<i64>) -> String {
    match unix {
        Some(at) if is_past(at) => field(indent, "Expired:", format_timestamp(at).red()),
        Some(at) if at > 0 => field(indent, "Expires:", format_timestamp(at).yellow()),
        _ => String::new(),
    }
}

fn status_icon(status: PromotionStatus) -> (&'static str, Color) {
    match status {
        PromotionStatus::Active => ("✓", Color::Green),
        PromotionStatus::Inactive => ("✗", Color::Red),
        PromotionStatus::Expired | PromotionStatus::MaxRedemptionsReached => ("⚠", Color::Yellow),
    }
}

fn coupon_validity(coupon: &Coupon) -> ColoredString {
    if coupon.valid {
        "✓ Valid".green()
    } else {
        "✗ Invalid".red()
    }
}

fn coupon_redemptions(coupon: &Coupon) -> String {
    match coupon.max_redemptions {
        Some(max) if max > 0 => format!("{}/{}", coupon.times_redeemed, max),
        _ => format!("{}/unlimited", coupon.times_redeemed),
    }
}

fn duration_color(duration: CouponDuration) -> Color {
    match duration {
        CouponDuration::Forever => Color::Green,
        CouponDuration::Once => Color::Yellow,
        CouponDuration::Repeating => Color::Cyan,
    }
}

pub fn render_coupons(coupons: &[Coupon], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(coupons)?),
        OutputFormat::List => Ok(coupon_list(coupons)),
        OutputFormat::Table => Ok(coupon_table(coupons)),
    }
}

pub fn render_coupon(coupon: &Coupon, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(coupon)?),
        OutputFormat::List | OutputFormat::Table => Ok(coupon_details(coupon)),
    }
}

fn coupon_table(coupons: &[Coupon]) -> String {
    let mut table = Table::new(
        vec!["ID", "Name", "Discount", "Duration", "Redeemed", "Status"],
        Color::Cyan,
    );

    for coupon in coupons {
        let name = match coupon.display_name() {
            Some(name) => Cell::plain(name),
            None => Cell::colored("(no name)", Color::BrightBlack),
        };
        let discount_color = if coupon.percent_off.is_some() {
            Color::Green
        } else {
            Color::Blue
        };
        let redeemed = if coupon.is_exhausted() {
            Cell::colored(coupon_redemptions(coupon), Color::Red)
        } else {
            Cell::plain(coupon_redemptions(coupon))
        };
        let status = if coupon.valid {
            Cell::colored("✓ Valid", Color::Green)
        } else {
            Cell::colored("✗ Invalid", Color::Red)
        };

        table.push(vec![
            Cell::colored(coupon.id.as_str(), Color::Cyan),
            name,
            Cell::colored(coupon.value_label(), discount_color),
            Cell::colored(coupon.duration_label(), duration_color(coupon.duration)),
            redeemed,
            status,
        ]);
    }

    let mut out = title("COUPONS");
    out.push_str(&table.render());
    out.push('\n');
    out.push_str(&total(coupons.len(), "coupon"));
    out
}

fn coupon_list(coupons: &[Coupon]) -> String {
    let mut out = title("COUPONS");
    out.push_str(&rule("═", LIST_RULE_WIDTH));

    for (i, coupon) in coupons.iter().enumerate() {
        if i > 0 {
            out.push_str(&rule("─", LIST_RULE_WIDTH));
        }
        out.push_str(&format!("{} {}\n", coupon.id.bold(), coupon_validity(coupon)));
        if let Some(name) = coupon.display_name() {
            out.push_str(&field("   ", "Name:", name));
        }
        out.push_str(&field("   ", "Discount:", coupon.value_label().green()));
        out.push_str(&field(
            "   ",
            "Duration:",
            coupon.duration_label().color(duration_color(coupon.duration)),
        ));
        let usage = if coupon.is_exhausted() {
            format!("{} {}", coupon_redemptions(coupon), "(Limit reached)".red())
        } else {
            coupon_redemptions(coupon)
        };
        out.push_str(&field("   ", "Usage:", usage));
        out.push_str(&field("   ", "Created:", created_label(coupon.created)));
        out.push_str(&expiry_field("   ", coupon.redeem_by));
    }

    out.push_str(&rule("═", LIST_RULE_WIDTH));
    out.push_str(&total(coupons.len(), "coupon"));
    out
}

fn coupon_details(coupon: &Coupon) -> String {
    let mut out = title("COUPON DETAILS");
    out.push_str(&rule("═", DETAIL_RULE_WIDTH));
    out.push_str(&field("", "ID:", coupon.id.cyan()));
    out.push_str(&field("", "Status:", coupon_validity(coupon)));
    if let Some(name) = coupon.display_name() {
        out.push_str(&field("", "Name:", name));
    }

    out.push_str(&format!("\n{}\n", "DISCOUNT".bold()));
    match (coupon.percent_off, coupon.amount_off) {
        (Some(_), _) => out.push_str(&field("  ", "Type:", "Percentage")),
        (_, Some(_)) => {
            out.push_str(&field("  ", "Type:", "Fixed amount"));
            let currency = coupon.currency.as_deref().unwrap_or_default();
            out.push_str(&field("  ", "Currency:", currency.to_uppercase()));
        }
        _ => {}
    }
    out.push_str(&field("  ", "Value:", coupon.value_label().green()));
    if let Some(options) = &coupon.currency_options {
        for (currency, option) in options {
            out.push_str(&field(
                "    ",
                &format!("{}:", currency.to_uppercase()),
                format_amount(option.amount_off, currency),
            ));
        }
    }

    out.push_str(&format!("\n{}\n", "DURATION".bold()));
    out.push_str(&field(
        "  ",
        "Type:",
        coupon.duration_label().color(duration_color(coupon.duration)),
    ));

    out.push_str(&format!("\n{}\n", "USAGE".bold()));
    out.push_str(&field("  ", "Times Redeemed:", coupon.times_redeemed));
    match coupon.max_redemptions {
        Some(max) if max > 0 => {
            out.push_str(&field("  ", "Max Redemptions:", max));
            let remaining = max - coupon.times_redeemed;
            let remaining = if remaining > 0 {
                remaining.to_string().green()
            } else {
                "0 (Limit reached)".red()
            };
            out.push_str(&field("  ", "Remaining:", remaining));
        }
        _ => out.push_str(&field("  ", "Max Redemptions:", "Unlimited")),
    }

    if let Some(applies_to) = coupon.applies_to.as_ref().filter(|a| !a.products.is_empty()) {
        out.push_str(&format!("\n{}\n", "APPLIES TO".bold()));
        for product in &applies_to.products {
            out.push_str(&format!("  {}\n", product));
        }
    }

    out.push_str(&format!("\n{}\n", "DATES".bold()));
    out.push_str(&field("  ", "Created:", created_label(coupon.created)));
    out.push_str(&expiry_field("  ", coupon.redeem_by));

    out.push_str(&metadata_section(&coupon.metadata));
    out.push('\n');
    out.push_str(&rule("═", DETAIL_RULE_WIDTH));
    out
}

fn metadata_section(metadata: &coupongo::model::Metadata) -> String {
    if metadata.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}\n", "METADATA".bold());
    for (key, value) in metadata {
        out.push_str(&field("  ", &format!("{}:", key), value));
    }
    out
}

pub fn render_promotion_codes(codes: &[PromotionCode], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(codes)?),
        OutputFormat::List => Ok(promotion_list(codes)),
        OutputFormat::Table => Ok(promotion_table(codes)),
    }
}

pub fn render_promotion_code(code: &PromotionCode, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(code)?),
        OutputFormat::List | OutputFormat::Table => Ok(promotion_details(code)),
    }
}

fn promotion_table(codes: &[PromotionCode]) -> String {
    let mut table = Table::new(
        vec!["Code", "Coupon", "Status", "Redeemed", "Expires"],
        Color::Magenta,
    );

    for code in codes {
        let status = code.status();
        let (icon, color) = status_icon(status);
        let redeemed = if code.is_exhausted() {
            Cell::colored(code.redemptions_label(), Color::Red)
        } else {
            Cell::plain(code.redemptions_label())
        };
        let expires = match code.expires_at {
            Some(at) if is_past(at) => Cell::colored(code.expiry_label(), Color::Red),
            Some(at) if at > 0 => Cell::colored(code.expiry_label(), Color::Yellow),
            _ => Cell::plain(code.expiry_label()),
        };

        table.push(vec![
            Cell::plain(code.code.as_str()).bold(),
            Cell::colored(code.coupon.id.as_str(), Color::Cyan),
            Cell::colored(format!("{} {}", icon, status), color),
            redeemed,
            expires,
        ]);
    }

    let mut out = title("PROMOTION CODES");
    out.push_str(&table.render());
    out.push('\n');
    out.push_str(&total(codes.len(), "promotion code"));
    out
}

fn restriction_fields(indent: &str, code: &PromotionCode) -> String {
    let mut out = String::new();
    if code.restrictions.first_time_transaction {
        out.push_str(&field(
            indent,
            "Restriction:",
            "First-time customers only".yellow(),
        ));
    }
    if let Some(min) = code.restrictions.minimum_amount.filter(|m| *m > 0) {
        let currency = code
            .restrictions
            .minimum_amount_currency
            .as_deref()
            .unwrap_or_default();
        out.push_str(&field(
            indent,
            "Min. Amount:",
            format!("{} {}", format_amount(min, currency), currency.to_uppercase()).yellow(),
        ));
    }
    if let Some(customer) = &code.customer {
        out.push_str(&field(indent, "Customer:", customer));
    }
    out
}

fn promotion_list(codes: &[PromotionCode]) -> String {
    let mut out = title("PROMOTION CODES");
    out.push_str(&rule("═", LIST_RULE_WIDTH));

    for (i, code) in codes.iter().enumerate() {
        if i > 0 {
            out.push_str(&rule("─", LIST_RULE_WIDTH));
        }
        let status = code.status();
        let (icon, color) = status_icon(status);
        out.push_str(&format!(
            "{} {} {}\n",
            code.code.bold(),
            icon,
            status.label().to_uppercase().color(color)
        ));

        let coupon = match code.coupon.display_name() {
            Some(name) => format!("{} ({})", code.coupon.id.blue(), name),
            None => code.coupon.id.blue().to_string(),
        };
        out.push_str(&field("   ", "Coupon:", coupon));
        out.push_str(&field("   ", "Discount:", code.coupon.value_label().green()));
        let usage = if code.is_exhausted() {
            format!("{} {}", code.redemptions_label().red(), "(Limit reached)".red())
        } else {
            code.redemptions_label()
        };
        out.push_str(&field("   ", "Usage:", usage));
        out.push_str(&field("   ", "Created:", created_label(code.created)));
        out.push_str(&expiry_field("   ", code.expires_at));
        out.push_str(&restriction_fields("   ", code));
    }

    out.push_str(&rule("═", LIST_RULE_WIDTH));
    out.push_str(&total(codes.len(), "promotion code"));
    out
}

fn promotion_details(code: &PromotionCode) -> String {
    let status = code.status();
    let (icon, color) = status_icon(status);

    let mut out = title("PROMOTION CODE DETAILS");
    out.push_str(&rule("═", DETAIL_RULE_WIDTH));
    out.push_str(&field("", "Code:", code.code.magenta()));
    out.push_str(&field(
        "",
        "Status:",
        format!("{} {}", icon, status.label().to_uppercase().color(color)),
    ));
    out.push_str(&field("", "ID:", code.id.dimmed()));

    out.push_str(&format!("\n{}\n", "COUPON".bold()));
    out.push_str(&field("  ", "ID:", code.coupon.id.blue()));
    if let Some(name) = code.coupon.display_name() {
        out.push_str(&field("  ", "Name:", name));
    }
    out.push_str(&field("  ", "Discount:", code.coupon.value_label().green()));
    out.push_str(&field("  ", "Duration:", code.coupon.duration_label()));

    out.push_str(&format!("\n{}\n", "USAGE".bold()));
    out.push_str(&field("  ", "Times Redeemed:", code.times_redeemed));
    match code.max_redemptions {
        Some(max) if max > 0 => {
            out.push_str(&field("  ", "Max Redemptions:", max));
            let remaining = max - code.times_redeemed;
            let remaining = if remaining > 0 {
                remaining.to_string().green()
            } else {
                "0 (Limit reached)".red()
            };
            out.push_str(&field("  ", "Remaining:", remaining));
        }
        _ => out.push_str(&field("  ", "Max Redemptions:", "Unlimited")),
    }

    let restrictions = restriction_fields("  ", code);
    if !restrictions.is_empty() {
        out.push_str(&format!("\n{}\n", "RESTRICTIONS".bold()));
        out.push_str(&restrictions);
    }

    out.push_str(&format!("\n{}\n", "DATES".bold()));
    out.push_str(&field("  ", "Created:", created_label(code.created)));
    match code.expires_at {
        Some(at) if at > 0 => out.push_str(&expiry_field("  ", Some(at))),
        _ => out.push_str(&field("  ", "Expires:", "Never")),
    }

    out.push_str(&metadata_section(&code.metadata));
    out.push('\n');
    out.push_str(&rule("═", DETAIL_RULE_WIDTH));
    out
}

/// A few of the codes a batch created.
pub fn render_batch_examples(codes: &[PromotionCode]) -> String {
    if codes.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}\n", "Examples:".bold());
    for code in codes.iter().take(BATCH_EXAMPLES) {
        out.push_str(&format!("  {} (ID: {})\n", code.code, code.id));
    }
    if codes.len() > BATCH_EXAMPLES {
        out.push_str(&format!("... and {} more\n", codes.len() - BATCH_EXAMPLES));
    }
    out
}

/// `config show`. Expects an already masked config.
pub fn render_config(config: &Config, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(config)?);
    }

    let mut table = Table::new(
        vec!["Environment", "API Key", "Currency", "Output Format", "Status"],
        Color::Cyan,
    );
    for (name, env) in &config.environments {
        let label = if *name == config.current_environment {
            Cell::plain(format!("{} (current)", name)).bold()
        } else {
            Cell::plain(name.as_str())
        };
        let status = if env.has_api_key() && env.stripe_api_key != "Not set" {
            Cell::colored("✓", Color::Green)
        } else {
            Cell::colored("⚠ No API key", Color::Yellow)
        };
        table.push(vec![
            label,
            Cell::plain(env.stripe_api_key.as_str()),
            Cell::plain(env.default_currency.as_str()),
            Cell::plain(env.output_format.as_str()),
            status,
        ]);
    }

    let mut out = format!(
        "{} {}\n\n",
        "Current Environment:".cyan(),
        config.current_environment.bold()
    );
    out.push_str(&table.render());
    Ok(out)
}

/// `config list-env`.
pub fn render_environments(config: &Config, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let names: Vec<&String> = config.environments.keys().collect();
        let value = json!({
            "current_environment": config.current_environment,
            "environments": names,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = format!(
        "{} {}\n\n{}\n",
        "Current environment:".cyan(),
        config.current_environment.bold(),
        "Available environments:"
    );
    for name in config.environments.keys() {
        if *name == config.current_environment {
            out.push_str(&format!("* {}\n", name.green()));
        } else {
            out.push_str(&format!("  {}\n", name));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupongo::config::Environment;
    use coupongo::model::{Metadata, Restrictions};

    fn no_color() {
        colored::control::set_override(false);
    }

    fn coupon(id: &str) -> Coupon {
        Coupon {
            id: id.to_string(),
            name: Some("Spring Sale".to_string()),
            percent_off: Some(25.0),
            amount_off: None,
            currency: None,
            duration: CouponDuration::Repeating,
            duration_in_months: Some(3),
            max_redemptions: Some(10),
            times_redeemed: 10,
            redeem_by: None,
            valid: true,
            created: 1_700_000_000,
            livemode: false,
            metadata: Metadata::new(),
            applies_to: None,
            currency_options: None,
        }
    }

    fn promo(code: &str) -> PromotionCode {
        PromotionCode {
            id: format!("promo_{}", code.to_lowercase()),
            code: code.to_string(),
            coupon: coupon("SPRING"),
            active: true,
            customer: None,
            max_redemptions: None,
            times_redeemed: 2,
            expires_at: None,
            created: 1_700_000_000,
            livemode: false,
            restrictions: Restrictions::default(),
            metadata: Metadata::new(),
        }
    }

    fn table_lines(out: &str) -> Vec<&str> {
        out.lines()
            .filter(|l| l.starts_with('+') || l.starts_with('|'))
            .collect()
    }

    #[test]
    fn coupon_table_rows_align() {
        no_color();
        let mut second = coupon("LONGER_COUPON_ID");
        second.name = None;
        let out = render_coupons(&[coupon("SPRING"), second], OutputFormat::Table).unwrap();

        let lines = table_lines(&out);
        assert_eq!(lines.len(), 6);
        let width = lines[0].width();
        assert!(lines.iter().all(|l| l.width() == width));
        assert!(out.contains("| ID "));
        assert!(out.contains("25.0% off"));
        assert!(out.contains("10/10"));
        assert!(out.contains("(no name)"));
        assert!(out.contains("Total: 2 coupon(s)"));
    }

    #[test]
    fn promotion_table_shows_status() {
        no_color();
        let mut inactive = promo("SAVE2");
        inactive.active = false;
        let out = render_promotion_codes(&[promo("SAVE1"), inactive], OutputFormat::Table).unwrap();
        assert!(out.contains("✓ Active"));
        assert!(out.contains("✗ Inactive"));
        assert!(out.contains("2/unlimited"));
        assert!(out.contains("Never"));
    }

    #[test]
    fn json_is_pretty_stripe_shape() {
        let out = render_coupons(&[coupon("SPRING")], OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["id"], "SPRING");
        assert_eq!(parsed[0]["duration"], "repeating");
        assert!(out.contains("\n  "));
    }

    #[test]
    fn list_view_uses_rules() {
        no_color();
        let out = render_promotion_codes(&[promo("A"), promo("B")], OutputFormat::List).unwrap();
        assert_eq!(out.matches(&"═".repeat(LIST_RULE_WIDTH)).count(), 2);
        assert_eq!(out.matches(&"─".repeat(LIST_RULE_WIDTH)).count(), 1);
        assert!(out.contains("Coupon: SPRING (Spring Sale)"));
        assert!(out.contains("ago)"));
    }

    #[test]
    fn single_coupon_is_detail_view_in_table_mode() {
        no_color();
        let out = render_coupon(&coupon("SPRING"), OutputFormat::Table).unwrap();
        assert!(out.contains("COUPON DETAILS"));
        assert!(out.contains("Remaining: 0 (Limit reached)"));
        assert!(out.contains("Type: 3 months"));
    }

    #[test]
    fn promotion_details_show_restrictions() {
        no_color();
        let mut code = promo("FIRST");
        code.restrictions.first_time_transaction = true;
        code.restrictions.minimum_amount = Some(2500);
        code.restrictions.minimum_amount_currency = Some("usd".into());

        let out = render_promotion_code(&code, OutputFormat::List).unwrap();
        assert!(out.contains("RESTRICTIONS"));
        assert!(out.contains("Min. Amount: 25.00 USD"));
        assert!(out.contains("Expires: Never"));
    }

    #[test]
    fn batch_examples_are_capped() {
        let codes: Vec<PromotionCode> = (0..7).map(|i| promo(&format!("C{}", i))).collect();
        let out = render_batch_examples(&codes);
        assert_eq!(out.matches("(ID: ").count(), 5);
        assert!(out.ends_with("... and 2 more\n"));
    }

    #[test]
    fn config_table_marks_current_and_missing_keys() {
        no_color();
        let mut config = Config::default();
        config.environments.insert(
            "prod".into(),
            Environment::with_api_key("sk_live_1234567890abcdef"),
        );
        let out = render_config(&config.masked(), OutputFormat::Table).unwrap();
        assert!(out.contains("Current Environment: test"));
        assert!(out.contains("test (current)"));
        assert!(out.contains("sk_****cdef"));
        assert!(out.contains("⚠ No API key"));
        assert!(!out.contains("1234567890"));
    }

    #[test]
    fn environments_json_lists_names() {
        let out = render_environments(&Config::default(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["current_environment"], "test");
        assert_eq!(parsed["environments"][0], "test");
    }
}
