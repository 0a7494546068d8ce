//! Plain-text credit invoices for 58 mm receipt printers (32 columns).

use crate::{config::ledger::BusinessInfo, entities::credit};
use chrono::{DateTime, Utc};

/// Characters per line on the receipt.
pub const LINE_WIDTH: usize = 32;

const DEFAULT_BUSINESS_NAME: &str = "CREDIT MANAGER";

fn rule() -> String {
    "=".repeat(LINE_WIDTH)
}

fn centered(text: &str) -> String {
    let len = text.chars().count();
    if len >= LINE_WIDTH {
        return text.to_string();
    }
    format!("{}{text}", " ".repeat((LINE_WIDTH - len) / 2))
}

/// Formats an amount with `.` as thousands separator: `1100000` -> `$1.100.000`.
#[must_use]
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn format_day(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Renders the invoice of `credit` as printed at `printed_at`.
#[must_use]
pub fn render_invoice(
    credit: &credit::Model,
    business: &BusinessInfo,
    printed_at: DateTime<Utc>,
) -> String {
    let name = business
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(DEFAULT_BUSINESS_NAME);

    let mut lines = vec![centered(name), String::new()];
    if let Some(phone) = business.phone.as_deref() {
        lines.push(centered(&format!("Tel: {phone}")));
    }
    if let Some(address) = business.address.as_deref() {
        lines.push(centered(address));
    }

    lines.extend([
        rule(),
        centered("CREDIT INVOICE"),
        rule(),
        String::new(),
        format!("Invoice No: {:06}", credit.id),
        format!("Date: {}", printed_at.format("%d/%m/%Y %H:%M")),
        String::new(),
        "CLIENT:".to_string(),
        format!("Name: {}", credit.client_name),
        format!("Phone: {}", credit.client_phone),
        format!("ID: {}", credit.client_card_id),
        String::new(),
        "CREDIT DETAILS:".to_string(),
        format!("Product: {}", credit.product_name),
        format!("Initial amount: {}", format_amount(credit.initial_amount)),
        format!("Interest rate: {}%", credit.interest_rate),
    ]);
    if credit.interest_amount > 0 {
        lines.push(format!("Interest: {}", format_amount(credit.interest_amount)));
    }
    lines.push(format!("TOTAL: {}", format_amount(credit.total_amount)));
    if let Some(count) = credit.num_payments.filter(|n| *n > 0) {
        lines.push(format!("Payments: {count}"));
    }
    if let Some(start) = credit.start_date_utc() {
        lines.push(format!("Start date: {}", format_day(start)));
    }
    if let Some(next) = credit.next_payment_date_utc() {
        lines.push(format!("Next payment: {}", format_day(next)));
    }

    lines.extend([
        String::new(),
        rule(),
        centered("Thank you for your trust!"),
        centered("Please pay on time"),
        rule(),
    ]);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
