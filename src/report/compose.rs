/*!
 * Report text composed from stored data, without a language model.
 *
 * The output uses the same `###` heading and `**` emphasis markup as the
 * AI-written reports so both go through the same formatter.
 */

use std::fmt::Write as _;

use super::inline::EMPHASIS_DELIMITER;
use super::splitter::HEADING_MARKER;
use crate::database::models::{DeliverableStatus, EventDetails};

/// Format an amount as `$12,345.60`, with a leading minus for negatives.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Make stored text safe to embed in report markup.
///
/// Line breaks collapse into single spaces, `**` runs shrink to one `*`, and
/// a leading `###` is prefixed with a backslash so it stays body text.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = text
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    while escaped.contains(EMPHASIS_DELIMITER) {
        escaped = escaped.replace(EMPHASIS_DELIMITER, "*");
    }
    if escaped.starts_with(HEADING_MARKER) {
        escaped.insert(0, '\\');
    }
    escaped
}

/// Compose the event report text from an event, its suppliers and deliverables.
pub fn compose_report_text(details: &EventDetails) -> String {
    let event = &details.event;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "### Event: {}", escape_markup(&event.name));
    let _ = writeln!(out, "Date: **{}**", event.date);
    if !event.location.is_empty() {
        let _ = writeln!(out, "Location: {}", escape_markup(&event.location));
    }
    let _ = writeln!(out, "Status: **{}**", event.status);
    if !event.description.is_empty() {
        let _ = writeln!(out, "{}", escape_markup(&event.description));
    }

    out.push('\n');
    let _ = writeln!(out, "### Budget");
    let _ = writeln!(out, "Event budget: **{}**", format_currency(event.budget));
    let _ = writeln!(
        out,
        "Allocated to suppliers: **{}**",
        format_currency(details.total_supplier_budget())
    );
    let remaining = details.remaining_budget();
    if remaining < 0.0 {
        let _ = writeln!(out, "Over budget by: **{}**", format_currency(-remaining));
    } else {
        let _ = writeln!(out, "Remaining: **{}**", format_currency(remaining));
    }
    let _ = writeln!(
        out,
        "Supplier completion: **{}%**",
        details.completion_rate().round()
    );

    out.push('\n');
    let _ = writeln!(out, "### Suppliers");
    if details.suppliers.is_empty() {
        let _ = writeln!(out, "No suppliers assigned.");
    }
    for assigned in &details.suppliers {
        let supplier = &assigned.supplier;
        let specialization = if supplier.specialization.is_empty() {
            String::new()
        } else {
            format!(" ({})", escape_markup(&supplier.specialization))
        };
        let _ = writeln!(
            out,
            "**{}**{} - {} - {}",
            escape_markup(&supplier.name),
            specialization,
            assigned.assignment.status,
            format_currency(assigned.assignment.allocated_budget)
        );

        for deliverable in details.deliverables_for(supplier.id) {
            let _ = writeln!(
                out,
                "- {} x{}: {}, {} ({}%)",
                escape_markup(&deliverable.item_name),
                deliverable.quantity,
                format_currency(deliverable.total_value),
                deliverable.current_status,
                deliverable.progress_percentage
            );
        }
    }

    out.push('\n');
    let _ = writeln!(out, "### Deliverables");
    let _ = writeln!(
        out,
        "Total value: **{}** across {} items",
        format_currency(details.total_deliverable_value()),
        details.deliverables.len()
    );

    let delayed: Vec<_> = details
        .deliverables
        .iter()
        .filter(|d| d.current_status == DeliverableStatus::Delayed)
        .collect();
    if delayed.is_empty() {
        let _ = write!(out, "No delays reported.");
    } else {
        let _ = write!(out, "Delayed: **{}**", delayed.len());
        for deliverable in delayed {
            let reason = deliverable
                .delay_reasons
                .as_deref()
                .map(escape_markup)
                .unwrap_or_else(|| "no reason given".to_string());
            let _ = write!(out, "\n- {}: {}", escape_markup(&deliverable.item_name), reason);
        }
    }

    out
}
