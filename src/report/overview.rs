/*!
 * All-events overview report text.
 */

use std::fmt::Write as _;

use super::compose::{escape_markup, format_currency};
use crate::database::models::{EventDetails, Overview};

/// Render the overall statistics followed by one section per event.
pub fn render_overview_text(overview: &Overview, events: &[EventDetails]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "### Overall Statistics");
    let _ = writeln!(out, "Total events: **{}**", overview.total_events);
    let _ = writeln!(out, "Total suppliers: **{}**", overview.total_suppliers);
    let _ = writeln!(out, "Total budget: **{}**", format_currency(overview.total_budget));
    let _ = write!(out, "Average completion: **{}%**", overview.average_completion);

    for details in events {
        let event = &details.event;
        out.push_str("\n\n");
        let _ = writeln!(out, "### {}", escape_markup(&event.name));
        if !event.description.is_empty() {
            let _ = writeln!(out, "{}", escape_markup(&event.description));
        }
        let _ = writeln!(out, "Status: **{}**", event.status);
        let _ = writeln!(out, "Date: {}", event.date);
        let _ = writeln!(out, "Location: {}", escape_markup(&event.location));
        let _ = write!(out, "Budget: {}", format_currency(event.budget));

        let _ = write!(out, "\nSuppliers ({})", details.suppliers.len());
        for assigned in &details.suppliers {
            let _ = write!(
                out,
                "\n- **{}** - {}",
                escape_markup(&assigned.supplier.name),
                assigned.assignment.status
            );
        }
    }

    out
}
