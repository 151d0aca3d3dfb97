/*!
 * Prompt construction for AI-written event reports.
 *
 * The user prompt carries the event data as pretty JSON so the model sees
 * exact figures; the system prompt comes from the configuration and fixes the
 * `###` / `**` markup the formatter understands.
 */

use serde::Serialize;

use crate::app_config::GenerationCommonConfig;
use crate::database::models::EventDetails;
use crate::providers::CompletionRequest;

/// Sections the model is asked to write, in order.
pub const REPORT_SECTIONS: [&str; 5] = [
    "Event Overview",
    "Budget",
    "Supplier Status",
    "Deliverables",
    "Risks and Delays",
];

/// Builder for the report generation prompt.
#[derive(Debug, Clone)]
pub struct ReportPromptBuilder<'a> {
    details: &'a EventDetails,
    custom_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    task: &'static str,
    sections: &'static [&'static str],
    event: EventContext<'a>,
    budget: BudgetContext,
    suppliers: Vec<SupplierContext<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct EventContext<'a> {
    name: &'a str,
    date: String,
    location: &'a str,
    status: String,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct BudgetContext {
    event_budget: f64,
    allocated_to_suppliers: f64,
    remaining: f64,
    completion_rate_percent: f64,
}

#[derive(Debug, Serialize)]
struct SupplierContext<'a> {
    name: &'a str,
    specialization: &'a str,
    assignment_status: String,
    allocated_budget: f64,
    performance: u8,
    deliverables: Vec<DeliverableContext<'a>>,
}

#[derive(Debug, Serialize)]
struct DeliverableContext<'a> {
    item: &'a str,
    quantity: u32,
    total_value: f64,
    status: String,
    progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_delivery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_reasons: Option<&'a str>,
}

impl<'a> ReportPromptBuilder<'a> {
    pub fn new(details: &'a EventDetails) -> Self {
        Self {
            details,
            custom_instructions: None,
        }
    }

    /// Extra instructions appended to the request
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        let trimmed = instructions.trim();
        self.custom_instructions = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Build the user prompt as a JSON request.
    pub fn build_user_prompt(&self) -> String {
        let details = self.details;
        let event = &details.event;

        let suppliers = details
            .suppliers
            .iter()
            .map(|assigned| SupplierContext {
                name: &assigned.supplier.name,
                specialization: &assigned.supplier.specialization,
                assignment_status: assigned.assignment.status.to_string(),
                allocated_budget: assigned.assignment.allocated_budget,
                performance: assigned.assignment.performance,
                deliverables: details
                    .deliverables_for(assigned.supplier.id)
                    .into_iter()
                    .map(|d| DeliverableContext {
                        item: &d.item_name,
                        quantity: d.quantity,
                        total_value: d.total_value,
                        status: d.current_status.to_string(),
                        progress_percent: d.progress_percentage,
                        scheduled_delivery: d.scheduled_delivery_date.map(|date| date.to_string()),
                        delay_reasons: d.delay_reasons.as_deref(),
                    })
                    .collect(),
            })
            .collect();

        let request = ReportRequest {
            task: "write_event_supplier_report",
            sections: &REPORT_SECTIONS,
            event: EventContext {
                name: &event.name,
                date: event.date.to_string(),
                location: &event.location,
                status: event.status.to_string(),
                description: &event.description,
            },
            budget: BudgetContext {
                event_budget: event.budget,
                allocated_to_suppliers: details.total_supplier_budget(),
                remaining: details.remaining_budget(),
                completion_rate_percent: details.completion_rate().round(),
            },
            suppliers,
            instructions: self.custom_instructions.as_deref(),
        };

        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build the full completion request with the configured system prompt
    pub fn build(&self, common: &GenerationCommonConfig) -> CompletionRequest {
        CompletionRequest::new(self.build_user_prompt())
            .system(common.system_prompt.clone())
            .temperature(common.temperature)
            .max_tokens(common.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::compose::tests::sample_details;

    #[test]
    fn test_buildUserPrompt_shouldCarryEventFigures() {
        let details = sample_details();
        let prompt = ReportPromptBuilder::new(&details).build_user_prompt();
        let json: serde_json::Value = serde_json::from_str(&prompt).unwrap();

        assert_eq!(json["event"]["name"], "Summer Gala");
        assert_eq!(json["budget"]["allocated_to_suppliers"], 7000.0);
        assert_eq!(json["suppliers"][0]["deliverables"][0]["item"], "Stage lighting");
        assert_eq!(json["sections"].as_array().unwrap().len(), REPORT_SECTIONS.len());
        assert!(json.get("instructions").is_none());
    }

    #[test]
    fn test_build_shouldUseConfiguredSystemPrompt() {
        let details = sample_details();
        let common = GenerationCommonConfig::default();
        let request = ReportPromptBuilder::new(&details)
            .with_custom_instructions("  Keep it short ")
            .build(&common);

        assert_eq!(request.system.as_deref(), Some(common.system_prompt.as_str()));
        assert_eq!(request.max_tokens, common.max_tokens);
        assert!(request.prompt.contains("\"instructions\": \"Keep it short\""));
    }
}
