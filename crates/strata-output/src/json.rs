use serde_json::{json, Value};

use crate::OutputFormatter;
use strata_enforce::engine::{ContractReport, Report};

pub struct JsonFormatter;

fn contract_value(contract: &ContractReport) -> Value {
    json!({
        "id": contract.id,
        "name": contract.name,
        "type": contract.type_name,
        "kept": contract.check.kept,
        "warnings": contract.check.warnings,
        "metadata": contract.check.metadata,
        "duration_ms": contract.duration.as_millis() as u64,
    })
}

impl JsonFormatter {
    pub fn report_value(report: &Report) -> Value {
        let invalid_options: serde_json::Map<String, Value> = report
            .invalid_options
            .iter()
            .map(|(name, errors)| {
                let fields: serde_json::Map<String, Value> = errors
                    .iter()
                    .map(|e| (e.field.clone(), Value::String(e.message.clone())))
                    .collect();
                (name.clone(), Value::Object(fields))
            })
            .collect();
        json!({
            "passed": report.passed(),
            "module_count": report.module_count,
            "import_count": report.import_count,
            "kept_count": report.kept_count(),
            "broken_count": report.broken_count(),
            "warnings_count": report.warnings_count(),
            "graph_building_duration_ms": report.graph_building_duration.as_millis() as u64,
            "invalid_options": invalid_options,
            "contracts": report.contracts.iter().map(contract_value).collect::<Vec<_>>(),
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> String {
        serde_json::to_string_pretty(&Self::report_value(report)).unwrap_or_default()
    }

    fn format_contract_types(&self, type_names: &[&str]) -> String {
        serde_json::to_string_pretty(&json!({ "contract_types": type_names })).unwrap_or_default()
    }
}
