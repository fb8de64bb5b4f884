use crate::human_helpers::{
    broken_contracts, could_not_run, heading, result_line, seconds, warnings, HeadingLevel,
};
use crate::OutputFormatter;
use strata_enforce::engine::Report;

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_report(&self, report: &Report) -> String {
        let mut out = String::new();
        if report.could_not_run() {
            could_not_run(&mut out, report);
            if report.contracts.is_empty() {
                return out;
            }
            out.push('\n');
        }

        if report.show_timings {
            out.push_str(&format!(
                "Building graph took {}.\n\n",
                seconds(report.graph_building_duration)
            ));
        }

        heading(&mut out, "Contracts", HeadingLevel::Two);
        heading(
            &mut out,
            &format!(
                "Analyzed {} files, {} dependencies.",
                report.module_count, report.import_count
            ),
            HeadingLevel::Three,
        );
        for contract in &report.contracts {
            out.push_str(&result_line(contract, report.show_timings));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&format!(
            "Contracts: {} kept, {} broken.\n",
            report.kept_count(),
            report.broken_count()
        ));

        if report.warnings_count() > 0 {
            out.push('\n');
            warnings(&mut out, report);
        }
        if report.broken_count() > 0 {
            out.push_str("\n\n");
            broken_contracts(&mut out, report);
        }
        out
    }

    fn format_contract_types(&self, type_names: &[&str]) -> String {
        let mut out = String::new();
        heading(&mut out, "Contract types", HeadingLevel::Two);
        for name in type_names {
            out.push_str(&format!("- {name}\n"));
        }
        out
    }
}
