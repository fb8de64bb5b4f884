use std::time::Duration;

use strata_enforce::engine::{ContractReport, Report};

/// Heading levels: 1 and 2 are over- and underlined, 3 is only underlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeadingLevel {
    One,
    Two,
    Three,
}

pub(crate) fn heading(out: &mut String, text: &str, level: HeadingLevel) {
    let (line_char, line_above) = match level {
        HeadingLevel::One => ('=', true),
        HeadingLevel::Two => ('-', true),
        HeadingLevel::Three => ('-', false),
    };
    let rule: String = std::iter::repeat(line_char).take(text.chars().count()).collect();
    if line_above {
        out.push_str(&rule);
        out.push('\n');
    }
    out.push_str(text);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");
}

/// ` (2 warnings)`, or nothing without warnings.
pub(crate) fn warning_text(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => " (1 warning)".to_string(),
        n => format!(" ({n} warnings)"),
    }
}

pub(crate) fn seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// `Name KEPT`, `Name BROKEN (1 warning) [0.12s]`.
pub(crate) fn result_line(contract: &ContractReport, show_timings: bool) -> String {
    let mut line = format!(
        "{} {}{}",
        contract.name,
        if contract.check.kept { "KEPT" } else { "BROKEN" },
        warning_text(contract.check.warnings.len())
    );
    if show_timings {
        line.push_str(&format!(" [{}]", seconds(contract.duration)));
    }
    line
}

pub(crate) fn could_not_run(out: &mut String, report: &Report) {
    for (name, errors) in &report.invalid_options {
        out.push_str(&format!("Contract \"{name}\" is not configured correctly:\n"));
        for error in errors {
            out.push_str(&format!("    {}: {}\n", error.field, error.message));
        }
    }
}

pub(crate) fn warnings(out: &mut String, report: &Report) {
    heading(out, "Warnings", HeadingLevel::Two);
    let mut first = true;
    for contract in report.contracts.iter().filter(|c| !c.check.warnings.is_empty()) {
        if !first {
            out.push('\n');
        }
        first = false;
        heading(out, &contract.name, HeadingLevel::Three);
        for warning in &contract.check.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }
}

pub(crate) fn broken_contracts(out: &mut String, report: &Report) {
    heading(out, "Broken contracts", HeadingLevel::Two);
    for contract in report.contracts.iter().filter(|c| !c.check.kept) {
        heading(out, &contract.name, HeadingLevel::Three);
        for line in &contract.broken_lines {
            out.push_str(line);
            out.push('\n');
        }
    }
}
