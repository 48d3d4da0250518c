//! Console rendering of treasury reports.
//! Tables are laid out on plain text first and colored afterwards, so column
//! widths are never thrown off by escape codes.

use crate::address::Category;
use crate::report::{CategoryResult, TreasuryReport};
use crate::validation::ValidationError;
use colored::*;

const AMOUNT_WIDTH: usize = 18;

/// Formats a display-unit amount with two decimals and thousands separators.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

fn address_width(result: &CategoryResult) -> usize {
    result
        .results()
        .keys()
        .chain(result.failed().iter().map(|(address, _)| address))
        .map(|address| address.as_str().len())
        .max()
        .unwrap_or(0)
        .max("Address".len())
}

fn row(address: &str, width: usize, amounts: &[String], status: &str) -> String {
    let mut line = format!("{address:<width$}");
    for amount in amounts {
        line.push_str(&format!(" {amount:>AMOUNT_WIDTH$}"));
    }
    line.push_str(&format!("  {status}"));
    line
}

/// Renders the table of one category: a row per address, the TOTAL row and
/// the failed-address listing.
pub fn category_table(result: &CategoryResult) -> String {
    let category = result.category();
    let components = category.components();
    let width = address_width(result);

    let mut headers: Vec<String> = components.iter().map(|c| c.label().to_string()).collect();
    headers.push("Total".to_string());
    let header = row("Address", width, &headers, "Status");
    let rule = "-".repeat(header.len());

    let mut lines = vec![
        format!("{} ({} addresses)", category.label(), result.address_count())
            .bold()
            .bright_white()
            .to_string(),
        header.bold().to_string(),
        rule.clone(),
    ];

    for (address, holdings) in result.results() {
        let mut amounts: Vec<String> = components
            .iter()
            .map(|c| format_amount(holdings.get(*c)))
            .collect();
        amounts.push(format_amount(holdings.combined()));
        lines.push(row(address.as_str(), width, &amounts, &"✓".green().to_string()));
    }
    for (address, _) in result.failed() {
        let blanks = vec!["-".to_string(); components.len() + 1];
        lines.push(row(address.as_str(), width, &blanks, &"✗".red().to_string()));
    }

    lines.push(rule);
    let totals = result.totals();
    let mut amounts: Vec<String> = components
        .iter()
        .map(|c| format_amount(totals.get(*c)))
        .collect();
    amounts.push(format_amount(totals.combined));
    let status = format!("{}/{}", result.results().len(), result.address_count());
    lines.push(row("TOTAL", width, &amounts, &status).bold().to_string());

    if !result.failed().is_empty() {
        lines.push(String::new());
        lines.push(
            format!("Failed addresses ({}):", result.failed().len())
                .yellow()
                .bold()
                .to_string(),
        );
        for (address, reason) in result.failed() {
            lines.push(format!("  {} {address}: {reason}", "•".red()));
        }
    }
    lines.join("\n")
}

/// Renders the per-category totals and the grand total.
pub fn summary(report: &TreasuryReport) -> String {
    let label_width = Category::ALL
        .iter()
        .map(|c| c.label().len())
        .max()
        .unwrap_or(0)
        .max("GRAND TOTAL".len());

    let mut lines = vec!["Treasury Summary".bold().bright_white().to_string()];
    for (category, result) in report.categories() {
        let breakdown: Vec<String> = category
            .components()
            .iter()
            .map(|c| format!("{}: {}", c.label(), format_amount(result.totals().get(*c))))
            .collect();
        lines.push(format!(
            "  {:<label_width$} {:>AMOUNT_WIDTH$}  ({})",
            category.label(),
            format_amount(result.totals().combined),
            breakdown.join(", ")
        ));
    }
    lines.push(format!("  {}", "=".repeat(label_width + AMOUNT_WIDTH + 1)));
    lines.push(
        format!(
            "  {:<label_width$} {:>AMOUNT_WIDTH$}",
            "GRAND TOTAL",
            format_amount(report.grand_total())
        )
        .bold()
        .bright_green()
        .to_string(),
    );
    if report.failure_count() > 0 {
        lines.push(
            format!(
                "  {} address(es) failed and contributed 0 to the totals",
                report.failure_count()
            )
            .yellow()
            .to_string(),
        );
    }
    lines.join("\n")
}

pub fn print_category(result: &CategoryResult) {
    println!("\n{}", category_table(result));
}

pub fn print_report(report: &TreasuryReport) {
    for result in report.categories().values() {
        print_category(result);
    }
    println!("\n{}", summary(report));
    println!(
        "{}",
        format!(
            "Generated at {}",
            report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
        )
        .dimmed()
    );
}

pub fn print_validation_error(error: &ValidationError) {
    eprintln!("{} {error}", "Validation error:".red().bold());
    eprintln!("{}", "No queries were issued.".yellow());
}
