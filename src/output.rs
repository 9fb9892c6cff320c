//! Terminal rendering for CLI results
//!
//! Everything writes to a caller-supplied writer so the same code serves
//! stdout and tests.

use serde::Serialize;
use std::io::{self, Write};

use crate::models::{ChartData, CsvFile, DashboardData, Report, ReportSummary, UserProfile};

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Pretty-printed JSON
pub fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

pub fn write_user(out: &mut impl Write, user: &UserProfile) -> io::Result<()> {
    writeln!(out, "{} <{}>", user.display_name(), user.email)?;
    writeln!(out, "  username: {}", user.username)?;
    if let Some(company) = &user.company {
        writeln!(out, "  company:  {}", company)?;
    }
    if let Some(position) = &user.position {
        writeln!(out, "  position: {}", position)?;
    }
    writeln!(out, "  member since {}", user.created_at.format("%Y-%m-%d"))
}

pub fn write_files(out: &mut impl Write, files: &[CsvFile], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &files),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["id", "name", "status", "uploaded"])?;
            for file in files {
                writer.write_record([
                    file.id.to_string(),
                    file.original_name.clone(),
                    file.status.to_string(),
                    file.created_at.to_rfc3339(),
                ])?;
            }
            writer.flush()
        }
        OutputFormat::Table => {
            if files.is_empty() {
                return writeln!(out, "No files uploaded yet");
            }

            writeln!(out, "{:<6} | {:<32} | {:<10} | {}", "ID", "Name", "Status", "Uploaded")?;
            writeln!(out, "{}", "-".repeat(72))?;
            for file in files {
                writeln!(
                    out,
                    "{:<6} | {:<32} | {:<10} | {}",
                    file.id,
                    truncate(&file.original_name, 32),
                    file.status,
                    file.created_at.format("%Y-%m-%d %H:%M")
                )?;
            }
            Ok(())
        }
    }
}

pub fn write_reports(
    out: &mut impl Write,
    reports: &[ReportSummary],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &reports),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["id", "file", "total_sales", "records", "created"])?;
            for report in reports {
                writer.write_record([
                    report.id.to_string(),
                    report.csv_file.original_name.clone(),
                    report.total_sales.clone().unwrap_or_default(),
                    report.total_records.to_string(),
                    report.created_at.to_rfc3339(),
                ])?;
            }
            writer.flush()
        }
        OutputFormat::Table => {
            if reports.is_empty() {
                return writeln!(out, "No reports yet");
            }

            writeln!(
                out,
                "{:<6} | {:<28} | {:>14} | {:>8} | {}",
                "ID", "File", "Total sales", "Records", "Created"
            )?;
            writeln!(out, "{}", "-".repeat(80))?;
            for report in reports {
                writeln!(
                    out,
                    "{:<6} | {:<28} | {:>14} | {:>8} | {}",
                    report.id,
                    truncate(&report.csv_file.original_name, 28),
                    money(report.total_sales_value()),
                    report.total_records,
                    report.created_at.format("%Y-%m-%d")
                )?;
            }
            Ok(())
        }
    }
}

pub fn write_dashboard(
    out: &mut impl Write,
    dashboard: &DashboardData,
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, dashboard);
    }

    let stats = &dashboard.statistics;
    if format == OutputFormat::Csv {
        let mut writer = csv::Writer::from_writer(&mut *out);
        writer.write_record(["metric", "value"])?;
        for (name, value) in [
            ("total_files", stats.total_files.to_string()),
            ("total_reports", stats.total_reports.to_string()),
            ("completed_files", stats.completed_files.to_string()),
            ("processing_files", stats.processing_files.to_string()),
            ("error_files", stats.error_files.to_string()),
            ("total_sales", format!("{:.2}", stats.total_sales)),
            ("total_records", stats.total_records.to_string()),
        ] {
            writer.write_record([name, value.as_str()])?;
        }
        return writer.flush();
    }

    writeln!(
        out,
        "Files:    {} ({} completed, {} processing, {} failed)",
        stats.total_files, stats.completed_files, stats.processing_files, stats.error_files
    )?;
    writeln!(out, "Reports:  {}", stats.total_reports)?;
    writeln!(out, "Sales:    {}", money(Some(stats.total_sales)))?;
    writeln!(out, "Records:  {}", stats.total_records)?;

    if !dashboard.recent_reports.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recent reports")?;
        write_reports(out, &dashboard.recent_reports, OutputFormat::Table)?;
    }
    Ok(())
}

/// Full report; in CSV mode each chart series becomes `series,label,value` rows
pub fn write_report(out: &mut impl Write, report: &Report, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["series", "label", "value"])?;
            for (name, chart) in chart_series(report) {
                for (label, value) in chart.points() {
                    writer.write_record([name, label, value.to_string().as_str()])?;
                }
            }
            for trend in &report.monthly_trends {
                writer.write_record([
                    "monthly_trends",
                    trend.month.as_str(),
                    trend.sales.to_string().as_str(),
                ])?;
            }
            writer.flush()
        }
        OutputFormat::Table => {
            writeln!(out, "Report #{} - {}", report.id, report.csv_file.original_name)?;
            writeln!(out, "  status:      {}", report.csv_file.status)?;
            writeln!(out, "  total sales: {}", money(report.total_sales_value()))?;
            writeln!(out, "  records:     {}", report.total_records)?;
            if let (Some(start), Some(end)) = (report.date_range_start, report.date_range_end) {
                writeln!(out, "  period:      {} .. {}", start, end)?;
            }
            if let Some(url) = &report.pdf_url {
                writeln!(out, "  pdf:         {}", url)?;
            }

            for (name, chart) in chart_series(report) {
                if chart.is_empty() {
                    continue;
                }
                writeln!(out)?;
                writeln!(out, "{}", name.replace('_', " "))?;
                for (label, value) in chart.points() {
                    writeln!(out, "  {:<24} {:>14}", truncate(label, 24), money(Some(value)))?;
                }
            }

            if !report.monthly_trends.is_empty() {
                writeln!(out)?;
                writeln!(out, "monthly trends")?;
                for trend in &report.monthly_trends {
                    writeln!(
                        out,
                        "  {:<10} {:>14} {:>+8.1}%",
                        trend.month,
                        money(Some(trend.sales)),
                        trend.growth
                    )?;
                }
            }

            let insights = report.insights();
            if !insights.is_empty() {
                writeln!(out)?;
                writeln!(out, "insights")?;
                for line in insights {
                    writeln!(out, "  {}", line)?;
                }
            }
            Ok(())
        }
    }
}

fn chart_series(report: &Report) -> [(&'static str, &ChartData); 3] {
    [
        ("top_products", &report.top_products),
        ("sales_by_region", &report.sales_by_region),
        ("sales_by_date", &report.sales_by_date),
    ]
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Report {
        serde_json::from_value(json!({
            "id": 2,
            "csv_file": {
                "id": 1,
                "original_name": "ventas.csv",
                "status": "completed",
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-01T10:00:05Z"
            },
            "total_sales": "1250.50",
            "total_records": 2,
            "top_products": {"labels": ["Laptop", "Mouse"], "data": [1200.0, 50.5]},
            "monthly_trends": [{"month": "2024-01", "sales": 1250.5, "growth": 0.0}],
            "auto_insights": "Laptop leads sales.",
            "created_at": "2024-03-01T10:00:06Z",
            "updated_at": "2024-03-01T10:00:06Z"
        }))
        .unwrap()
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_report_table() {
        let text = render(|out| write_report(out, &report(), OutputFormat::Table));
        assert!(text.contains("Report #2 - ventas.csv"));
        assert!(text.contains("1250.50"));
        assert!(text.contains("top products"));
        assert!(!text.contains("sales by region"));
        assert!(text.contains("Laptop leads sales."));
    }

    #[test]
    fn test_report_csv_series() {
        let text = render(|out| write_report(out, &report(), OutputFormat::Csv));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "series,label,value");
        assert_eq!(lines[1], "top_products,Laptop,1200");
        assert_eq!(lines[2], "top_products,Mouse,50.5");
        assert_eq!(lines[3], "monthly_trends,2024-01,1250.5");
    }

    #[test]
    fn test_empty_file_list() {
        let text = render(|out| write_files(out, &[], OutputFormat::Table));
        assert_eq!(text.trim(), "No files uploaded yet");

        let text = render(|out| write_files(out, &[], OutputFormat::Json));
        assert_eq!(text.trim(), "[]");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.csv", 32), "short.csv");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
