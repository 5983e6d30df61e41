use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::Settings;
use crate::core::lookup::MatchReport;
use crate::error::SheetResult;
use crate::service::{self, ConcatJob, JobReport, PivotJob, VlookupJob};

/// Execute the sheets command
pub fn sheets(settings: &Settings, file: PathBuf) -> SheetResult<()> {
    println!("{}", "📄 Sheetwise - Worksheets".bold().green());
    println!("   File: {}\n", file.display());

    let names = service::list_sheets(settings, &file)?;
    for (idx, name) in names.iter().enumerate() {
        println!("   {} {}", format!("{:>2}.", idx + 1).dimmed(), name.bright_blue());
    }
    println!();
    Ok(())
}

/// Execute the columns command
pub fn columns(settings: &Settings, file: PathBuf, sheet: Option<String>) -> SheetResult<()> {
    println!("{}", "📋 Sheetwise - Columns".bold().green());
    println!("   File: {}", file.display());
    if let Some(ref s) = sheet {
        println!("   Sheet: {}", s.bright_yellow());
    }
    println!();

    let info = service::column_info(settings, &file, sheet.as_deref())?;
    if info.headers.is_empty() {
        println!("{}", "   (empty sheet)".yellow());
    }
    for (letter, header) in info.columns.iter().zip(&info.headers) {
        println!("   {:>4}  {}", letter.bold().cyan(), header);
    }
    println!();
    Ok(())
}

/// Execute the vlookup command
pub fn vlookup(settings: &Settings, job: VlookupJob, verbose: bool) -> SheetResult<()> {
    println!("{}", "🔗 Sheetwise - VLOOKUP".bold().green());
    println!("   Main:   {}", describe(&job.main_file, job.main_sheet.as_deref()));
    println!("   Lookup: {}", describe(&job.lookup_file, job.lookup_sheet.as_deref()));
    println!();

    let report = service::run_vlookup(settings, &job)?;
    if let Some(ref stats) = report.match_report {
        print_match_report(stats, verbose);
    }
    print_report(&report);
    Ok(())
}

/// Execute the pivot command
pub fn pivot(settings: &Settings, job: PivotJob, verbose: bool) -> SheetResult<()> {
    println!("{}", "📊 Sheetwise - Pivot".bold().green());
    println!("   Source: {}", describe(&job.file, job.sheet.as_deref()));
    if verbose {
        let rows: Vec<String> = job.request.rows.iter().map(|c| c.to_string()).collect();
        let cols: Vec<String> = job.request.cols.iter().map(|c| c.to_string()).collect();
        let values: Vec<String> = job
            .request
            .values
            .iter()
            .map(|v| format!("{}:{}", v.column, v.aggfunc))
            .collect();
        println!("   Rows:   {}", rows.join(", ").cyan());
        if !cols.is_empty() {
            println!("   Cols:   {}", cols.join(", ").cyan());
        }
        println!("   Values: {}", values.join(", ").cyan());
    }
    println!();

    let report = service::run_pivot(settings, &job)?;
    print_report(&report);
    Ok(())
}

/// Execute the concat command
pub fn concat(settings: &Settings, job: ConcatJob) -> SheetResult<()> {
    println!("{}", "🧩 Sheetwise - Concatenate".bold().green());
    println!("   Source: {}\n", describe(&job.file, job.sheet.as_deref()));

    let report = service::run_concatenate(settings, &job)?;
    print_report(&report);
    Ok(())
}

fn describe(file: &Path, sheet: Option<&str>) -> String {
    match sheet {
        Some(s) => format!("{} [{}]", file.display(), s),
        None => file.display().to_string(),
    }
}

fn print_match_report(stats: &MatchReport, verbose: bool) {
    let rate = format!("{:.1}%", stats.match_rate());
    let rate = if stats.matched == stats.total {
        rate.bold().green()
    } else {
        rate.bold().yellow()
    };
    println!("   Matched: {}/{} ({})", stats.matched, stats.total, rate);
    if verbose && !stats.unmatched_examples.is_empty() {
        println!("   Unmatched keys ({} distinct):", stats.unmatched_distinct);
        for key in &stats.unmatched_examples {
            println!("      {}", key.red());
        }
    }
}

fn print_report(report: &JobReport) {
    println!("{}", format!("✅ {}", report.message).bold().green());
    println!("   Rows written: {}", report.rows);
    println!("   Output: {}", report.output_path.display().to_string().bright_blue());
    println!();
}
