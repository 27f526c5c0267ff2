//! Processing report generation.
//!
//! Summarises one pass over a run tree as Markdown or JSON: what was found,
//! which sweeps were written where, and which files had to be skipped.

use crate::models::{ConfigurationReport, Report, ReportMetadata, SkippedFile};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# mrstat Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_configurations_section(&report.configurations));
    output.push_str(&generate_skipped_section(&report.skipped));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Run Tree:** `{}`\n", metadata.root.display()));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Runs Found:** {}\n", metadata.runs_found));
    section.push_str(&format!(
        "- **Runs Processed:** {}\n",
        metadata.runs_processed
    ));
    if metadata.files_skipped > 0 {
        section.push_str(&format!(
            "- **Files Skipped:** {}\n",
            metadata.files_skipped
        ));
    }
    section.push_str(&format!(
        "- **Sweeps Written:** {}\n",
        metadata.sweeps_emitted
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Configurations](#configurations)\n");
    if !report.skipped.is_empty() {
        toc.push_str("- [Skipped Files](#skipped-files)\n");
    }
    toc.push('\n');

    toc
}

/// Generate the configurations section.
fn generate_configurations_section(configurations: &[ConfigurationReport]) -> String {
    let mut section = String::new();

    section.push_str("## Configurations\n\n");

    if configurations.is_empty() {
        section.push_str("No configurations with usable data were found.\n\n");
        return section;
    }

    section.push_str("| N | T_creation | T_sample | Fields | Critical h_x | Sweeps | Output |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---|:---|\n");

    for entry in configurations {
        let sweeps = if entry.sweeps.is_empty() {
            "-".to_string()
        } else {
            entry.sweeps.join(", ")
        };
        let critical = entry
            .critical_field
            .map(|h_x| h_x.to_string())
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | `{}` |\n",
            entry.configuration.n,
            entry.configuration.t_creation,
            entry.configuration.t_sample,
            entry.fields,
            critical,
            sweeps,
            entry.output_dir.display()
        ));
    }
    section.push('\n');

    section
}

/// Generate the skipped files section.
fn generate_skipped_section(skipped: &[SkippedFile]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Skipped Files\n\n");
    section.push_str("| File | Reason |\n");
    section.push_str("|:---|:---|\n");
    for file in skipped {
        section.push_str(&format!(
            "| `{}` | {} |\n",
            file.path.display(),
            file.reason.replace('|', "\\|")
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by mrstat v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
