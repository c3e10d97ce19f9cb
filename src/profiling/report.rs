//! Profile report rendering.
//!
//! The report is a fixed-width table of every recorded section, sorted by total
//! time, preceded by FPS statistics. [`write_report`] stamps it with the local time
//! and writes it under `profile-reports/`.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::data::{self, SectionMetrics};

const REPORT_DIR: &str = "profile-reports";

/// Column widths `(name, count, time)` for the section table.
fn column_widths(sections: &[(&String, &SectionMetrics)]) -> (usize, usize, usize) {
    let mut name_width = 20;
    let mut count_width = 6;
    let mut time_width = 12;
    for (name, metrics) in sections {
        name_width = name_width.max(name.len());
        count_width = count_width.max(metrics.count.to_string().len());
        time_width = time_width.max(format!("{:?}", metrics.total).len());
    }
    (name_width, count_width, time_width)
}

/// Renders the report body for the given sections and FPS statistics.
pub fn render_report(
    title: &str,
    sections: &HashMap<String, SectionMetrics>,
    fps: (f64, f64, f64),
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let (min_fps, avg_fps, max_fps) = fps;
    if avg_fps > 0.0 {
        let _ = writeln!(
            out,
            "FPS - Min: {min_fps:.1}, Average: {avg_fps:.1}, Max: {max_fps:.1}"
        );
    } else {
        let _ = writeln!(out, "FPS - no frame data recorded");
    }
    let _ = writeln!(out);

    if sections.is_empty() {
        let _ = writeln!(out, "No sections recorded");
        return out;
    }

    let mut sorted: Vec<_> = sections.iter().collect();
    sorted.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));
    let (name_w, count_w, time_w) = column_widths(&sorted);

    let _ = writeln!(
        out,
        "{:<name_w$} | {:>count_w$} | {:>time_w$} | {:>time_w$} | {:>time_w$} | {:>time_w$}",
        "Section", "Count", "Total", "Avg", "Min", "Max"
    );
    let _ = writeln!(out, "{}", "-".repeat(name_w + count_w + time_w * 4 + 15));
    for (name, m) in &sorted {
        let _ = writeln!(
            out,
            "{:<name_w$} | {:>count_w$} | {:>time_w$} | {:>time_w$} | {:>time_w$} | {:>time_w$}",
            name,
            m.count,
            format!("{:?}", m.total),
            format!("{:?}", m.average()),
            format!("{:?}", m.min),
            format!("{:?}", m.max),
        );
    }
    out
}

/// File name for a report generated at `now`.
pub fn report_file_name(now: &DateTime<Local>) -> String {
    format!("orrery-profile-{}.txt", now.format("%Y%m%d-%H%M%S"))
}

/// Writes the current measurements to `<dir>/orrery-profile-<timestamp>.txt`.
pub fn write_report_to(dir: &Path, source: &str) -> io::Result<PathBuf> {
    let now = Local::now();
    let body = {
        let data = data::lock();
        render_report(
            &format!(
                "Orrery profile ({source}) generated {}",
                now.format("%Y-%m-%d %H:%M:%S")
            ),
            data.sections(),
            data.frames().fps_stats(),
        )
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(&now));
    fs::write(&path, body)?;
    log::info!("profile report written to {}", path.display());
    Ok(path)
}

/// Writes the report to the default `profile-reports/` directory.
pub fn write_report(source: &str) -> io::Result<PathBuf> {
    write_report_to(Path::new(REPORT_DIR), source)
}
