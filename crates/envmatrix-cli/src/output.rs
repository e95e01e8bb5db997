use envmatrix_core::table::{Matrix, MissingReport};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    out.push_str(header_row.join("  ").trim_end());
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&sep.join("  "));
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

pub fn print_matrix(matrix: &Matrix) {
    let mut headers = vec!["NAME"];
    headers.extend(matrix.columns.iter().map(String::as_str));
    let rows = matrix
        .rows
        .iter()
        .map(|r| {
            let mut row = Vec::with_capacity(r.cells.len() + 1);
            row.push(r.name.clone());
            row.extend(r.cells.iter().cloned());
            row
        })
        .collect();
    print_table(&headers, rows);
}

pub fn print_missing(reports: &[MissingReport]) {
    if reports.is_empty() {
        println!("All required variables are set in every source.");
        return;
    }
    for report in reports {
        println!("{} ({} missing)", report.column, report.names.len());
        for name in &report.names {
            println!("  {name}");
        }
    }
}
