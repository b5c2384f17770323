//! Rendering for the configured-endpoints listing.

use crate::environment::PegEndpoint;

const HEADERS: [&str; 3] = ["Constant Name", "Target IP", "Target Port"];

/// Renders the endpoint listing as a column-aligned table.
///
/// Returns one header line followed by one line per endpoint. Callers are
/// expected to emit a notice instead when the slice is empty.
#[must_use]
pub fn render_endpoint_table(endpoints: &[PegEndpoint]) -> String {
    let rows: Vec<[String; 3]> = endpoints
        .iter()
        .map(|endpoint| {
            [
                endpoint.constant_name.clone(),
                endpoint.target_ip.clone(),
                endpoint.target_port.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut table = String::new();
    push_row(&mut table, &HEADERS.map(str::to_owned), &widths);
    for row in &rows {
        push_row(&mut table, row, &widths);
    }
    table
}

fn push_row(table: &mut String, cells: &[String; 3], widths: &[usize; 3]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("   ");
    table.push_str(line.trim_end());
    table.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns_to_the_widest_cell() {
        let endpoints = vec![
            PegEndpoint {
                constant_name: String::from("PANTHEON_SOIP_FOO"),
                target_ip: String::from("10.0.0.12"),
                target_port: 3306,
            },
            PegEndpoint {
                constant_name: String::from("PANTHEON_SOIP_DIRECTORY"),
                target_ip: String::from("192.168.4.1"),
                target_port: 636,
            },
        ];

        let table = render_endpoint_table(&endpoints);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        let header = lines.first().expect("header line");
        assert!(header.starts_with("Constant Name"), "header: {header}");
        assert!(header.contains("Target IP"), "header: {header}");
        assert!(header.contains("Target Port"), "header: {header}");
        let ip_column = header.find("Target IP").expect("ip column");
        for line in &lines {
            assert!(line.len() >= ip_column, "short line: {line}");
        }
        assert!(
            lines
                .iter()
                .skip(1)
                .any(|line| line.contains("PANTHEON_SOIP_FOO")),
            "table: {table}"
        );
    }

    #[test]
    fn empty_listing_renders_headers_only() {
        let table = render_endpoint_table(&[]);
        assert_eq!(table.lines().count(), 1);
    }
}
