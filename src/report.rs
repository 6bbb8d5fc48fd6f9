//! HTML documents for export. Rendering to PDF and sharing happen elsewhere;
//! nothing here touches the network or the cache.

use std::fmt::Write;

use crate::amount::format_money;
use crate::domain::Dataset;
use crate::stats::NOT_AVAILABLE;

const STYLE: &str = "body { font-family: Helvetica, Arial, sans-serif; margin: 24px; }\n\
h1 { font-size: 22px; }\n\
h2 { font-size: 18px; margin-top: 28px; }\n\
table { width: 100%; border-collapse: collapse; margin-bottom: 16px; }\n\
th, td { border: 1px solid #c1c0b9; padding: 6px 8px; font-size: 11px; text-align: left; }\n\
tr.header th { background-color: #000000; color: #ffffff; font-size: 13px; }\n\
tr.empty td { color: #7f7f7f; font-style: italic; }\n";

/// Σ income − Σ expenses over the primary column, or `N/A` when either side
/// is missing.
pub fn net_income(income: Option<&Dataset>, expenses: Option<&Dataset>) -> String {
    match (income, expenses) {
        (Some(income), Some(expenses)) => {
            format_money(income.primary_total() - expenses.primary_total())
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn table_document(dataset: Option<&Dataset>, title: &str) -> String {
    wrap_document(title, &table_fragment(dataset, title))
}

pub fn financial_statement_document(
    income: Option<&Dataset>,
    expenses: Option<&Dataset>,
    assets: Option<&Dataset>,
    liabilities: Option<&Dataset>,
) -> String {
    let mut body = String::new();
    body.push_str(&table_fragment(income, "Income"));
    body.push_str(&table_fragment(expenses, "Expenses"));
    let _ = writeln!(
        body,
        "<h2 class=\"net-income\">Net Income: {}</h2>",
        escape(&net_income(income, expenses))
    );
    body.push_str(&table_fragment(assets, "Assets"));
    body.push_str(&table_fragment(liabilities, "Liabilities"));
    wrap_document("Financial Statement", &body)
}

fn table_fragment(dataset: Option<&Dataset>, title: &str) -> String {
    let width = dataset.map(Dataset::width).unwrap_or(0).max(1);
    let mut out = String::new();
    out.push_str("<table>\n");
    let _ = writeln!(
        out,
        "<tr class=\"header\"><th colspan=\"{width}\">{}</th></tr>",
        escape(title)
    );
    match dataset.filter(|dataset| !dataset.is_empty()) {
        Some(dataset) => {
            for row in &dataset.rows {
                out.push_str("<tr>");
                for idx in 0..width {
                    let cell = row.get(idx).map(String::as_str).unwrap_or("");
                    let _ = write!(out, "<td>{}</td>", escape(cell));
                }
                out.push_str("</tr>\n");
            }
        }
        None => {
            let _ = writeln!(
                out,
                "<tr class=\"empty\"><td colspan=\"{width}\">No data available</td></tr>"
            );
        }
    }
    out.push_str("</table>\n");
    out
}

fn wrap_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\n{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(title)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_cells() {
        assert_eq!(escape("R&D <ops>"), "R&amp;D &lt;ops&gt;");
    }

    #[test]
    fn ragged_rows_are_padded() {
        let dataset = Dataset::new(
            "assets".parse().unwrap(),
            vec![
                vec!["Cash".to_string(), "10".to_string(), "note".to_string()],
                vec!["Stock".to_string()],
            ],
        );
        let html = table_fragment(Some(&dataset), "Assets");
        assert!(html.contains("colspan=\"3\""));
        assert!(html.contains("<tr><td>Stock</td><td></td><td></td></tr>"));
    }
}
