use bizdash::domain::Dataset;
use bizdash::report::{financial_statement_document, net_income, table_document};

fn dataset(name: &str, pairs: &[(&str, &str)]) -> Dataset {
    Dataset::new(
        name.parse().unwrap(),
        pairs
            .iter()
            .map(|(label, value)| vec![label.to_string(), value.to_string()])
            .collect(),
    )
}

#[test]
fn net_income_subtracts_expenses_from_income() {
    let income = dataset("income", &[("Rooms", "100"), ("Bar", "50")]);
    let expenses = dataset("expenses", &[("Staff", "30")]);

    assert_eq!(net_income(Some(&income), Some(&expenses)), "120.00");
}

#[test]
fn net_income_groups_thousands_and_treats_invalid_as_zero() {
    let income = dataset("income", &[("Rooms", "N$12,500.75"), ("Bar", "closed")]);
    let expenses = dataset("expenses", &[("Staff", "1,000.5"), ("Rent", "")]);

    assert_eq!(net_income(Some(&income), Some(&expenses)), "11,500.25");
}

#[test]
fn net_income_keeps_sign_of_currency_prefixed_refund() {
    let income = dataset("income", &[("Rooms", "100"), ("Refund", "-N$40.00")]);
    let expenses = dataset("expenses", &[("Staff", "30")]);

    assert_eq!(net_income(Some(&income), Some(&expenses)), "30.00");
}

#[test]
fn net_income_is_unavailable_without_both_sides() {
    let income = dataset("income", &[("Rooms", "100")]);

    assert_eq!(net_income(Some(&income), None), "N/A");
    assert_eq!(net_income(None, None), "N/A");
}

#[test]
fn table_document_has_header_and_one_row_per_data_row() {
    let income = dataset("income", &[("Rooms", "100"), ("Bar", "50")]);
    let html = table_document(Some(&income), "Income");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<tr class=\"header\"><th colspan=\"2\">Income</th></tr>"));
    assert!(html.contains("<tr><td>Rooms</td><td>100</td></tr>"));
    assert!(html.contains("<tr><td>Bar</td><td>50</td></tr>"));
    assert_eq!(html.matches("<td>").count(), 4);
}

#[test]
fn table_document_for_absent_dataset_does_not_fail() {
    let html = table_document(None, "Staff Distribution");

    assert!(html.contains("Staff Distribution"));
    assert!(html.contains("No data available"));
}

#[test]
fn statement_places_net_income_between_expenses_and_assets() {
    let income = dataset("income", &[("Rooms", "100"), ("Bar", "50")]);
    let expenses = dataset("expenses", &[("Staff", "30")]);
    let assets = dataset("assets", &[("Cash", "900")]);

    let html = financial_statement_document(Some(&income), Some(&expenses), Some(&assets), None);

    let expenses_at = html.find(">Expenses</th>").unwrap();
    let net_at = html.find("Net Income: 120.00").unwrap();
    let assets_at = html.find(">Assets</th>").unwrap();
    let liabilities_at = html.find(">Liabilities</th>").unwrap();
    assert!(expenses_at < net_at);
    assert!(net_at < assets_at);
    assert!(assets_at < liabilities_at);
    assert_eq!(html.matches("No data available").count(), 1);
}

#[test]
fn statement_without_expenses_shows_unavailable_net_income() {
    let income = dataset("income", &[("Rooms", "100")]);

    let html = financial_statement_document(Some(&income), None, None, None);

    assert!(html.contains("Net Income: N/A"));
}
