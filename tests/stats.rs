use bizdash::domain::Dataset;
use bizdash::stats::{Summary, summarize};

fn dataset(pairs: &[(&str, &str)]) -> Dataset {
    Dataset::new(
        "productPerformance".parse().unwrap(),
        pairs
            .iter()
            .map(|(label, value)| vec![label.to_string(), value.to_string()])
            .collect(),
    )
}

#[test]
fn zero_rows_yield_all_unavailable() {
    let summary = summarize(Some(&dataset(&[])));

    assert_eq!(summary, Summary::unavailable());
    assert!(!summary.is_available());
    assert!(summary.sentence().contains("the highest value is N/A"));
}

#[test]
fn extremes_tie_to_first_row_in_order() {
    let data = dataset(&[
        ("Q1", "250"),
        ("Q2", "1,000"),
        ("Q3", "250"),
        ("Q4", "1000"),
    ]);

    let summary = summarize(Some(&data));

    assert_eq!(summary.highest, "1,000");
    assert_eq!(summary.highest_label, "Q2");
    assert_eq!(summary.lowest, "250");
    assert_eq!(summary.lowest_label, "Q1");
    assert_eq!(summary.average, "625");
}

#[test]
fn rows_missing_value_cells_count_as_zero() {
    let mut data = dataset(&[("Espresso", "12.346")]);
    data.rows.push(vec!["Latte".to_string()]);

    let summary = summarize(Some(&data));

    assert_eq!(summary.highest, "12.35");
    assert_eq!(summary.lowest, "0");
    assert_eq!(summary.lowest_label, "Latte");
    assert_eq!(summary.average, "6.17");
}

#[test]
fn sentence_names_values_and_labels() {
    let data = dataset(&[("Jan", "10"), ("Feb", "30")]);

    let sentence = summarize(Some(&data)).sentence();

    assert!(sentence.contains("the highest value is 30 and occurred at Feb"));
    assert!(sentence.contains("The average value is 20"));
    assert!(sentence.contains("the lowest value is 10 and occurred at Jan"));
}
