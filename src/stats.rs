use serde::Serialize;

use crate::amount::{format_grouped, round2};
use crate::domain::Dataset;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub lowest: String,
    pub lowest_label: String,
    pub average: String,
    pub highest: String,
    pub highest_label: String,
}

impl Summary {
    pub fn unavailable() -> Self {
        Self {
            lowest: NOT_AVAILABLE.to_string(),
            lowest_label: NOT_AVAILABLE.to_string(),
            average: NOT_AVAILABLE.to_string(),
            highest: NOT_AVAILABLE.to_string(),
            highest_label: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.average != NOT_AVAILABLE
    }

    pub fn sentence(&self) -> String {
        format!(
            "For the selected data chart, the highest value is {} and occurred at {}. \
             The average value is {}. And the lowest value is {} and occurred at {}.",
            self.highest, self.highest_label, self.average, self.lowest, self.lowest_label
        )
    }
}

/// Min, max and mean of the primary column. Ties go to the earliest row;
/// absent or empty datasets give an all-`N/A` summary.
pub fn summarize(dataset: Option<&Dataset>) -> Summary {
    let Some(dataset) = dataset.filter(|dataset| !dataset.is_empty()) else {
        return Summary::unavailable();
    };
    let values = dataset.primary_values();

    let mut lowest = 0usize;
    let mut highest = 0usize;
    for (idx, value) in values.iter().enumerate().skip(1) {
        if *value < values[lowest] {
            lowest = idx;
        }
        if *value > values[highest] {
            highest = idx;
        }
    }
    let average = values.iter().sum::<f64>() / values.len() as f64;

    Summary {
        lowest: format_grouped(values[lowest]),
        lowest_label: dataset.label(lowest).to_string(),
        average: format_grouped(round2(average)),
        highest: format_grouped(values[highest]),
        highest_label: dataset.label(highest).to_string(),
    }
}
