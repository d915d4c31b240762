use std::collections::HashMap;

use crate::power::reading::{MetricReading, MISSING_SENTINEL};

pub const REPORT_TITLE: &str = "# Power query results";
pub const DEVICE_COLUMN: &str = "Device";

const NO_ROWS_MESSAGE: &str = "No matching power data found";

const DEFAULT_LABELS: [(&str, &str); 8] = [
    ("uab", "uab (A-B line voltage)"),
    ("ubc", "ubc (B-C line voltage)"),
    ("ia", "ia (phase A current)"),
    ("ib", "ib (phase B current)"),
    ("ic", "ic (phase C current)"),
    ("ep", "ep (active energy)"),
    ("p", "p (active power)"),
    ("q", "q (reactive power)"),
];

/// Column headers for metric parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLabels(HashMap<String, String>);

impl ParameterLabels {
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParameterLabels(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The registered label, or the parameter itself.
    pub fn label<'a>(&'a self, parameter: &'a str) -> &'a str {
        self.0.get(parameter).map(String::as_str).unwrap_or(parameter)
    }
}

impl Default for ParameterLabels {
    fn default() -> Self {
        ParameterLabels::new(DEFAULT_LABELS)
    }
}

/// The readings of one device, keyed by parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReadings {
    pub name: String,
    pub values: HashMap<String, MetricReading>,
}

impl DeviceReadings {
    pub fn new(name: &str) -> Self {
        DeviceReadings {
            name: name.to_string(),
            values: HashMap::new(),
        }
    }
}

// Cell text must not break the row
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let cells: Vec<String> = cells.map(cell).collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Renders readings as a Markdown table: a device column followed by one column
/// per entry of `parameters`, in that order, and one row per device, in input
/// order. Parameters without a reading render as `N/A`.
pub fn render(rows: &[DeviceReadings], parameters: &[String], labels: &ParameterLabels) -> String {
    let mut markdown = format!("{REPORT_TITLE}\n\n");

    if rows.is_empty() {
        markdown.push_str(NO_ROWS_MESSAGE);
        return markdown;
    }

    let header = std::iter::once(DEVICE_COLUMN)
        .chain(parameters.iter().map(|parameter| labels.label(parameter)));
    markdown.push_str(&row(header));
    markdown.push_str(&row(std::iter::repeat("---").take(parameters.len() + 1)));

    for device in rows {
        let values = parameters.iter().map(|parameter| {
            device
                .values
                .get(parameter)
                .map(MetricReading::display)
                .unwrap_or(MISSING_SENTINEL)
        });
        markdown.push_str(&row(std::iter::once(device.name.as_str()).chain(values)));
    }

    markdown
}
