//! Metric-family model and Prometheus text exposition.
//!
//! Collectors produce `MetricFamily` values; `text::render_text` turns a set
//! of families into the text format scraped from `/metrics`.

pub mod family;
pub mod text;

pub use family::{MetricFamily, MetricType, Sample};
pub use text::{escape_help, escape_label, format_value, render_text, CONTENT_TYPE};
