/// Exposition `# TYPE` of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Summary,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
        }
    }

    /// Every sample name a family of this type may emit.
    pub fn sample_names(self, family: &str) -> Vec<String> {
        match self {
            MetricType::Counter | MetricType::Gauge => vec![family.to_string()],
            MetricType::Summary => vec![
                family.to_string(),
                format!("{family}_sum"),
                format!("{family}_count"),
            ],
        }
    }
}

/// One exposition line: sample name, label pairs in output order, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: Vec<(String, String)>, value: f64) -> Self {
        Self { name: name.into(), labels, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricType,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// A family with no samples (used by `describe`).
    pub fn described(name: impl Into<String>, help: impl Into<String>, kind: MetricType) -> Self {
        Self { name: name.into(), help: help.into(), kind, samples: Vec::new() }
    }
}
