use std::time::Duration;

use clap::{Parser, ValueEnum};

pub const DEFAULT_ANALYZE_URL: &str = "http://127.0.0.1:5000/api/analyze";
pub const DEFAULT_EXPLAIN_URL: &str = "http://127.0.0.1:5000/api/explain";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Orientation {
    /// Ranks stacked top to bottom.
    #[default]
    Vertical,
    /// Ranks laid out left to right.
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    pub orientation: Orientation,
    pub node_width: f32,
    pub node_height: f32,
    pub gap_x: f32,
    pub gap_y: f32,
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            node_width: 180.0,
            node_height: 56.0,
            gap_x: 48.0,
            gap_y: 72.0,
            sweeps: 4,
        }
    }
}

impl LayoutConfig {
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }

    pub fn with_node_size(mut self, width: f32, height: f32) -> Self {
        self.node_width = width.max(1.0);
        self.node_height = height.max(1.0);
        self
    }

    pub fn with_gaps(mut self, gap_x: f32, gap_y: f32) -> Self {
        self.gap_x = gap_x.max(0.0);
        self.gap_y = gap_y.max(0.0);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub analyze_url: String,
    pub explain_url: String,
    pub timeout: Duration,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            analyze_url: DEFAULT_ANALYZE_URL.to_owned(),
            explain_url: DEFAULT_EXPLAIN_URL.to_owned(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub endpoints: Endpoints,
    pub layout: LayoutConfig,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "FLEX_ANALYZE_URL", default_value = DEFAULT_ANALYZE_URL)]
    pub analyze_url: String,

    #[arg(long, env = "FLEX_EXPLAIN_URL", default_value = DEFAULT_EXPLAIN_URL)]
    pub explain_url: String,

    #[arg(long, env = "FLEX_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = Orientation::Vertical)]
    pub orientation: Orientation,

    #[arg(long, default_value_t = 4)]
    pub sweeps: usize,

    #[arg(long, default_value_t = 180.0)]
    pub node_width: f32,

    #[arg(long, default_value_t = 56.0)]
    pub node_height: f32,

    #[arg(long, default_value_t = 48.0)]
    pub gap_x: f32,

    #[arg(long, default_value_t = 72.0)]
    pub gap_y: f32,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Self {
            endpoints: Endpoints {
                analyze_url: args.analyze_url,
                explain_url: args.explain_url,
                timeout: Duration::from_secs(args.timeout_secs.max(1)),
            },
            layout: LayoutConfig::default()
                .with_orientation(args.orientation)
                .with_sweeps(args.sweeps)
                .with_node_size(args.node_width, args.node_height)
                .with_gaps(args.gap_x, args.gap_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_sizes_are_clamped() {
        let config = LayoutConfig::default()
            .with_node_size(-10.0, 0.0)
            .with_gaps(-3.0, 12.0);

        assert_eq!(config.node_width, 1.0);
        assert_eq!(config.node_height, 1.0);
        assert_eq!(config.gap_x, 0.0);
        assert_eq!(config.gap_y, 12.0);
    }

    #[test]
    fn defaults_match_library_defaults() {
        let args = Args::try_parse_from(["flex-view"]).unwrap();
        let settings = Settings::from(args);

        assert_eq!(settings.layout, LayoutConfig::default());
        assert_eq!(settings.endpoints.timeout, Duration::from_secs(60));
    }

    #[test]
    fn flags_override_layout() {
        let args = Args::try_parse_from([
            "flex-view",
            "--orientation",
            "horizontal",
            "--sweeps",
            "9",
            "--analyze-url",
            "http://analysis.test/run",
        ])
        .unwrap();
        let settings = Settings::from(args);

        assert_eq!(settings.layout.orientation, Orientation::Horizontal);
        assert_eq!(settings.layout.sweeps, 9);
        assert_eq!(settings.endpoints.analyze_url, "http://analysis.test/run");
    }
}
