use serde::{Deserialize, Serialize};

/// Fixed scoring knobs applied by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Output length (characters) at which quality saturates at 1.0.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: usize,
    /// Tool effectiveness reported when an agent used no tool.
    #[serde(default = "default_tool_effectiveness")]
    pub default_tool_effectiveness: f64,
}

fn default_quality_threshold() -> usize {
    300
}

fn default_tool_effectiveness() -> f64 {
    0.5
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            default_tool_effectiveness: default_tool_effectiveness(),
        }
    }
}

impl ScoringPolicy {
    /// Linear ramp from 0 to 1 over `[0, quality_threshold]`, flat beyond.
    pub fn quality_score(&self, output_length: usize) -> f64 {
        if self.quality_threshold == 0 {
            return 1.0;
        }
        (output_length as f64 / self.quality_threshold as f64).clamp(0.0, 1.0)
    }

    /// 1.0 when any tool was used, otherwise the configured default.
    pub fn tool_effectiveness(&self, tools_used: usize) -> f64 {
        if tools_used > 0 {
            1.0
        } else {
            clamp_unit(self.default_tool_effectiveness)
        }
    }

    /// Repair out-of-range configuration.
    pub fn normalized(mut self) -> Self {
        self.default_tool_effectiveness = clamp_unit(self.default_tool_effectiveness);
        self
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        default_tool_effectiveness()
    } else {
        value.clamp(0.0, 1.0)
    }
}
