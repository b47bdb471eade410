use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-supplied trip configuration.
///
/// Recognized keys are typed; anything else is carried through untouched in
/// `extra` and serialized back into the same flat mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPreferences {
    /// Expected trip duration, e.g. "5 days".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Qualitative budget tier, e.g. "moderate".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    /// Free-text style descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<String>,
    /// Interests in priority order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    /// Start date string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Unrecognized keys, passed through to agents.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TripPreferences {
    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.duration.is_none()
            && self.budget.is_none()
            && self.travel_style.is_none()
            && self.interests.is_empty()
            && self.start_date.is_none()
            && self.extra.is_empty()
    }

    /// Apply one `key=value` assignment.
    ///
    /// `interests` splits on commas and appends. Unrecognized keys keep numbers
    /// and booleans as JSON scalars and everything else as a string.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), String> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{assignment}'"))?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(format!("empty preference key in '{assignment}'"));
        }

        match key {
            "duration" => self.duration = Some(value.to_string()),
            "budget" => self.budget = Some(value.to_string()),
            "travel_style" | "style" => self.travel_style = Some(value.to_string()),
            "start_date" => self.start_date = Some(value.to_string()),
            "interests" | "interest" => self.interests.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string),
            ),
            other => {
                self.extra.insert(other.to_string(), parse_scalar(value));
            }
        }

        Ok(())
    }

    /// Fill unset keys from `defaults`; keys set on `self` win.
    pub fn merged_over(mut self, defaults: &TripPreferences) -> Self {
        if self.duration.is_none() {
            self.duration = defaults.duration.clone();
        }
        if self.budget.is_none() {
            self.budget = defaults.budget.clone();
        }
        if self.travel_style.is_none() {
            self.travel_style = defaults.travel_style.clone();
        }
        if self.interests.is_empty() {
            self.interests = defaults.interests.clone();
        }
        if self.start_date.is_none() {
            self.start_date = defaults.start_date.clone();
        }
        for (key, value) in &defaults.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Duration in whole days if the duration string leads with a number.
    pub fn duration_days(&self) -> Option<u32> {
        self.duration
            .as_deref()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    }
}

fn parse_scalar(value: &str) -> serde_json::Value {
    if let Ok(number) = value.parse::<i64>() {
        return serde_json::Value::from(number);
    }
    if let Ok(number) = value.parse::<f64>() {
        return serde_json::Value::from(number);
    }
    match value {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => serde_json::Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn serializes_as_flat_mapping_with_pass_through_keys() {
        let mut prefs = TripPreferences {
            duration: Some("5 days".to_string()),
            budget: Some("moderate".to_string()),
            ..TripPreferences::default()
        };
        prefs.apply_assignment("travelers=2").expect("assignment");

        let value = serde_json::to_value(&prefs).expect("encode");
        assert_eq!(value["duration"], "5 days");
        assert_eq!(value["travelers"], 2);
        assert!(value.get("interests").is_none());

        let decoded: TripPreferences = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded, prefs);
    }

    #[rstest]
    #[case("interests=history, food,temples", 3)]
    #[case("interest=food", 1)]
    #[case("interests=", 0)]
    fn interests_split_on_commas(#[case] assignment: &str, #[case] expected: usize) {
        let mut prefs = TripPreferences::default();
        prefs.apply_assignment(assignment).expect("assignment");
        assert_eq!(prefs.interests.len(), expected);
    }

    #[rstest]
    #[case("nokey")]
    #[case("=value")]
    fn malformed_assignments_are_rejected(#[case] assignment: &str) {
        let mut prefs = TripPreferences::default();
        assert!(prefs.apply_assignment(assignment).is_err());
    }

    #[test]
    fn merged_over_keeps_explicit_values() {
        let explicit = TripPreferences {
            budget: Some("luxury".to_string()),
            ..TripPreferences::default()
        };
        let defaults = TripPreferences {
            budget: Some("budget".to_string()),
            duration: Some("3 days".to_string()),
            ..TripPreferences::default()
        };

        let merged = explicit.merged_over(&defaults);
        assert_eq!(merged.budget.as_deref(), Some("luxury"));
        assert_eq!(merged.duration.as_deref(), Some("3 days"));
        assert_eq!(merged.duration_days(), Some(3));
    }
}
