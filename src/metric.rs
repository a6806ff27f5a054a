//! Turns raw metric values into display strings and trend directions.
//!
//! Every function here is total: missing or unusable input degrades to the
//! `"NA"` value or to an unavailable delta, never to a panic or an error.

use crate::formatting::{NOT_AVAILABLE, format_percent, group_thousands};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricFormat {
    /// Grouped, no fraction digits.
    Integer,
    /// Grouped, two fraction digits.
    Decimal,
    /// Ratio in `[0, 1]` shown as a percentage with two fraction digits.
    PercentageOfOne,
}

impl MetricFormat {
    pub fn render(self, value: f64) -> String {
        match self {
            Self::Integer => group_thousands(value, 0),
            Self::Decimal => group_thousands(value, 2),
            Self::PercentageOfOne => format_percent(value * 100.0),
        }
    }
}

/// How a signed percentage maps to a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TrendPolicy {
    /// `>= 0` is up, `< 0` is down.
    TwoWay,
    /// `0` is flat, `> 0` up, `< 0` down.
    #[default]
    ThreeWay,
}

impl TrendPolicy {
    pub fn direction(self, percent: f64) -> Direction {
        match self {
            Self::TwoWay => {
                if percent >= 0.0 {
                    Direction::Up
                } else {
                    Direction::Down
                }
            }
            Self::ThreeWay => {
                if percent > 0.0 {
                    Direction::Up
                } else if percent < 0.0 {
                    Direction::Down
                } else {
                    Direction::Flat
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
    Unavailable,
}

impl Direction {
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "neutral",
            Self::Unavailable => "unavailable",
        }
    }

    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "–",
            Self::Unavailable => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnavailableReason {
    MissingValue,
    MissingPrevious,
    ZeroPrevious,
    NonFinitePrevious,
    /// The ratio overflowed, e.g. against a subnormal previous value.
    NonFinitePercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Delta {
    Available { percent: f64, direction: Direction },
    Unavailable { reason: UnavailableReason },
}

impl Delta {
    pub const fn percent(&self) -> Option<f64> {
        match self {
            Self::Available { percent, .. } => Some(*percent),
            Self::Unavailable { .. } => None,
        }
    }

    pub const fn direction(&self) -> Direction {
        match self {
            Self::Available { direction, .. } => *direction,
            Self::Unavailable { .. } => Direction::Unavailable,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub value: Option<f64>,
    pub previous_value: Option<f64>,
    pub format: MetricFormat,
    pub use_absolute_denominator: bool,
}

impl MetricSample {
    pub const fn new(
        value: Option<f64>,
        previous_value: Option<f64>,
        format: MetricFormat,
    ) -> Self {
        Self {
            value,
            previous_value,
            format,
            use_absolute_denominator: false,
        }
    }

    #[must_use]
    pub const fn with_absolute_denominator(mut self, enabled: bool) -> Self {
        self.use_absolute_denominator = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub formatted_value: String,
    pub delta: Delta,
    pub formatted_delta: String,
    pub policy: TrendPolicy,
}

impl Presentation {
    pub const fn direction(&self) -> Direction {
        self.delta.direction()
    }
}

pub fn present(sample: &MetricSample, policy: TrendPolicy) -> Presentation {
    let Some(value) = sample.value.filter(|value| value.is_finite()) else {
        return Presentation {
            formatted_value: NOT_AVAILABLE.to_string(),
            delta: Delta::Unavailable {
                reason: UnavailableReason::MissingValue,
            },
            formatted_delta: NOT_AVAILABLE.to_string(),
            policy,
        };
    };

    let delta = compute_delta(
        value,
        sample.previous_value,
        sample.use_absolute_denominator,
        policy,
    );
    let formatted_delta = delta
        .percent()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |percent| format_percent(percent.abs()));

    Presentation {
        formatted_value: sample.format.render(value),
        delta,
        formatted_delta,
        policy,
    }
}

pub fn compute_delta(
    value: f64,
    previous_value: Option<f64>,
    use_absolute_denominator: bool,
    policy: TrendPolicy,
) -> Delta {
    let unavailable = |reason| Delta::Unavailable { reason };
    let previous = match previous_value {
        None => return unavailable(UnavailableReason::MissingPrevious),
        Some(previous) if !previous.is_finite() => {
            return unavailable(UnavailableReason::NonFinitePrevious);
        }
        Some(previous) if previous == 0.0 => return unavailable(UnavailableReason::ZeroPrevious),
        Some(previous) => previous,
    };
    if !value.is_finite() {
        return unavailable(UnavailableReason::MissingValue);
    }

    let denominator = if use_absolute_denominator {
        previous.abs()
    } else {
        previous
    };
    let percent = (value - previous) / denominator * 100.0;
    if !percent.is_finite() {
        return unavailable(UnavailableReason::NonFinitePercent);
    }
    Delta::Available {
        percent,
        direction: policy.direction(percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(value: Option<f64>, previous: Option<f64>) -> MetricSample {
        MetricSample::new(value, previous, MetricFormat::Decimal)
    }

    #[test]
    fn missing_value_is_na_without_delta() {
        for previous in [None, Some(0.0), Some(10.0), Some(-3.0)] {
            let out = present(&decimal(None, previous), TrendPolicy::ThreeWay);
            assert_eq!(out.formatted_value, "NA");
            assert_eq!(out.formatted_delta, "NA");
            assert_eq!(
                out.delta,
                Delta::Unavailable {
                    reason: UnavailableReason::MissingValue
                }
            );
        }
    }

    #[test]
    fn non_finite_value_is_missing() {
        let out = present(&decimal(Some(f64::NAN), Some(1.0)), TrendPolicy::ThreeWay);
        assert_eq!(out.formatted_value, "NA");
        assert_eq!(out.direction(), Direction::Unavailable);
    }

    #[test]
    fn previous_none_or_zero_is_unavailable() {
        let missing = present(&decimal(Some(5.0), None), TrendPolicy::ThreeWay);
        assert_eq!(
            missing.delta,
            Delta::Unavailable {
                reason: UnavailableReason::MissingPrevious
            }
        );
        let zero = present(&decimal(Some(5.0), Some(0.0)), TrendPolicy::TwoWay);
        assert_eq!(
            zero.delta,
            Delta::Unavailable {
                reason: UnavailableReason::ZeroPrevious
            }
        );
        assert_eq!(zero.formatted_value, "5.00");
        assert_eq!(zero.formatted_delta, "NA");
        let infinite = present(&decimal(Some(5.0), Some(f64::INFINITY)), TrendPolicy::TwoWay);
        assert_eq!(infinite.direction(), Direction::Unavailable);
    }

    #[test]
    fn overflowing_ratio_is_unavailable() {
        let overflow = Delta::Unavailable {
            reason: UnavailableReason::NonFinitePercent,
        };
        let tiny_previous = present(&decimal(Some(1.0), Some(5e-324)), TrendPolicy::ThreeWay);
        assert_eq!(tiny_previous.delta, overflow);
        assert_eq!(tiny_previous.formatted_delta, "NA");
        assert_eq!(tiny_previous.formatted_value, "1.00");

        let huge_swing = present(&decimal(Some(1e308), Some(-1e308)), TrendPolicy::TwoWay);
        assert_eq!(huge_swing.delta, overflow);
        assert_eq!(huge_swing.direction(), Direction::Unavailable);
    }

    #[test]
    fn decimal_scenario() {
        let out = present(&decimal(Some(150.0), Some(100.0)), TrendPolicy::ThreeWay);
        assert_eq!(out.formatted_value, "150.00");
        assert_eq!(out.delta.percent(), Some(50.0));
        assert_eq!(out.direction(), Direction::Up);
        assert_eq!(out.formatted_delta, "50.00%");
    }

    #[test]
    fn denominator_policies_differ_for_negative_previous() {
        let absolute = decimal(Some(-10.0), Some(-20.0)).with_absolute_denominator(true);
        let out = present(&absolute, TrendPolicy::ThreeWay);
        assert_eq!(out.delta.percent(), Some(50.0));
        assert_eq!(out.direction(), Direction::Up);

        let signed = decimal(Some(-10.0), Some(-20.0));
        let out = present(&signed, TrendPolicy::ThreeWay);
        assert_eq!(out.delta.percent(), Some(-50.0));
        assert_eq!(out.direction(), Direction::Down);
        assert_eq!(out.formatted_delta, "50.00%");
    }

    #[test]
    fn zero_change_depends_on_policy() {
        let sample = decimal(Some(42.0), Some(42.0));
        assert_eq!(present(&sample, TrendPolicy::TwoWay).direction(), Direction::Up);
        assert_eq!(present(&sample, TrendPolicy::ThreeWay).direction(), Direction::Flat);
        assert_eq!(present(&sample, TrendPolicy::ThreeWay).formatted_delta, "0.00%");
    }

    #[test]
    fn formats_each_kind() {
        assert_eq!(MetricFormat::Integer.render(1_234_567.4), "1,234,567");
        assert_eq!(MetricFormat::Decimal.render(1_234.5), "1,234.50");
        assert_eq!(MetricFormat::PercentageOfOne.render(0.1234), "12.34%");
        assert_eq!(MetricFormat::PercentageOfOne.render(1.5), "150.00%");
    }

    #[test]
    fn presentation_is_idempotent() {
        let sample = decimal(Some(7.5), Some(3.0)).with_absolute_denominator(true);
        let first = present(&sample, TrendPolicy::ThreeWay);
        let second = present(&sample, TrendPolicy::ThreeWay);
        assert_eq!(first, second);
        assert_eq!(first.policy, TrendPolicy::ThreeWay);
    }

    #[test]
    fn direction_classes() {
        assert_eq!(Direction::Up.css_class(), "up");
        assert_eq!(Direction::Flat.css_class(), "neutral");
        assert_eq!(Direction::Unavailable.arrow(), "");
    }
}
