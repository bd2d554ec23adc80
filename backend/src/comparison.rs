use std::collections::BTreeMap;

use crate::emission_factors::round2;
use crate::models::{CompareResponse, FuelComparison};

/// Relative emission intensity of each fuel, diesel = 1.0.
pub const RELATIVE_FUEL_FACTORS: [(&str, f64); 3] =
    [("diesel", 1.0), ("petrol", 1.05), ("electric", 0.20)];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ComparisonError {
    #[error("unsupported baseline fuel: {0}")]
    UnknownFuel(String),
    #[error("baseline emission must be a non-zero finite number")]
    InvalidBaseline,
}

/// Expresses a known emission figure for one fuel in terms of every other fuel.
pub fn compare_fuels(
    baseline_fuel: &str,
    baseline_emission: f64,
) -> Result<CompareResponse, ComparisonError> {
    let baseline = baseline_fuel.to_lowercase();
    let baseline_factor =
        factor_for(&baseline).ok_or_else(|| ComparisonError::UnknownFuel(baseline.clone()))?;
    if !baseline_emission.is_finite() || baseline_emission == 0.0 {
        return Err(ComparisonError::InvalidBaseline);
    }

    let comparisons = RELATIVE_FUEL_FACTORS
        .iter()
        .filter(|(fuel, _)| *fuel != baseline)
        .map(|&(fuel, factor)| {
            let emission_kg = round2(baseline_emission * (factor / baseline_factor));
            let diff = round2(emission_kg - baseline_emission);
            let percent = round2(diff / baseline_emission * 100.0);
            let comparison = FuelComparison {
                emission_kg,
                diff_kg: signed(diff),
                percent: format!("{}%", signed(percent)),
            };
            (fuel.to_string(), comparison)
        })
        .collect::<BTreeMap<_, _>>();

    Ok(CompareResponse {
        baseline,
        baseline_emission,
        comparisons,
    })
}

fn factor_for(fuel: &str) -> Option<f64> {
    RELATIVE_FUEL_FACTORS
        .iter()
        .find(|(name, _)| *name == fuel)
        .map(|&(_, factor)| factor)
}

/// Renders with an explicit sign and at least one decimal: `+5.0`, `-80.25`.
fn signed(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    if value.fract() == 0.0 {
        format!("{sign}{value:.1}")
    } else {
        format!("{sign}{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_baseline_against_petrol_and_electric() {
        let response = compare_fuels("Diesel", 100.0).unwrap();
        assert_eq!(response.baseline, "diesel");
        assert_eq!(response.comparisons.len(), 2);

        let petrol = &response.comparisons["petrol"];
        assert_eq!(petrol.emission_kg, 105.0);
        assert_eq!(petrol.diff_kg, "+5.0");
        assert_eq!(petrol.percent, "+5.0%");

        let electric = &response.comparisons["electric"];
        assert_eq!(electric.emission_kg, 20.0);
        assert_eq!(electric.diff_kg, "-80.0");
        assert_eq!(electric.percent, "-80.0%");
    }

    #[test]
    fn baseline_is_excluded_from_comparisons() {
        let response = compare_fuels("electric", 10.0).unwrap();
        assert!(!response.comparisons.contains_key("electric"));
        assert_eq!(response.comparisons["diesel"].emission_kg, 50.0);
    }

    #[test]
    fn unknown_baseline_fuel_is_rejected() {
        assert_eq!(
            compare_fuels("hydrogen", 10.0).unwrap_err(),
            ComparisonError::UnknownFuel("hydrogen".into())
        );
    }

    #[test]
    fn zero_baseline_is_rejected() {
        assert_eq!(
            compare_fuels("diesel", 0.0).unwrap_err(),
            ComparisonError::InvalidBaseline
        );
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(signed(5.0), "+5.0");
        assert_eq!(signed(0.0), "+0.0");
        assert_eq!(signed(-80.25), "-80.25");
        assert_eq!(signed(1.5), "+1.5");
    }
}
