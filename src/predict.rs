use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::record::{
    Applicant, BmiCategory, EmploymentStatus, Gender, MaritalStatus, MedicalHistory, Region,
    SmokingStatus,
};

const BUNDLED_MODEL: &str = include_str!("../model/default_model.json");

// Highest possible sum over a two-condition history (high blood pressure + heart disease).
const MAX_RISK_SCORE: f64 = 14.0;

/// Anything that can price an applicant.
pub trait Predictor {
    fn predict(&self, applicant: &Applicant) -> Result<i64>;
}

/// Linear model over named features, deserialized from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl LinearModel {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_MODEL)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(text)
            .map_err(|e| EtlError::Model(format!("invalid model definition: {}", e)))?;
        if !model.intercept.is_finite() || model.weights.values().any(|w| !w.is_finite()) {
            return Err(EtlError::Model("model contains non-finite numbers".into()));
        }
        Ok(model)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Model(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// `model_path` when configured, the bundled coefficients otherwise.
    pub fn load(model_path: Option<&Path>) -> Result<Self> {
        match model_path {
            Some(p) => Self::from_path(p),
            None => Self::bundled(),
        }
    }
}

impl Predictor for LinearModel {
    fn predict(&self, applicant: &Applicant) -> Result<i64> {
        let raw = features(applicant)
            .iter()
            .fold(self.intercept, |acc, (name, value)| {
                acc + self.weights.get(*name).copied().unwrap_or(0.0) * value
            });
        debug!(raw, "linear model output");
        Ok(raw.round().max(0.0) as i64)
    }
}

/// Sum of per-condition risk points, scaled into [0, 1].
pub fn normalized_risk_score(history: MedicalHistory) -> f64 {
    let total: f64 = history
        .conditions()
        .iter()
        .map(|c| match c.as_str() {
            "diabetes" => 6.0,
            "heart disease" => 8.0,
            "high blood pressure" => 6.0,
            "thyroid" => 5.0,
            _ => 0.0,
        })
        .sum();
    total / MAX_RISK_SCORE
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Model inputs: raw numerics, plan ordinal, risk score and one-hot categories.
pub fn features(a: &Applicant) -> Vec<(&'static str, f64)> {
    vec![
        ("age", f64::from(a.age)),
        ("number_of_dependants", f64::from(a.number_of_dependants)),
        ("income_lakhs", f64::from(a.income_lakhs)),
        ("genetical_risk", f64::from(a.genetical_risk)),
        ("insurance_plan", f64::from(a.insurance_plan.rank())),
        ("normalized_risk_score", normalized_risk_score(a.medical_history)),
        ("gender_male", flag(a.gender == Gender::Male)),
        ("region_northwest", flag(a.region == Region::Northwest)),
        ("region_southeast", flag(a.region == Region::Southeast)),
        ("region_southwest", flag(a.region == Region::Southwest)),
        (
            "marital_status_unmarried",
            flag(a.marital_status == MaritalStatus::Unmarried),
        ),
        ("bmi_category_obesity", flag(a.bmi_category == BmiCategory::Obesity)),
        (
            "bmi_category_overweight",
            flag(a.bmi_category == BmiCategory::Overweight),
        ),
        (
            "bmi_category_underweight",
            flag(a.bmi_category == BmiCategory::Underweight),
        ),
        (
            "smoking_status_occasional",
            flag(a.smoking_status == SmokingStatus::Occasional),
        ),
        (
            "smoking_status_regular",
            flag(a.smoking_status == SmokingStatus::Regular),
        ),
        (
            "employment_status_salaried",
            flag(a.employment_status == EmploymentStatus::Salaried),
        ),
        (
            "employment_status_self_employed",
            flag(a.employment_status == EmploymentStatus::SelfEmployed),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{sample_applicant, InsurancePlan};

    #[test]
    fn risk_score_bounds() {
        assert_eq!(normalized_risk_score(MedicalHistory::NoDisease), 0.0);
        assert_eq!(normalized_risk_score(MedicalHistory::DiabetesHeartDisease), 1.0);
        assert_eq!(
            normalized_risk_score(MedicalHistory::HighBloodPressureHeartDisease),
            1.0
        );
        assert!((normalized_risk_score(MedicalHistory::Thyroid) - 5.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn bundled_model_parses() {
        let m = LinearModel::bundled().unwrap();
        assert!(m.weights.contains_key("age"));
        assert!(m.weights.contains_key("normalized_risk_score"));
    }

    #[test]
    fn custom_model_is_applied_exactly() {
        let m = LinearModel::from_json(r#"{"intercept": 100, "weights": {"age": 2}}"#).unwrap();
        assert_eq!(m.predict(&sample_applicant()).unwrap(), 160);
    }

    #[test]
    fn unknown_weights_are_ignored_and_output_floored() {
        let m = LinearModel::from_json(
            r#"{"intercept": -50, "weights": {"shoe_size": 1000}}"#,
        )
        .unwrap();
        assert_eq!(m.predict(&sample_applicant()).unwrap(), 0);
    }

    #[test]
    fn malformed_model_is_a_model_error() {
        let err = LinearModel::from_json("{\"weights\": {}}").unwrap_err();
        assert!(matches!(err, EtlError::Model(_)));
    }

    #[test]
    fn missing_model_file_is_a_model_error() {
        let err = LinearModel::load(Some(Path::new("/nonexistent/model.json"))).unwrap_err();
        assert!(matches!(err, EtlError::Model(_)));
    }

    #[test]
    fn richer_plan_and_smoking_cost_more() {
        let m = LinearModel::bundled().unwrap();
        let base = sample_applicant();
        let base_cost = m.predict(&base).unwrap();

        let gold = Applicant {
            insurance_plan: InsurancePlan::Gold,
            ..base.clone()
        };
        let smoker = Applicant {
            smoking_status: SmokingStatus::Regular,
            ..base.clone()
        };
        assert!(m.predict(&gold).unwrap() > base_cost);
        assert!(m.predict(&smoker).unwrap() > base_cost);
    }

    #[test]
    fn one_hot_features_match_applicant() {
        let f: HashMap<_, _> = features(&sample_applicant()).into_iter().collect();
        assert_eq!(f["gender_male"], 0.0);
        assert_eq!(f["employment_status_salaried"], 1.0);
        assert_eq!(f["insurance_plan"], 2.0);
        assert_eq!(f["region_northwest"], 0.0);
    }
}
