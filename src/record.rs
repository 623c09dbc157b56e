use clap::ValueEnum;
use rusqlite::types::Value as SqlValue;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

// ── Pipeline rows ──

/// One row of the BaaS `users` table as returned by the REST endpoint.
/// Every field is optional: a missing key deserializes to `None`. Numeric
/// columns are kept as raw JSON so a float or quoted number passes through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    pub age: Option<Value>,
    pub number_of_dependants: Option<Value>,
    pub income_lakhs: Option<Value>,
    pub genetical_risk: Option<Value>,
    pub insurance_plan: Option<String>,
    pub employment_status: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub bmi_category: Option<String>,
    pub smoking_status: Option<String>,
    pub region: Option<String>,
    pub medical_history: Option<String>,
}

/// Row shape of the warehouse `users` table. Numeric columns carry whatever
/// scalar the source sent; SQLite column affinity does the coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseRecord {
    pub id: i64,
    pub age: Option<SqlValue>,
    pub number_of_dependants: Option<SqlValue>,
    pub income_lakhs: Option<SqlValue>,
    pub genetical_risk: Option<String>,
    pub insurance_plan: Option<String>,
    pub employment_status: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub bmi_category: Option<String>,
    pub smoking_status: Option<String>,
    pub region: Option<String>,
    pub medical_history: Option<String>,
    pub created_at: String,
}

/// The id has arithmetic applied to it, so it must read as an integer:
/// `10`, `10.0` and `"10"` all qualify.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(v) => integral(&v)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("id is not an integer: {}", v))),
    }
}

fn integral(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON scalar → SQLite value, unchanged in kind. Nested values are stored as JSON text.
pub fn sql_value(v: Value) -> Option<SqlValue> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::String(s) => Some(SqlValue::Text(s)),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

// ── Capture form ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsurancePlan {
    Bronze,
    Silver,
    Gold,
}

impl InsurancePlan {
    pub fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }

    /// Ordinal encoding used by the prediction model.
    pub fn rank(self) -> u8 {
        match self {
            Self::Bronze => 1,
            Self::Silver => 2,
            Self::Gold => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmploymentStatus {
    Salaried,
    SelfEmployed,
    Freelancer,
    /// The form's blank choice; stored as an empty string.
    #[value(name = "none")]
    Unspecified,
}

impl EmploymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Salaried => "Salaried",
            Self::SelfEmployed => "Self-Employed",
            Self::Freelancer => "Freelancer",
            Self::Unspecified => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaritalStatus {
    Unmarried,
    Married,
}

impl MaritalStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unmarried => "Unmarried",
            Self::Married => "Married",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BmiCategory {
    Normal,
    Obesity,
    Overweight,
    Underweight,
}

impl BmiCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Obesity => "Obesity",
            Self::Overweight => "Overweight",
            Self::Underweight => "Underweight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SmokingStatus {
    NoSmoking,
    Regular,
    Occasional,
}

impl SmokingStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoSmoking => "No Smoking",
            Self::Regular => "Regular",
            Self::Occasional => "Occasional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Region {
    Northwest,
    Southeast,
    Northeast,
    Southwest,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Self::Northwest => "Northwest",
            Self::Southeast => "Southeast",
            Self::Northeast => "Northeast",
            Self::Southwest => "Southwest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MedicalHistory {
    NoDisease,
    Diabetes,
    HighBloodPressure,
    DiabetesHighBloodPressure,
    Thyroid,
    HeartDisease,
    HighBloodPressureHeartDisease,
    DiabetesThyroid,
    DiabetesHeartDisease,
}

impl MedicalHistory {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoDisease => "No Disease",
            Self::Diabetes => "Diabetes",
            Self::HighBloodPressure => "High blood pressure",
            Self::DiabetesHighBloodPressure => "Diabetes & High blood pressure",
            Self::Thyroid => "Thyroid",
            Self::HeartDisease => "Heart disease",
            Self::HighBloodPressureHeartDisease => "High blood pressure & Heart disease",
            Self::DiabetesThyroid => "Diabetes & Thyroid",
            Self::DiabetesHeartDisease => "Diabetes & Heart disease",
        }
    }

    /// Individual conditions of a compound history ("A & B" → ["a", "b"]), lowercased.
    pub fn conditions(self) -> Vec<String> {
        self.label()
            .split(" & ")
            .map(|c| c.trim().to_lowercase())
            .collect()
    }
}

/// The twelve inputs collected by the capture form.
#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    pub age: u8,
    pub number_of_dependants: u8,
    pub income_lakhs: u16,
    pub genetical_risk: u8,
    pub insurance_plan: InsurancePlan,
    pub employment_status: EmploymentStatus,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub bmi_category: BmiCategory,
    pub smoking_status: SmokingStatus,
    pub region: Region,
    pub medical_history: MedicalHistory,
}

impl Applicant {
    /// JSON body for the BaaS `users` table (no id: the table assigns one).
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "age": self.age,
            "number_of_dependants": self.number_of_dependants,
            "income_lakhs": self.income_lakhs,
            "genetical_risk": self.genetical_risk,
            "insurance_plan": self.insurance_plan.label(),
            "employment_status": self.employment_status.label(),
            "gender": self.gender.label(),
            "marital_status": self.marital_status.label(),
            "bmi_category": self.bmi_category.label(),
            "smoking_status": self.smoking_status.label(),
            "region": self.region.label(),
            "medical_history": self.medical_history.label(),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_applicant() -> Applicant {
    Applicant {
        age: 30,
        number_of_dependants: 2,
        income_lakhs: 12,
        genetical_risk: 1,
        insurance_plan: InsurancePlan::Silver,
        employment_status: EmploymentStatus::Salaried,
        gender: Gender::Female,
        marital_status: MaritalStatus::Married,
        bmi_category: BmiCategory::Normal,
        smoking_status: SmokingStatus::NoSmoking,
        region: Region::Northeast,
        medical_history: MedicalHistory::Diabetes,
    }
}
