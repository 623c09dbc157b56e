use std::io::Write;

use clap::Args;
use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::error::Result;
use crate::predict::Predictor;
use crate::supabase::SupabaseClient;
use crate::record::{
    Applicant, BmiCategory, EmploymentStatus, Gender, InsurancePlan, MaritalStatus,
    MedicalHistory, Region, SmokingStatus,
};

/// The capture form. Ranges and choices are enforced here and nowhere else.
#[derive(Debug, Args)]
pub struct CaptureForm {
    /// Age in years
    #[arg(long, default_value_t = 18, value_parser = clap::value_parser!(u8).range(18..=100))]
    pub age: u8,
    /// Number of dependants
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=20))]
    pub number_of_dependants: u8,
    /// Income in lakhs
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u16).range(0..=200))]
    pub income_lakhs: u16,
    /// Genetical risk (0-5)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub genetical_risk: u8,
    #[arg(long, value_enum, default_value_t = InsurancePlan::Bronze)]
    pub insurance_plan: InsurancePlan,
    #[arg(long, value_enum, default_value_t = EmploymentStatus::Salaried)]
    pub employment_status: EmploymentStatus,
    #[arg(long, value_enum, default_value_t = Gender::Male)]
    pub gender: Gender,
    #[arg(long, value_enum, default_value_t = MaritalStatus::Unmarried)]
    pub marital_status: MaritalStatus,
    #[arg(long, value_enum, default_value_t = BmiCategory::Normal)]
    pub bmi_category: BmiCategory,
    #[arg(long, value_enum, default_value_t = SmokingStatus::NoSmoking)]
    pub smoking_status: SmokingStatus,
    #[arg(long, value_enum, default_value_t = Region::Northwest)]
    pub region: Region,
    #[arg(long, value_enum, default_value_t = MedicalHistory::NoDisease)]
    pub medical_history: MedicalHistory,
}

impl From<CaptureForm> for Applicant {
    fn from(f: CaptureForm) -> Self {
        Applicant {
            age: f.age,
            number_of_dependants: f.number_of_dependants,
            income_lakhs: f.income_lakhs,
            genetical_risk: f.genetical_risk,
            insurance_plan: f.insurance_plan,
            employment_status: f.employment_status,
            gender: f.gender,
            marital_status: f.marital_status,
            bmi_category: f.bmi_category,
            smoking_status: f.smoking_status,
            region: f.region,
            medical_history: f.medical_history,
        }
    }
}

pub struct Submission {
    pub prediction: i64,
    pub row_id: i64,
}

/// Predict, then persist the inputs. Either failure aborts the submission.
pub fn submit(
    conn: &Connection,
    predictor: &dyn Predictor,
    applicant: &Applicant,
) -> Result<Submission> {
    let prediction = predictor.predict(applicant)?;
    let row_id = db::save_capture(conn, applicant)?;
    info!(row_id, prediction, "Captured submission");
    Ok(Submission { prediction, row_id })
}

pub fn result_message(prediction: i64) -> String {
    format!("Your Predicted Health Insurance Cost: {}", prediction)
}

/// Prints the saved submission, then publishes it when a publisher is given.
/// The client is only built after printing, so neither missing credentials
/// nor a failed insert hide the result or the local row.
pub async fn report_and_publish<W, F>(
    out: &mut W,
    submission: &Submission,
    applicant: &Applicant,
    publisher: Option<F>,
) -> Result<()>
where
    W: Write,
    F: FnOnce() -> Result<SupabaseClient>,
{
    writeln!(out, "Saved submission #{}", submission.row_id)?;
    writeln!(out, "{}", result_message(submission.prediction))?;
    out.flush()?;

    if let Some(build) = publisher {
        build()?.insert_user(applicant).await?;
    }
    Ok(())
}
