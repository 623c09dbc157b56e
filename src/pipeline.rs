//! Extract → transform → load, once per invocation.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::db::{self, LoadReport};
use crate::error::Result;
use crate::record::SourceRecord;
use crate::settings::Settings;
use crate::supabase::SupabaseClient;
use crate::transform;

pub fn client(settings: &Settings) -> Result<SupabaseClient> {
    let credentials = settings.credentials()?;
    SupabaseClient::new(
        &credentials,
        Duration::from_secs(settings.http_timeout_secs),
    )
}

pub async fn extract(settings: &Settings) -> Result<Vec<SourceRecord>> {
    client(settings)?.fetch_users().await
}

pub async fn run(settings: &Settings) -> Result<LoadReport> {
    let extracted = extract(settings).await?;
    let transformed = transform::transform(extracted, transform::batch_timestamp())?;

    let conn = db::connect(&settings.warehouse_db)?;
    let pb = load_progress(transformed.len());
    let report = db::load_records(&conn, &transformed, &pb)?;
    pb.finish_and_clear();

    info!(
        received = report.received,
        inserted = report.inserted,
        "Pipeline run complete"
    );
    Ok(report)
}

fn load_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    // Extracted payload → transform → load, without the network hop.
    #[test]
    fn scenario_single_record_lands_with_offset_id() {
        let body = r#"[{"id": 10, "age": 30, "number_of_dependants": 0, "income_lakhs": 8,
                        "genetical_risk": 0, "insurance_plan": "Bronze", "gender": "Male"}]"#;
        let extracted =
            crate::supabase::decode_users(reqwest::StatusCode::OK, body).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 2, 17)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let transformed = transform::transform(extracted, at).unwrap();
        assert_eq!(transformed[0].id, 8);
        assert_eq!(transformed[0].created_at, "2025-02-17 12:00:00");

        let conn = Connection::open_in_memory().unwrap();
        let pb = ProgressBar::hidden();
        db::load_records(&conn, &transformed, &pb).unwrap();
        db::load_records(&conn, &transformed, &pb).unwrap();

        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM users")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![8]);
    }

    #[test]
    fn client_requires_credentials() {
        let settings = Settings {
            supabase_url: Some("https://example.supabase.co".into()),
            supabase_api_key: None,
            warehouse_db: "unused.sqlite".into(),
            capture_db: "unused.sqlite".into(),
            model_path: None,
            http_timeout_secs: 1,
        };
        assert!(matches!(
            client(&settings).err(),
            Some(crate::error::EtlError::Config(_))
        ));
    }
}
