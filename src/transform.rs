use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::record::{sql_value, SourceRecord, WarehouseRecord};

/// Subtracted from every source id before loading.
pub const ID_OFFSET: i64 = 2;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock time in the process's local zone, taken once per batch.
pub fn batch_timestamp() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Remap extracted rows into warehouse rows. All rows share `captured_at`.
pub fn transform(
    records: Vec<SourceRecord>,
    captured_at: NaiveDateTime,
) -> Result<Vec<WarehouseRecord>> {
    if records.is_empty() {
        return Err(EtlError::EmptyInput);
    }

    let created_at = captured_at.format(TIMESTAMP_FORMAT).to_string();
    let transformed = records
        .into_iter()
        .map(|r| {
            let source_id = r.id.unwrap_or(0);
            let id = source_id
                .checked_sub(ID_OFFSET)
                .ok_or(EtlError::IdOutOfRange(source_id))?;
            Ok(WarehouseRecord {
                id,
                age: r.age.and_then(sql_value),
                number_of_dependants: r.number_of_dependants.and_then(sql_value),
                income_lakhs: r.income_lakhs.and_then(sql_value),
                genetical_risk: r.genetical_risk.and_then(scalar_text),
                insurance_plan: r.insurance_plan,
                employment_status: r.employment_status,
                gender: r.gender,
                marital_status: r.marital_status,
                bmi_category: r.bmi_category,
                smoking_status: r.smoking_status,
                region: r.region,
                medical_history: r.medical_history,
                created_at: created_at.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Transformed {} records", transformed.len());
    Ok(transformed)
}

// genetical_risk lands in a VARCHAR column whatever JSON type the source used.
fn scalar_text(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rusqlite::types::Value as SqlValue;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn records(json: &str) -> Vec<SourceRecord> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_input_fails() {
        let err = transform(Vec::new(), at()).unwrap_err();
        assert!(matches!(err, EtlError::EmptyInput));
    }

    #[test]
    fn ids_are_offset_and_length_preserved() {
        let input = records(r#"[{"id": 10}, {"id": 3}, {"id": 1}, {"id": 250}]"#);
        let out = transform(input, at()).unwrap();
        let ids: Vec<i64> = out.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![8, 1, -1, 248]);
    }

    #[test]
    fn missing_id_reads_as_zero() {
        let out = transform(records(r#"[{"age": 40}]"#), at()).unwrap();
        assert_eq!(out[0].id, -2);
        assert_eq!(out[0].age, Some(SqlValue::Integer(40)));
    }

    #[test]
    fn whole_batch_shares_one_timestamp() {
        let out = transform(records(r#"[{"id": 5}, {"id": 6}, {"id": 7}]"#), at()).unwrap();
        assert!(out.iter().all(|r| r.created_at == "2025-02-17 09:30:00"));
    }

    #[test]
    fn fields_pass_through_and_missing_become_null() {
        let input = records(
            r#"[{"id": 10, "age": 30, "number_of_dependants": 1, "income_lakhs": 14.5,
                 "genetical_risk": 2, "insurance_plan": "Gold", "gender": "Male",
                 "medical_history": "Diabetes & Thyroid"}]"#,
        );
        let out = transform(input, at()).unwrap();
        let r = &out[0];
        assert_eq!(r.id, 8);
        assert_eq!(r.age, Some(SqlValue::Integer(30)));
        assert_eq!(r.number_of_dependants, Some(SqlValue::Integer(1)));
        assert_eq!(r.income_lakhs, Some(SqlValue::Real(14.5)));
        assert_eq!(r.genetical_risk.as_deref(), Some("2"));
        assert_eq!(r.insurance_plan.as_deref(), Some("Gold"));
        assert_eq!(r.medical_history.as_deref(), Some("Diabetes & Thyroid"));
        assert!(r.employment_status.is_none());
        assert!(r.region.is_none());
    }

    #[test]
    fn id_underflow_is_an_error_not_a_wrap() {
        let input = records(r#"[{"id": 5}, {"id": -9223372036854775808}]"#);
        let err = transform(input, at()).unwrap_err();
        assert!(matches!(err, EtlError::IdOutOfRange(i64::MIN)));
    }

    #[test]
    fn loosely_typed_numbers_pass_through() {
        let input = records(r#"[{"id": 10, "age": 30.0, "income_lakhs": "12"}]"#);
        let out = transform(input, at()).unwrap();
        assert_eq!(out[0].id, 8);
        assert_eq!(out[0].age, Some(SqlValue::Real(30.0)));
        assert_eq!(out[0].income_lakhs, Some(SqlValue::Text("12".into())));
    }

    #[test]
    fn textual_risk_is_kept_verbatim() {
        let out = transform(records(r#"[{"id": 4, "genetical_risk": "3"}]"#), at()).unwrap();
        assert_eq!(out[0].genetical_risk.as_deref(), Some("3"));
    }
}
