// SPDX-License-Identifier: Apache-2.0

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use turnover_model::{feature_names, FeatureValue};

use crate::schema::schema_sql;

/// Storage failure, carrying the underlying database message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self(err.to_string())
    }
}

/// Everything one prediction call writes to the audit log.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub payload: &'a serde_json::Value,
    pub model_version: &'a str,
    pub employee_id: Option<i64>,
    pub predicted_class: bool,
    pub predicted_proba: f64,
    pub threshold_used: f64,
    pub latency_ms: u64,
    pub created_at: i64,
}

/// One row of the audit log as returned to operators: the prediction joined
/// to the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditedPrediction {
    pub id: i64,
    pub request_id: i64,
    pub employee_id: Option<i64>,
    pub model_version: String,
    pub predicted_class: bool,
    pub predicted_proba: f64,
    pub threshold_used: f64,
    pub latency_ms: i64,
    pub created_at: i64,
    pub payload: serde_json::Value,
}

/// Owns the SQLite connection. The server wraps it in an async mutex; all
/// methods take coarse `&self`/`&mut self` borrows accordingly.
pub struct FeatureStore {
    pub(crate) conn: Connection,
}

impl FeatureStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&schema_sql())?;
        Ok(())
    }

    /// Freshest prepared feature row for one employee, or `None`.
    ///
    /// Freshness is `created_at DESC` with `id DESC` as the deterministic
    /// tie-break for rows written in the same batch.
    pub fn fetch_latest_features(
        &self,
        employee_id: i64,
    ) -> Result<Option<BTreeMap<String, FeatureValue>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM ml_features_employees
             WHERE employee_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params![employee_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut map = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            match row.get_ref(i)? {
                ValueRef::Integer(v) => {
                    map.insert(name.clone(), FeatureValue::Int(v));
                }
                ValueRef::Real(v) => {
                    map.insert(name.clone(), FeatureValue::Float(v));
                }
                ValueRef::Text(t) => {
                    map.insert(
                        name.clone(),
                        FeatureValue::Text(String::from_utf8_lossy(t).into_owned()),
                    );
                }
                ValueRef::Null | ValueRef::Blob(_) => {}
            }
        }
        Ok(Some(map))
    }

    /// Inserts one prepared feature row. The map must hold every contract
    /// feature; `a_quitte_l_entreprise` defaults to 0 when absent.
    pub fn insert_feature_row(
        &self,
        employee_id: i64,
        created_at: i64,
        row: &BTreeMap<String, FeatureValue>,
    ) -> Result<i64, StoreError> {
        let mut binds: Vec<Value> = vec![Value::Integer(employee_id), Value::Integer(created_at)];
        for name in feature_names() {
            let value = row
                .get(name)
                .ok_or_else(|| StoreError(format!("feature row is missing {name}")))?;
            binds.push(to_sql_value(value));
        }
        binds.push(match row.get("a_quitte_l_entreprise") {
            Some(v) => to_sql_value(v),
            None => Value::Integer(0),
        });
        self.conn
            .execute(&feature_insert_sql(), params_from_iter(binds))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Writes the request and its outcome as one transaction.
    ///
    /// Nothing is visible to readers until both rows exist; a failed
    /// prediction call therefore never leaves a dangling request.
    pub fn audit_prediction(&mut self, record: &AuditRecord<'_>) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(record.payload)
            .map_err(|e| StoreError(format!("serialize audit payload: {e}")))?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO prediction_requests (employee_id, payload_json, created_at)
             VALUES (?1, ?2, ?3)",
            params![record.employee_id, payload, record.created_at],
        )?;
        let request_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO predictions
                 (request_id, employee_id, model_version, predicted_class,
                  predicted_proba, threshold_used, latency_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request_id,
                record.employee_id,
                record.model_version,
                i64::from(record.predicted_class),
                record.predicted_proba,
                record.threshold_used,
                record.latency_ms as i64,
                record.created_at,
            ],
        )?;
        let prediction_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(prediction_id)
    }

    /// Most recent audit rows, newest first.
    pub fn latest_predictions(&self, limit: u32) -> Result<Vec<AuditedPrediction>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.request_id, p.employee_id, p.model_version, p.predicted_class,
                    p.predicted_proba, p.threshold_used, p.latency_ms, p.created_at,
                    r.payload_json
             FROM predictions p
             JOIN prediction_requests r ON r.id = p.request_id
             ORDER BY p.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let raw_payload: String = row.get(9)?;
            Ok(AuditedPrediction {
                id: row.get(0)?,
                request_id: row.get(1)?,
                employee_id: row.get(2)?,
                model_version: row.get(3)?,
                predicted_class: row.get::<_, i64>(4)? != 0,
                predicted_proba: row.get(5)?,
                threshold_used: row.get(6)?,
                latency_ms: row.get(7)?,
                created_at: row.get(8)?,
                payload: serde_json::from_str(&raw_payload).unwrap_or(serde_json::Value::Null),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Readiness probe: the feature table must exist and be countable.
    pub fn feature_row_count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM ml_features_employees", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);
        Ok(count)
    }
}

pub(crate) fn feature_insert_sql() -> String {
    let mut columns = vec!["employee_id".to_string(), "created_at".to_string()];
    columns.extend(feature_names().map(str::to_string));
    columns.push("a_quitte_l_entreprise".to_string());
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO ml_features_employees ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn to_sql_value(value: &FeatureValue) -> Value {
    match value {
        FeatureValue::Int(v) => Value::Integer(*v),
        FeatureValue::Float(v) => Value::Real(*v),
        FeatureValue::Text(s) => Value::Text(s.clone()),
    }
}
