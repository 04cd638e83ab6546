// SPDX-License-Identifier: Apache-2.0

//! Batch feature pipeline: joins the freshest raw HR rows per employee,
//! applies strict type coercions, computes the engineered features and
//! writes one batch to the prepared feature table in one transaction.
//!
//! Unlike the interactive scoring path, this path never guesses: a value
//! that fails coercion makes its row incomplete, and incomplete rows are
//! dropped before insertion.

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use turnover_model::{
    compute_engineered, drop_satisfaction_fields, feature_names, FeatureValue,
    ENGINEERED_FEATURES, SATISFACTION_FIELDS,
};

use crate::store::{feature_insert_sql, to_sql_value, FeatureStore, StoreError};

/// Columns that must survive coercion for the run to proceed at all. More
/// than 20% missing on any of them aborts the run without writing.
const CRITICAL_COLUMNS: [&str; 5] = [
    "employee_id",
    "age",
    "revenu_mensuel",
    "heures_supplementaires",
    "a_quitte_l_entreprise",
];

const MAX_CRITICAL_MISSING_RATIO: f64 = 0.20;

/// Raw columns coerced to integers on the strict path.
const INT_COLUMNS: [&str; 20] = [
    "employee_id",
    "age",
    "revenu_mensuel",
    "niveau_education",
    "distance_domicile_travail",
    "note_evaluation_precedente",
    "note_evaluation_actuelle",
    "niveau_hierarchique_poste",
    "nombre_experiences_precedentes",
    "annee_experience_totale",
    "annees_dans_l_entreprise",
    "annees_dans_le_poste_actuel",
    "annees_depuis_la_derniere_promotion",
    "nombre_participation_pee",
    "nb_formations_suivies",
    "a_quitte_l_entreprise",
    "satisfaction_employee_environnement",
    "satisfaction_employee_nature_travail",
    "satisfaction_employee_equipe",
    "satisfaction_employee_equilibre_pro_perso",
];

/// What a pipeline run does with batches from earlier runs.
///
/// `Append` is the default: each run adds a newer batch and the freshness
/// resolver keeps reading the most recent row per employee. `Refresh` clears
/// the table first, for rebuilding from scratch after a raw-data correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Append,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Too many rows lost a critical column; nothing was written.
    QualityGate { columns: Vec<String> },
    Storage(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QualityGate { columns } => {
                write!(f, "quality gate failed, critical columns too sparse: {columns:?}")
            }
            Self::Storage(msg) => write!(f, "pipeline storage failure: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Employees with both a snapshot and a survey.
    pub source_rows: usize,
    /// Rows written to the prepared feature table.
    pub written_rows: usize,
    /// Rows dropped for failed coercion or missing fields.
    pub dropped_rows: usize,
}

/// Freshest snapshot, survey and ground-truth row per employee. Employees
/// without a snapshot or survey cannot be featurized and are excluded;
/// a missing ground-truth row means the employee has not left.
const MASTER_SQL: &str = "
SELECT
  e.id AS employee_id,
  e.age, e.genre, e.statut_marital, e.niveau_education, e.domaine_etude,
  e.departement, e.poste, e.distance_domicile_travail,
  s.nombre_experiences_precedentes, s.annee_experience_totale,
  s.annees_dans_l_entreprise, s.annees_dans_le_poste_actuel,
  s.niveau_hierarchique_poste, s.revenu_mensuel,
  s.augmentation_salaire_precedente, s.heures_supplementaires,
  s.nombre_participation_pee, s.nb_formations_suivies,
  s.frequence_deplacement, s.annees_depuis_la_derniere_promotion,
  sv.note_evaluation_precedente, sv.note_evaluation_actuelle,
  sv.satisfaction_employee_environnement, sv.satisfaction_employee_nature_travail,
  sv.satisfaction_employee_equipe, sv.satisfaction_employee_equilibre_pro_perso,
  COALESCE(gt.a_quitte_l_entreprise, 0) AS a_quitte_l_entreprise
FROM employees e
JOIN employee_snapshots s ON s.id = (
  SELECT id FROM employee_snapshots
  WHERE employee_id = e.id
  ORDER BY created_at DESC, id DESC LIMIT 1)
JOIN surveys sv ON sv.id = (
  SELECT id FROM surveys
  WHERE employee_id = e.id
  ORDER BY created_at DESC, id DESC LIMIT 1)
LEFT JOIN ground_truth gt ON gt.id = (
  SELECT id FROM ground_truth
  WHERE employee_id = e.id
  ORDER BY date_event DESC, id DESC LIMIT 1)
ORDER BY e.id
";

impl FeatureStore {
    /// Runs the full pipeline and writes one batch to the prepared feature
    /// table.
    ///
    /// `now_ms` stamps every written row, so one run produces one batch of
    /// equal `created_at` values and the freshness resolver falls back to
    /// row ids within it. With [`WriteMode::Refresh`] the table is cleared
    /// in the same transaction before the batch goes in.
    pub fn rebuild_features(
        &mut self,
        now_ms: i64,
        mode: WriteMode,
    ) -> Result<PipelineReport, PipelineError> {
        let raw_rows = self.fetch_master_rows()?;
        let source_rows = raw_rows.len();
        let cleaned: Vec<BTreeMap<String, FeatureValue>> =
            raw_rows.iter().map(clean_raw_row).collect();

        if source_rows > 0 {
            let sparse = sparse_critical_columns(&cleaned);
            if !sparse.is_empty() {
                return Err(PipelineError::QualityGate { columns: sparse });
            }
        }

        let mut complete = Vec::new();
        let mut dropped_rows = 0usize;
        for row in cleaned {
            if required_base_fields().any(|name| !row.contains_key(name)) {
                dropped_rows += 1;
                continue;
            }
            let mut featurized = compute_engineered(&row);
            drop_satisfaction_fields(&mut featurized);
            complete.push(featurized);
        }

        let written_rows = self.write_feature_batch(&complete, now_ms, mode)?;
        tracing::info!(
            source_rows,
            written_rows,
            dropped_rows,
            refresh = matches!(mode, WriteMode::Refresh),
            "feature batch written"
        );
        Ok(PipelineReport {
            source_rows,
            written_rows,
            dropped_rows,
        })
    }

    fn fetch_master_rows(&self) -> Result<Vec<BTreeMap<String, FeatureValue>>, PipelineError> {
        let mut stmt = self.conn.prepare(MASTER_SQL)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = BTreeMap::new();
            for (i, name) in names.iter().enumerate() {
                match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Integer(v) => {
                        map.insert(name.clone(), FeatureValue::Int(v));
                    }
                    rusqlite::types::ValueRef::Real(v) => {
                        map.insert(name.clone(), FeatureValue::Float(v));
                    }
                    rusqlite::types::ValueRef::Text(t) => {
                        map.insert(
                            name.clone(),
                            FeatureValue::Text(String::from_utf8_lossy(t).into_owned()),
                        );
                    }
                    rusqlite::types::ValueRef::Null | rusqlite::types::ValueRef::Blob(_) => {}
                }
            }
            out.push(map);
        }
        Ok(out)
    }

    fn write_feature_batch(
        &mut self,
        rows: &[BTreeMap<String, FeatureValue>],
        now_ms: i64,
        mode: WriteMode,
    ) -> Result<usize, PipelineError> {
        let tx = self.conn.transaction()?;
        if mode == WriteMode::Refresh {
            tx.execute("DELETE FROM ml_features_employees", [])?;
        }
        let insert_sql = feature_insert_sql();
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for row in rows {
                let Some(employee_id) = row.get("employee_id").and_then(FeatureValue::as_i64)
                else {
                    continue;
                };
                let mut binds: Vec<Value> =
                    vec![Value::Integer(employee_id), Value::Integer(now_ms)];
                let mut incomplete = false;
                for name in feature_names() {
                    match row.get(name) {
                        Some(v) => binds.push(to_sql_value(v)),
                        None => {
                            incomplete = true;
                            break;
                        }
                    }
                }
                if incomplete {
                    continue;
                }
                binds.push(match row.get("a_quitte_l_entreprise") {
                    Some(v) => to_sql_value(v),
                    None => Value::Integer(0),
                });
                stmt.execute(params_from_iter(binds))?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

/// Base (non-engineered) fields a row needs before feature engineering,
/// including the satisfaction sub-scores the engineered features consume.
fn required_base_fields() -> impl Iterator<Item = &'static str> {
    feature_names()
        .filter(|name| !ENGINEERED_FEATURES.contains(name))
        .chain(SATISFACTION_FIELDS)
        .chain(["employee_id", "a_quitte_l_entreprise"])
}

/// Critical columns whose post-coercion missing ratio exceeds the gate.
fn sparse_critical_columns(rows: &[BTreeMap<String, FeatureValue>]) -> Vec<String> {
    let total = rows.len() as f64;
    CRITICAL_COLUMNS
        .iter()
        .filter(|name| {
            let missing = rows.iter().filter(|row| !row.contains_key(**name)).count();
            missing as f64 / total > MAX_CRITICAL_MISSING_RATIO
        })
        .map(|name| (*name).to_string())
        .collect()
}

/// Strict coercion of one raw row. Values that fail coercion are removed,
/// which later makes the row incomplete.
fn clean_raw_row(raw: &BTreeMap<String, FeatureValue>) -> BTreeMap<String, FeatureValue> {
    let mut out = raw.clone();

    apply(&mut out, "augmentation_salaire_precedente", coerce_percent);
    apply(&mut out, "heures_supplementaires", coerce_yes_no);
    apply(&mut out, "genre", coerce_gender);
    apply(&mut out, "frequence_deplacement", coerce_travel_frequency);
    for name in INT_COLUMNS {
        apply(&mut out, name, coerce_int);
    }
    out
}

fn apply(
    row: &mut BTreeMap<String, FeatureValue>,
    name: &str,
    coerce: fn(&FeatureValue) -> Option<FeatureValue>,
) {
    if let Some(value) = row.get(name) {
        match coerce(value) {
            Some(coerced) => {
                row.insert(name.to_string(), coerced);
            }
            None => {
                row.remove(name);
            }
        }
    }
}

/// `"12 %"` and friends become plain floats; the percent sign is cosmetic.
fn coerce_percent(value: &FeatureValue) -> Option<FeatureValue> {
    match value {
        FeatureValue::Text(s) => s
            .replace('%', "")
            .trim()
            .parse::<f64>()
            .ok()
            .map(FeatureValue::Float),
        FeatureValue::Int(v) => Some(FeatureValue::Float(*v as f64)),
        FeatureValue::Float(v) => Some(FeatureValue::Float(*v)),
    }
}

fn coerce_yes_no(value: &FeatureValue) -> Option<FeatureValue> {
    match value {
        FeatureValue::Text(s) => match s.trim() {
            "Oui" | "oui" => Some(FeatureValue::Int(1)),
            "Non" | "non" => Some(FeatureValue::Int(0)),
            _ => None,
        },
        FeatureValue::Int(v @ (0 | 1)) => Some(FeatureValue::Int(*v)),
        _ => None,
    }
}

fn coerce_gender(value: &FeatureValue) -> Option<FeatureValue> {
    match value {
        FeatureValue::Text(s) => match s.trim() {
            "M" => Some(FeatureValue::Int(1)),
            "F" => Some(FeatureValue::Int(0)),
            _ => None,
        },
        FeatureValue::Int(v @ (0 | 1)) => Some(FeatureValue::Int(*v)),
        _ => None,
    }
}

fn coerce_travel_frequency(value: &FeatureValue) -> Option<FeatureValue> {
    match value {
        FeatureValue::Text(s) => match s.trim() {
            "Aucun" => Some(FeatureValue::Int(0)),
            "Occasionnel" => Some(FeatureValue::Int(1)),
            "Frequent" | "Fréquent" => Some(FeatureValue::Int(2)),
            _ => None,
        },
        FeatureValue::Int(v @ 0..=3) => Some(FeatureValue::Int(*v)),
        _ => None,
    }
}

fn coerce_int(value: &FeatureValue) -> Option<FeatureValue> {
    match value {
        FeatureValue::Int(v) => Some(FeatureValue::Int(*v)),
        FeatureValue::Float(v) if v.is_finite() => Some(FeatureValue::Int(v.trunc() as i64)),
        FeatureValue::Float(_) => None,
        FeatureValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| FeatureValue::Int(v.trunc() as i64)),
    }
}
