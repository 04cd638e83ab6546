// SPDX-License-Identifier: Apache-2.0

//! Database schema. Raw HR tables mirror the upstream sources; the prepared
//! feature table is generated from the contract so the two cannot drift.

use std::fmt::Write;
use turnover_model::{FeatureKind, CONTRACT};

const RAW_TABLES: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY,
    employee_external_id TEXT UNIQUE,
    age INTEGER,
    genre TEXT,
    statut_marital TEXT,
    niveau_education INTEGER,
    domaine_etude TEXT,
    departement TEXT,
    poste TEXT,
    distance_domicile_travail INTEGER,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS employee_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id INTEGER NOT NULL REFERENCES employees(id),
    nombre_experiences_precedentes INTEGER,
    annee_experience_totale INTEGER,
    annees_dans_l_entreprise INTEGER,
    annees_dans_le_poste_actuel INTEGER,
    niveau_hierarchique_poste INTEGER,
    revenu_mensuel INTEGER,
    augmentation_salaire_precedente TEXT,
    heures_supplementaires TEXT,
    nombre_participation_pee INTEGER,
    nb_formations_suivies INTEGER,
    frequence_deplacement TEXT,
    annees_depuis_la_derniere_promotion INTEGER,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshots_employee_created
    ON employee_snapshots(employee_id, created_at);

CREATE TABLE IF NOT EXISTS surveys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id INTEGER NOT NULL REFERENCES employees(id),
    note_evaluation_precedente INTEGER,
    note_evaluation_actuelle INTEGER,
    satisfaction_employee_environnement INTEGER,
    satisfaction_employee_nature_travail INTEGER,
    satisfaction_employee_equipe INTEGER,
    satisfaction_employee_equilibre_pro_perso INTEGER,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_surveys_employee_created
    ON surveys(employee_id, created_at);

CREATE TABLE IF NOT EXISTS ground_truth (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id INTEGER NOT NULL REFERENCES employees(id),
    a_quitte_l_entreprise INTEGER NOT NULL,
    date_event INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS prediction_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id INTEGER,
    payload_json TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id INTEGER NOT NULL REFERENCES prediction_requests(id),
    employee_id INTEGER,
    model_version TEXT NOT NULL,
    predicted_class INTEGER NOT NULL,
    predicted_proba REAL NOT NULL,
    threshold_used REAL NOT NULL,
    latency_ms INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
";

fn sqlite_type(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Int => "INTEGER",
        FeatureKind::Float => "REAL",
        FeatureKind::Category => "TEXT",
    }
}

/// DDL for the prepared feature table, one column per contract feature.
fn feature_table_sql() -> String {
    let mut sql = String::from(
        "CREATE TABLE IF NOT EXISTS ml_features_employees (\n    \
         id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
         employee_id INTEGER NOT NULL,\n    \
         created_at INTEGER NOT NULL,\n",
    );
    for feature in &CONTRACT {
        let _ = writeln!(
            sql,
            "    {} {} NOT NULL,",
            feature.name,
            sqlite_type(feature.kind)
        );
    }
    sql.push_str("    a_quitte_l_entreprise INTEGER NOT NULL\n);\n");
    sql.push_str(
        "CREATE INDEX IF NOT EXISTS idx_ml_features_employee_created\n    \
         ON ml_features_employees(employee_id, created_at);\n",
    );
    sql
}

/// Full schema, suitable for `execute_batch`.
#[must_use]
pub fn schema_sql() -> String {
    format!("{RAW_TABLES}\n{}", feature_table_sql())
}
