// SPDX-License-Identifier: Apache-2.0

use crate::value::FeatureValue;
use std::collections::BTreeMap;

/// Satisfaction sub-scores consumed by the engineered features. They are part
/// of the raw attribute set but never part of the contract; the projection
/// step removes them before a row reaches storage.
pub const SATISFACTION_FIELDS: [&str; 4] = [
    "satisfaction_employee_environnement",
    "satisfaction_employee_nature_travail",
    "satisfaction_employee_equipe",
    "satisfaction_employee_equilibre_pro_perso",
];

/// Names of the nine engineered features, in the order they are computed.
pub const ENGINEERED_FEATURES: [&str; 9] = [
    "satisfaction_moyenne",
    "nonlineaire_participation_pee",
    "ratio_heures_sup_salaire",
    "nonlinaire_charge_contrainte",
    "nonlinaire_surmenage_insatisfaction",
    "jeune_surcharge",
    "anciennete_sans_promotion",
    "mobilite_carriere",
    "risque_global",
];

/// Lenient numeric coercion for the interactive scoring path: anything that
/// is not numeric-coercible becomes 0.0. The batch pipeline is stricter and
/// drops such rows before this function ever sees them.
#[must_use]
pub fn lenient_f64(values: &BTreeMap<String, FeatureValue>, name: &str) -> f64 {
    values.get(name).and_then(FeatureValue::as_f64).unwrap_or(0.0)
}

#[must_use]
pub fn lenient_i64(values: &BTreeMap<String, FeatureValue>, name: &str) -> i64 {
    values.get(name).and_then(FeatureValue::as_i64).unwrap_or(0)
}

/// Computes the nine engineered features and merges them into a copy of the
/// input map.
///
/// The formulas are fixed: the "+1" and "+10" offsets are the only guard
/// against zero denominators, and the float operation order must stay exactly
/// as written so that the batch pipeline and the interactive path produce
/// bit-identical values. Pure and infallible: missing or non-numeric inputs
/// coerce to zero.
///
/// The four satisfaction sub-scores stay in the returned map; callers that
/// persist rows run [`drop_satisfaction_fields`] afterwards.
#[must_use]
pub fn compute_engineered(values: &BTreeMap<String, FeatureValue>) -> BTreeMap<String, FeatureValue> {
    let mut out = values.clone();

    let sat_env = lenient_f64(values, "satisfaction_employee_environnement");
    let sat_nature = lenient_f64(values, "satisfaction_employee_nature_travail");
    let sat_equipe = lenient_f64(values, "satisfaction_employee_equipe");
    let sat_wlb = lenient_f64(values, "satisfaction_employee_equilibre_pro_perso");
    let satisfaction_moyenne = (sat_env + sat_nature + sat_equipe + sat_wlb) / 4.0;
    out.insert(
        "satisfaction_moyenne".to_string(),
        FeatureValue::Float(satisfaction_moyenne),
    );

    let pee = lenient_f64(values, "nombre_participation_pee");
    let anciennete = lenient_f64(values, "annees_dans_l_entreprise");
    out.insert(
        "nonlineaire_participation_pee".to_string(),
        FeatureValue::Float(pee / (pee + anciennete + 1.0)),
    );

    let heures_sup = lenient_f64(values, "heures_supplementaires");
    let revenu = lenient_f64(values, "revenu_mensuel");
    let ratio_heures_sup_salaire = heures_sup / (revenu + 1.0);
    out.insert(
        "ratio_heures_sup_salaire".to_string(),
        FeatureValue::Float(ratio_heures_sup_salaire),
    );

    // d / (d+10)^2, written as two divisions to match the training pipeline.
    let distance = lenient_f64(values, "distance_domicile_travail");
    out.insert(
        "nonlinaire_charge_contrainte".to_string(),
        FeatureValue::Float(heures_sup * distance / (distance + 10.0) / (distance + 10.0)),
    );

    out.insert(
        "nonlinaire_surmenage_insatisfaction".to_string(),
        FeatureValue::Float(heures_sup * (1.0 - satisfaction_moyenne)),
    );

    let age = lenient_i64(values, "age");
    let jeune_surcharge = i64::from(age < 30 && heures_sup == 1.0);
    out.insert(
        "jeune_surcharge".to_string(),
        FeatureValue::Int(jeune_surcharge),
    );

    let depuis_promo = lenient_f64(values, "annees_depuis_la_derniere_promotion");
    let anciennete_sans_promotion = (anciennete - depuis_promo) / (anciennete + 1.0);
    out.insert(
        "anciennete_sans_promotion".to_string(),
        FeatureValue::Float(anciennete_sans_promotion),
    );

    let nb_exp = lenient_f64(values, "nombre_experiences_precedentes");
    let tot_exp = lenient_f64(values, "annee_experience_totale");
    out.insert(
        "mobilite_carriere".to_string(),
        FeatureValue::Float(nb_exp / (tot_exp + 1.0)),
    );

    out.insert(
        "risque_global".to_string(),
        FeatureValue::Float(
            ratio_heures_sup_salaire * anciennete_sans_promotion * (1.0 - satisfaction_moyenne),
        ),
    );

    out
}

/// Projection step: removes the satisfaction sub-scores from a computed row.
pub fn drop_satisfaction_fields(values: &mut BTreeMap<String, FeatureValue>) {
    for name in SATISFACTION_FIELDS {
        values.remove(name);
    }
}
