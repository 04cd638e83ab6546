// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Declared type of a contract feature, used for UI forms and payload
/// documentation. Vector assembly only cares about the name and the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Int,
    Float,
    Category,
}

/// One entry of the feature contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

const fn int(name: &'static str, min: f64, max: f64) -> FeatureSpec {
    FeatureSpec {
        name,
        kind: FeatureKind::Int,
        min: Some(min),
        max: Some(max),
    }
}

const fn int_min(name: &'static str, min: f64) -> FeatureSpec {
    FeatureSpec {
        name,
        kind: FeatureKind::Int,
        min: Some(min),
        max: None,
    }
}

const fn float(name: &'static str) -> FeatureSpec {
    FeatureSpec {
        name,
        kind: FeatureKind::Float,
        min: None,
        max: None,
    }
}

const fn category(name: &'static str) -> FeatureSpec {
    FeatureSpec {
        name,
        kind: FeatureKind::Category,
        min: None,
        max: None,
    }
}

pub const CONTRACT_LEN: usize = 31;

/// Canonical feature contract, in the exact order the classifier was trained
/// with. Reordering this list silently corrupts predictions; it is covered by
/// an order-pinning test and must only change together with the model
/// artifact.
pub const CONTRACT: [FeatureSpec; CONTRACT_LEN] = [
    int("note_evaluation_precedente", 1.0, 5.0),
    int("note_evaluation_actuelle", 1.0, 5.0),
    int("niveau_hierarchique_poste", 1.0, 5.0),
    int("heures_supplementaires", 0.0, 1.0),
    FeatureSpec {
        name: "augmentation_salaire_precedente",
        kind: FeatureKind::Float,
        min: Some(0.0),
        max: None,
    },
    int("age", 16.0, 80.0),
    int("genre", 0.0, 1.0),
    int_min("revenu_mensuel", 0.0),
    category("statut_marital"),
    int("niveau_education", 1.0, 5.0),
    category("domaine_etude"),
    category("departement"),
    category("poste"),
    int_min("nombre_experiences_precedentes", 0.0),
    int_min("annee_experience_totale", 0.0),
    int_min("annees_dans_l_entreprise", 0.0),
    int_min("annees_dans_le_poste_actuel", 0.0),
    int_min("nombre_participation_pee", 0.0),
    int_min("nb_formations_suivies", 0.0),
    int("frequence_deplacement", 0.0, 3.0),
    int_min("annees_depuis_la_derniere_promotion", 0.0),
    int_min("distance_domicile_travail", 0.0),
    FeatureSpec {
        name: "satisfaction_moyenne",
        kind: FeatureKind::Float,
        min: Some(0.0),
        max: Some(5.0),
    },
    float("nonlineaire_participation_pee"),
    float("ratio_heures_sup_salaire"),
    float("nonlinaire_charge_contrainte"),
    float("nonlinaire_surmenage_insatisfaction"),
    int("jeune_surcharge", 0.0, 1.0),
    float("anciennete_sans_promotion"),
    float("mobilite_carriere"),
    float("risque_global"),
];

/// Contract feature names in assembly order.
#[must_use]
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    CONTRACT.iter().map(|f| f.name)
}

#[must_use]
pub fn feature_position(name: &str) -> Option<usize> {
    CONTRACT.iter().position(|f| f.name == name)
}

#[must_use]
pub fn is_contract_feature(name: &str) -> bool {
    feature_position(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_has_exactly_thirty_one_features() {
        assert_eq!(CONTRACT.len(), CONTRACT_LEN);
        assert_eq!(feature_names().count(), 31);
    }

    #[test]
    fn contract_names_are_unique() {
        let mut names: Vec<&str> = feature_names().collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CONTRACT_LEN);
    }

    #[test]
    fn contract_order_is_pinned() {
        // The training-time column order. A failure here means the model
        // artifact and the contract went out of sync.
        let expected = [
            "note_evaluation_precedente",
            "note_evaluation_actuelle",
            "niveau_hierarchique_poste",
            "heures_supplementaires",
            "augmentation_salaire_precedente",
            "age",
            "genre",
            "revenu_mensuel",
            "statut_marital",
            "niveau_education",
            "domaine_etude",
            "departement",
            "poste",
            "nombre_experiences_precedentes",
            "annee_experience_totale",
            "annees_dans_l_entreprise",
            "annees_dans_le_poste_actuel",
            "nombre_participation_pee",
            "nb_formations_suivies",
            "frequence_deplacement",
            "annees_depuis_la_derniere_promotion",
            "distance_domicile_travail",
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
        let actual: Vec<&str> = feature_names().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn position_lookup_matches_order() {
        assert_eq!(feature_position("note_evaluation_precedente"), Some(0));
        assert_eq!(feature_position("risque_global"), Some(CONTRACT_LEN - 1));
        assert_eq!(feature_position("satisfaction_employee_equipe"), None);
        assert!(is_contract_feature("age"));
    }
}
