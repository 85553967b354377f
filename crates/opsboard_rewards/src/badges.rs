//! Badge catalog and evaluator.
//!
//! Badges are catalog data: each one carries a [`BadgeCondition`] that is a
//! small tagged expression over [`UserStats`] rather than an opaque
//! closure, so a catalog can be loaded from TOML and every condition kind
//! can be tested on its own. Unlocks are recorded in `UserStats::badges`
//! and never revoked; the evaluator only ever reports badges that are not
//! already owned.

use crate::action::Module;
use crate::error::{Result, RewardsError};
use crate::progression::{Average, Counter, UserStats};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Incidents,
    Maintenance,
    Quality,
    LostFound,
    Procedures,
    General,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
}

impl BadgeTier {
    pub fn value(&self) -> u8 {
        match self {
            BadgeTier::Bronze => 1,
            BadgeTier::Silver => 2,
            BadgeTier::Gold => 3,
        }
    }
}

/// Unlock condition over a user's stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCondition {
    CounterAtLeast {
        counter: Counter,
        threshold: u64,
    },
    /// Needs at least `min_samples` (and always at least one) samples
    AverageAtMost {
        average: Average,
        threshold: f64,
        #[serde(default)]
        min_samples: u64,
    },
    AverageAtLeast {
        average: Average,
        threshold: f64,
        #[serde(default)]
        min_samples: u64,
    },
    /// Every listed module has a strictly positive contribution count
    AllModules {
        modules: Vec<Module>,
    },
    AllOf {
        conditions: Vec<BadgeCondition>,
    },
    /// Placeholder for unlock logic that does not exist yet; never met
    NotImplemented,
}

impl BadgeCondition {
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match self {
            BadgeCondition::CounterAtLeast { counter, threshold } => {
                stats.counter(*counter) >= *threshold
            }
            BadgeCondition::AverageAtMost { average, threshold, min_samples } => {
                enough_samples(stats, *average, *min_samples)
                    && stats.average(*average) <= *threshold
            }
            BadgeCondition::AverageAtLeast { average, threshold, min_samples } => {
                enough_samples(stats, *average, *min_samples)
                    && stats.average(*average) >= *threshold
            }
            BadgeCondition::AllModules { modules } => {
                modules.iter().all(|m| stats.contributions(*m) > 0)
            }
            BadgeCondition::AllOf { conditions } => conditions.iter().all(|c| c.is_met(stats)),
            BadgeCondition::NotImplemented => false,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        match self {
            BadgeCondition::AverageAtMost { threshold, .. }
            | BadgeCondition::AverageAtLeast { threshold, .. } => {
                if threshold.is_finite() {
                    Ok(())
                } else {
                    Err(format!("average threshold must be finite, got {}", threshold))
                }
            }
            BadgeCondition::AllModules { modules } if modules.is_empty() => {
                Err("all_modules needs at least one module".to_string())
            }
            BadgeCondition::AllOf { conditions } => {
                if conditions.is_empty() {
                    return Err("all_of needs at least one condition".to_string());
                }
                conditions.iter().try_for_each(BadgeCondition::check)
            }
            _ => Ok(()),
        }
    }
}

fn enough_samples(stats: &UserStats, average: Average, min_samples: u64) -> bool {
    stats.average_samples(average) >= min_samples.max(1)
}

/// Achievement badge definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    /// ASCII badge symbol (e.g. "[!]", "<7d>")
    pub icon: String,
    pub category: BadgeCategory,
    pub tier: BadgeTier,
    #[serde(default)]
    pub hidden: bool,
    pub condition: BadgeCondition,
}

impl Badge {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        icon: &str,
        category: BadgeCategory,
        tier: BadgeTier,
        condition: BadgeCondition,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            category,
            tier,
            hidden: false,
            condition,
        }
    }

    fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

fn at_least(counter: Counter, threshold: u64) -> BadgeCondition {
    BadgeCondition::CounterAtLeast { counter, threshold }
}

/// Built-in badge catalog
pub fn default_badges() -> Vec<Badge> {
    use BadgeCategory::*;
    use BadgeTier::*;

    vec![
        // Incidents
        Badge::new("premier_signalement", "Premier Signalement", "Signaler votre premier incident", "[!]",
            Incidents, Bronze, at_least(Counter::IncidentsCreated, 1)),
        Badge::new("oeil_de_lynx", "Œil de Lynx", "Signaler 25 incidents", "[!!]",
            Incidents, Silver, at_least(Counter::IncidentsCreated, 25)),
        Badge::new("resolveur", "Résolveur", "Résoudre 10 incidents", "[v]",
            Incidents, Bronze, at_least(Counter::IncidentsResolved, 10)),
        Badge::new("expert_resolution", "Expert en Résolution", "Résoudre 50 incidents", "[vv]",
            Incidents, Gold, at_least(Counter::IncidentsResolved, 50)),
        Badge::new("gestionnaire_de_crise", "Gestionnaire de Crise", "Résoudre un incident critique", "(!)",
            Incidents, Silver, at_least(Counter::CriticalIncidentsResolved, 1)),
        Badge::new("rapide_comme_l_eclair", "Rapide comme l'Éclair",
            "Résoudre 10 incidents avec un temps moyen de 2h ou moins", "(<<)",
            Incidents, Gold, BadgeCondition::AllOf {
                conditions: vec![
                    at_least(Counter::IncidentsResolved, 10),
                    BadgeCondition::AverageAtMost {
                        average: Average::ResolutionTime,
                        threshold: 2.0,
                        min_samples: 10,
                    },
                ],
            }),

        // Maintenance
        Badge::new("signaleur_technique", "Signaleur Technique", "Créer 10 demandes de maintenance", "{+}",
            Maintenance, Bronze, at_least(Counter::MaintenanceCreated, 10)),
        Badge::new("premier_depannage", "Premier Dépannage", "Terminer votre première maintenance", "{w}",
            Maintenance, Bronze, at_least(Counter::MaintenanceCompleted, 1)),
        Badge::new("technicien_confirme", "Technicien Confirmé", "Terminer 25 maintenances", "{ww}",
            Maintenance, Silver, at_least(Counter::MaintenanceCompleted, 25)),
        Badge::new("toujours_en_avance", "Toujours en Avance", "Terminer 10 maintenances avant l'échéance", "{>>}",
            Maintenance, Gold, at_least(Counter::MaintenanceQuickCompleted, 10)),

        // Quality
        Badge::new("premier_audit", "Premier Audit", "Réaliser votre premier contrôle qualité", "(q)",
            Quality, Bronze, at_least(Counter::QualityChecksCompleted, 1)),
        Badge::new("perfectionniste", "Perfectionniste", "Obtenir 10 contrôles au-dessus de 90", "(90+)",
            Quality, Silver, at_least(Counter::QualityHighScores, 10)),
        Badge::new("inspecteur_en_chef", "Inspecteur en Chef",
            "Réaliser 20 contrôles avec une moyenne de 85 ou plus", "(qq)",
            Quality, Gold, BadgeCondition::AllOf {
                conditions: vec![
                    at_least(Counter::QualityChecksCompleted, 20),
                    BadgeCondition::AverageAtLeast {
                        average: Average::QualityScore,
                        threshold: 85.0,
                        min_samples: 20,
                    },
                ],
            }),

        // Lost and found
        Badge::new("gardien_des_objets", "Gardien des Objets", "Enregistrer 10 objets trouvés", "<o>",
            LostFound, Bronze, at_least(Counter::LostItemsRegistered, 10)),
        Badge::new("bon_samaritain", "Bon Samaritain", "Restituer votre premier objet", "<^>",
            LostFound, Bronze, at_least(Counter::LostItemsReturned, 1)),
        Badge::new("detective", "Détective", "Restituer 20 objets", "<^^>",
            LostFound, Silver, at_least(Counter::LostItemsReturned, 20)),

        // Procedures
        Badge::new("redacteur", "Rédacteur", "Rédiger votre première procédure", "|p|",
            Procedures, Bronze, at_least(Counter::ProceduresCreated, 1)),
        Badge::new("encyclopedie", "Encyclopédie", "Rédiger 10 procédures", "|pp|",
            Procedures, Gold, at_least(Counter::ProceduresCreated, 10)),
        Badge::new("lecteur_assidu", "Lecteur Assidu", "Lire 20 procédures", "|r|",
            Procedures, Bronze, at_least(Counter::ProceduresRead, 20)),
        Badge::new("validateur", "Validateur", "Valider 10 procédures", "|ok|",
            Procedures, Silver, at_least(Counter::ProceduresValidated, 10)),

        // General
        Badge::new("habitue", "Habitué", "Se connecter 30 fois", "[30]",
            General, Bronze, at_least(Counter::TotalLogins, 30)),
        Badge::new("serie_de_7", "Semaine Parfaite", "Maintenir une série de 7 jours", "<7d>",
            General, Silver, at_least(Counter::LongestStreak, 7)),
        Badge::new("serie_de_30", "Mois Parfait", "Maintenir une série de 30 jours", "<30d>",
            General, Gold, at_least(Counter::LongestStreak, 30)),
        Badge::new("esprit_d_equipe", "Esprit d'Équipe", "Aider 10 collègues", "[&]",
            General, Silver, at_least(Counter::HelpProvided, 10)),
        Badge::new("apprecie", "Apprécié", "Recevoir 10 remerciements", "[<3]",
            General, Silver, at_least(Counter::ThanksReceived, 10)),
        Badge::new("objectifs_atteints", "Objectifs Atteints", "Compléter 4 objectifs hebdomadaires", "[#]",
            General, Silver, at_least(Counter::WeeklyGoalsCompleted, 4)),

        // Special
        Badge::new("touche_a_tout", "Touche-à-Tout", "Contribuer dans chaque module", "{*}",
            Special, Gold, BadgeCondition::AllModules { modules: Module::ALL.to_vec() }),
        Badge::new("oiseau_de_nuit", "Oiseau de Nuit", "Se connecter après minuit", "~00~",
            Special, Silver, BadgeCondition::NotImplemented).hidden(),
        Badge::new("leve_tot", "Lève-Tôt", "Se connecter avant 6h", "~05~",
            Special, Silver, BadgeCondition::NotImplemented).hidden(),
        Badge::new("legende_vivante", "Légende Vivante", "Atteindre 12 000 XP", "~***~",
            Special, Gold, at_least(Counter::Xp, 12_000)).hidden(),
    ]
}

/// A badge as shown to a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeView {
    pub badge: Badge,
    pub unlocked: bool,
}

/// Validated, immutable badge catalog
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
}

#[derive(Deserialize)]
struct CatalogFile {
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    pub fn new(badges: Vec<Badge>) -> Result<Self> {
        let mut seen = HashSet::new();
        for badge in &badges {
            if badge.id.trim().is_empty() {
                return Err(RewardsError::BadgeCatalog("badge with empty id".to_string()));
            }
            if !seen.insert(badge.id.as_str()) {
                return Err(RewardsError::BadgeCatalog(format!("duplicate badge id '{}'", badge.id)));
            }
            badge
                .condition
                .check()
                .map_err(|e| RewardsError::BadgeCatalog(format!("badge '{}': {}", badge.id, e)))?;
        }
        Ok(Self { badges })
    }

    pub fn standard() -> Result<Self> {
        Self::new(default_badges())
    }

    /// Load a catalog from TOML (`[[badges]]` tables)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)
            .map_err(|e| RewardsError::BadgeCatalog(format!("invalid catalog: {}", e)))?;
        Self::new(file.badges)
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn get(&self, id: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Badges whose condition now holds and that the user does not own yet
    pub fn evaluate<'a>(&'a self, stats: &UserStats) -> Vec<&'a Badge> {
        self.badges
            .iter()
            .filter(|b| !stats.has_badge(&b.id))
            .filter(|b| b.condition.is_met(stats))
            .collect()
    }

    /// Owned badges, plus non-hidden badges whose condition currently holds.
    ///
    /// Hidden badges only show up once owned.
    pub fn visible(&self, stats: &UserStats) -> Vec<BadgeView> {
        self.badges
            .iter()
            .filter_map(|b| {
                let owned = stats.has_badge(&b.id);
                if owned || (!b.hidden && b.condition.is_met(stats)) {
                    Some(BadgeView { badge: b.clone(), unlocked: owned })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Format owned badges for display
pub fn format_badges(views: &[BadgeView], max_display: usize) -> String {
    let unlocked: Vec<_> = views.iter().filter(|v| v.unlocked).collect();
    if unlocked.is_empty() {
        return String::new();
    }

    let badges: String = unlocked
        .iter()
        .take(max_display)
        .map(|v| v.badge.icon.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if unlocked.len() > max_display {
        format!("{} +{} more", badges, unlocked.len() - max_display)
    } else {
        badges
    }
}

/// Format a single unlock notification
pub fn format_badge_unlock(badge: &Badge) -> String {
    format!("{} Badge unlocked: {} - {}", badge.icon, badge.name, badge.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stats() -> UserStats {
        UserStats::new("u", Utc::now())
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = BadgeCatalog::standard().unwrap();
        assert!(catalog.contains("gestionnaire_de_crise"));
        assert!(catalog.get("oiseau_de_nuit").unwrap().hidden);
    }

    #[test]
    fn test_counter_condition() {
        let cond = at_least(Counter::IncidentsResolved, 3);
        let mut s = stats();
        s.incidents_resolved = 2;
        assert!(!cond.is_met(&s));
        s.incidents_resolved = 3;
        assert!(cond.is_met(&s));
    }

    #[test]
    fn test_average_condition_needs_samples() {
        let cond = BadgeCondition::AverageAtMost {
            average: Average::ResolutionTime,
            threshold: 2.0,
            min_samples: 0,
        };
        let mut s = stats();
        // avg 0.0 with no samples must not count
        assert!(!cond.is_met(&s));
        s.incidents_resolved = 1;
        // resolved but untimed: still no samples
        assert!(!cond.is_met(&s));
        s.resolution_time_samples = 1;
        s.avg_resolution_time = 1.5;
        assert!(cond.is_met(&s));
        s.avg_resolution_time = 2.5;
        assert!(!cond.is_met(&s));
    }

    #[test]
    fn test_all_modules_condition() {
        let cond = BadgeCondition::AllModules { modules: Module::ALL.to_vec() };
        let mut s = stats();
        for module in &Module::ALL[..4] {
            s.contributions_per_module.insert(*module, 2);
        }
        assert!(!cond.is_met(&s));
        s.contributions_per_module.insert(Module::Procedures, 0);
        assert!(!cond.is_met(&s));
        s.contributions_per_module.insert(Module::Procedures, 1);
        assert!(cond.is_met(&s));
    }

    #[test]
    fn test_all_of_condition() {
        let cond = BadgeCondition::AllOf {
            conditions: vec![at_least(Counter::TotalLogins, 1), at_least(Counter::HelpProvided, 1)],
        };
        let mut s = stats();
        s.total_logins = 1;
        assert!(!cond.is_met(&s));
        s.help_provided = 1;
        assert!(cond.is_met(&s));
    }

    #[test]
    fn test_not_implemented_never_met() {
        let mut s = stats();
        s.total_logins = 10_000;
        s.xp = u64::MAX;
        assert!(!BadgeCondition::NotImplemented.is_met(&s));
    }

    #[test]
    fn test_evaluate_skips_owned() {
        let catalog = BadgeCatalog::standard().unwrap();
        let mut s = stats();
        s.incidents_created = 1;
        let first: Vec<_> = catalog.evaluate(&s).iter().map(|b| b.id.clone()).collect();
        assert_eq!(first, vec!["premier_signalement".to_string()]);

        s.badges.extend(first);
        assert!(catalog.evaluate(&s).is_empty());
    }

    #[test]
    fn test_visible_hides_hidden_until_owned() {
        let catalog = BadgeCatalog::standard().unwrap();
        let mut s = stats();
        s.xp = 20_000;
        s.lost_items_returned = 1;

        let ids: Vec<_> = catalog.visible(&s).into_iter().map(|v| v.badge.id).collect();
        assert!(ids.contains(&"bon_samaritain".to_string()));
        assert!(!ids.contains(&"legende_vivante".to_string()));

        s.badges.insert("legende_vivante".to_string());
        let views = catalog.visible(&s);
        let legend = views.iter().find(|v| v.badge.id == "legende_vivante").unwrap();
        assert!(legend.unlocked);
        let samaritan = views.iter().find(|v| v.badge.id == "bon_samaritain").unwrap();
        assert!(!samaritan.unlocked);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_empty_compounds() {
        let mut badges = default_badges();
        badges.push(badges[0].clone());
        assert!(matches!(BadgeCatalog::new(badges), Err(RewardsError::BadgeCatalog(_))));

        let mut badges = default_badges();
        badges[0].condition = BadgeCondition::AllModules { modules: vec![] };
        assert!(BadgeCatalog::new(badges).is_err());

        let mut badges = default_badges();
        badges[0].condition = BadgeCondition::AllOf { conditions: vec![] };
        assert!(BadgeCatalog::new(badges).is_err());
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = BadgeCatalog::from_toml_str(
            r#"
            [[badges]]
            id = "night_shift"
            name = "Night Shift"
            description = "Resolve 5 incidents"
            icon = "[n]"
            category = "incidents"
            tier = "silver"
            condition = { type = "counter_at_least", counter = "incidents_resolved", threshold = 5 }

            [[badges]]
            id = "everywhere"
            name = "Everywhere"
            description = "Contribute to quality and procedures"
            icon = "{*}"
            category = "special"
            tier = "gold"
            hidden = true
            condition = { type = "all_modules", modules = ["quality", "procedures"] }
            "#,
        )
        .unwrap();
        assert_eq!(catalog.badges().len(), 2);
        assert_eq!(catalog.get("night_shift").unwrap().tier.value(), 2);
        assert!(catalog.get("everywhere").unwrap().hidden);
    }

    #[test]
    fn test_format_badges() {
        let catalog = BadgeCatalog::standard().unwrap();
        let views: Vec<_> = catalog
            .badges()
            .iter()
            .take(3)
            .map(|b| BadgeView { badge: b.clone(), unlocked: true })
            .collect();
        assert_eq!(format_badges(&views, 2), "[!] [!!] +1 more");
        assert!(format_badge_unlock(&views[0].badge).contains("Premier Signalement"));
    }
}
