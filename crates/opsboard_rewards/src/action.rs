//! Scoring actions reported by the host application.
//!
//! [`Action`] is the closed, typed set the engine scores. Hosts usually
//! hold the loosely-typed [`ActionRequest`] (decoded from JSON) and convert
//! it with `Action::try_from`, which is where unknown kinds and missing
//! payload fields are rejected. Nothing here touches a user's stats.

use crate::error::{Result, RewardsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind tag of an action, in its kebab-case wire spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    CreateIncident,
    ResolveIncident,
    CreateMaintenance,
    CompleteMaintenance,
    CompleteQualityCheck,
    RegisterLostItem,
    ReturnLostItem,
    CreateProcedure,
    ReadProcedure,
    ValidateProcedure,
    Login,
    HelpColleague,
    ReceiveThanks,
    CompleteWeeklyGoal,
}

impl ActionKind {
    pub const ALL: [ActionKind; 14] = [
        ActionKind::CreateIncident,
        ActionKind::ResolveIncident,
        ActionKind::CreateMaintenance,
        ActionKind::CompleteMaintenance,
        ActionKind::CompleteQualityCheck,
        ActionKind::RegisterLostItem,
        ActionKind::ReturnLostItem,
        ActionKind::CreateProcedure,
        ActionKind::ReadProcedure,
        ActionKind::ValidateProcedure,
        ActionKind::Login,
        ActionKind::HelpColleague,
        ActionKind::ReceiveThanks,
        ActionKind::CompleteWeeklyGoal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateIncident => "create-incident",
            ActionKind::ResolveIncident => "resolve-incident",
            ActionKind::CreateMaintenance => "create-maintenance",
            ActionKind::CompleteMaintenance => "complete-maintenance",
            ActionKind::CompleteQualityCheck => "complete-quality-check",
            ActionKind::RegisterLostItem => "register-lost-item",
            ActionKind::ReturnLostItem => "return-lost-item",
            ActionKind::CreateProcedure => "create-procedure",
            ActionKind::ReadProcedure => "read-procedure",
            ActionKind::ValidateProcedure => "validate-procedure",
            ActionKind::Login => "login",
            ActionKind::HelpColleague => "help-colleague",
            ActionKind::ReceiveThanks => "receive-thanks",
            ActionKind::CompleteWeeklyGoal => "complete-weekly-goal",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| RewardsError::malformed(format!("unknown action kind '{}'", s)))
    }
}

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl FromStr for Severity {
    type Err = RewardsError;

    /// Accepts the English names and the French labels the dashboard uses.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "faible" | "basse" => Ok(Severity::Low),
            "medium" | "moyenne" | "normale" => Ok(Severity::Medium),
            "high" | "haute" | "élevée" | "elevee" => Ok(Severity::High),
            "critical" | "critique" => Ok(Severity::Critical),
            other => Err(RewardsError::malformed(format!("unknown severity '{}'", other))),
        }
    }
}

/// Dashboard module a domain action contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Incidents,
    Maintenance,
    Quality,
    LostFound,
    Procedures,
}

impl Module {
    pub const ALL: [Module; 5] = [
        Module::Incidents,
        Module::Maintenance,
        Module::Quality,
        Module::LostFound,
        Module::Procedures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Incidents => "incidents",
            Module::Maintenance => "maintenance",
            Module::Quality => "quality",
            Module::LostFound => "lost_found",
            Module::Procedures => "procedures",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scoring-relevant event
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateIncident {
        severity: Option<Severity>,
    },
    ResolveIncident {
        severity: Option<Severity>,
        /// Hours between report and resolution
        resolution_time: Option<f64>,
    },
    CreateMaintenance,
    CompleteMaintenance {
        before_schedule: bool,
    },
    CompleteQualityCheck {
        /// Audit score, 0-100
        score: f64,
    },
    RegisterLostItem,
    ReturnLostItem,
    CreateProcedure,
    ReadProcedure,
    ValidateProcedure,
    Login,
    HelpColleague,
    ReceiveThanks,
    CompleteWeeklyGoal,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateIncident { .. } => ActionKind::CreateIncident,
            Action::ResolveIncident { .. } => ActionKind::ResolveIncident,
            Action::CreateMaintenance => ActionKind::CreateMaintenance,
            Action::CompleteMaintenance { .. } => ActionKind::CompleteMaintenance,
            Action::CompleteQualityCheck { .. } => ActionKind::CompleteQualityCheck,
            Action::RegisterLostItem => ActionKind::RegisterLostItem,
            Action::ReturnLostItem => ActionKind::ReturnLostItem,
            Action::CreateProcedure => ActionKind::CreateProcedure,
            Action::ReadProcedure => ActionKind::ReadProcedure,
            Action::ValidateProcedure => ActionKind::ValidateProcedure,
            Action::Login => ActionKind::Login,
            Action::HelpColleague => ActionKind::HelpColleague,
            Action::ReceiveThanks => ActionKind::ReceiveThanks,
            Action::CompleteWeeklyGoal => ActionKind::CompleteWeeklyGoal,
        }
    }

    /// Module this action counts toward, if it is a domain action
    pub fn module(&self) -> Option<Module> {
        match self {
            Action::CreateIncident { .. } | Action::ResolveIncident { .. } => Some(Module::Incidents),
            Action::CreateMaintenance | Action::CompleteMaintenance { .. } => Some(Module::Maintenance),
            Action::CompleteQualityCheck { .. } => Some(Module::Quality),
            Action::RegisterLostItem | Action::ReturnLostItem => Some(Module::LostFound),
            Action::CreateProcedure | Action::ReadProcedure | Action::ValidateProcedure => {
                Some(Module::Procedures)
            }
            Action::Login
            | Action::HelpColleague
            | Action::ReceiveThanks
            | Action::CompleteWeeklyGoal => None,
        }
    }

    /// Check numeric payloads. Run before any stats are touched.
    pub fn validate(&self) -> Result<()> {
        match self {
            Action::ResolveIncident { resolution_time: Some(hours), .. } => {
                if !hours.is_finite() || *hours < 0.0 {
                    return Err(RewardsError::malformed(format!(
                        "resolution_time must be a non-negative number of hours, got {}",
                        hours
                    )));
                }
            }
            Action::CompleteQualityCheck { score } => {
                if !score.is_finite() || !(0.0..=100.0).contains(score) {
                    return Err(RewardsError::malformed(format!(
                        "quality score must be within 0-100, got {}",
                        score
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Loosely-typed action as received from the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, alias = "resolutionTime", skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, alias = "beforeSchedule", skip_serializing_if = "Option::is_none")]
    pub before_schedule: Option<bool>,
}

impl ActionRequest {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<ActionRequest> for Action {
    type Error = RewardsError;

    fn try_from(req: ActionRequest) -> Result<Self> {
        let kind: ActionKind = req.kind.parse()?;
        let severity = req
            .severity
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Severity>)
            .transpose()?;

        let action = match kind {
            ActionKind::CreateIncident => Action::CreateIncident { severity },
            ActionKind::ResolveIncident => Action::ResolveIncident {
                severity,
                resolution_time: req.resolution_time,
            },
            ActionKind::CreateMaintenance => Action::CreateMaintenance,
            ActionKind::CompleteMaintenance => Action::CompleteMaintenance {
                before_schedule: req.before_schedule.unwrap_or(false),
            },
            ActionKind::CompleteQualityCheck => match req.score {
                Some(score) => Action::CompleteQualityCheck { score },
                None => {
                    return Err(RewardsError::malformed(
                        "complete-quality-check requires a score",
                    ))
                }
            },
            ActionKind::RegisterLostItem => Action::RegisterLostItem,
            ActionKind::ReturnLostItem => Action::ReturnLostItem,
            ActionKind::CreateProcedure => Action::CreateProcedure,
            ActionKind::ReadProcedure => Action::ReadProcedure,
            ActionKind::ValidateProcedure => Action::ValidateProcedure,
            ActionKind::Login => Action::Login,
            ActionKind::HelpColleague => Action::HelpColleague,
            ActionKind::ReceiveThanks => Action::ReceiveThanks,
            ActionKind::CompleteWeeklyGoal => Action::CompleteWeeklyGoal,
        };

        action.validate()?;
        Ok(action)
    }
}

impl From<&Action> for ActionRequest {
    fn from(action: &Action) -> Self {
        let mut req = ActionRequest::new(action.kind());
        match action {
            Action::CreateIncident { severity } => {
                req.severity = severity.map(|s| s.as_str().to_string());
            }
            Action::ResolveIncident { severity, resolution_time } => {
                req.severity = severity.map(|s| s.as_str().to_string());
                req.resolution_time = *resolution_time;
            }
            Action::CompleteMaintenance { before_schedule } => {
                req.before_schedule = Some(*before_schedule);
            }
            Action::CompleteQualityCheck { score } => req.score = Some(*score),
            _ => {}
        }
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing_accepts_wire_spellings() {
        assert_eq!("resolve-incident".parse::<ActionKind>().unwrap(), ActionKind::ResolveIncident);
        assert_eq!("RESOLVE_INCIDENT".parse::<ActionKind>().unwrap(), ActionKind::ResolveIncident);
        assert!("delete-incident".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_quality_check_requires_score() {
        let req = ActionRequest::new(ActionKind::CompleteQualityCheck);
        let err = Action::try_from(req).unwrap_err();
        assert!(matches!(err, RewardsError::MalformedAction { .. }));
    }

    #[test]
    fn test_quality_score_range() {
        let mut req = ActionRequest::new(ActionKind::CompleteQualityCheck);
        req.score = Some(101.0);
        assert!(Action::try_from(req.clone()).is_err());
        req.score = Some(f64::NAN);
        assert!(Action::try_from(req.clone()).is_err());
        req.score = Some(100.0);
        assert_eq!(
            Action::try_from(req).unwrap(),
            Action::CompleteQualityCheck { score: 100.0 }
        );
    }

    #[test]
    fn test_negative_resolution_time_rejected() {
        let action = Action::ResolveIncident { severity: None, resolution_time: Some(-1.0) };
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_severity_aliases() {
        assert_eq!("critique".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!(" Critical ".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("apocalyptic".parse::<Severity>().is_err());
    }

    #[test]
    fn test_request_from_json() {
        let req = ActionRequest::from_json(
            r#"{"kind":"resolve-incident","severity":"critical","resolutionTime":3}"#,
        )
        .unwrap();
        let action = Action::try_from(req).unwrap();
        assert_eq!(
            action,
            Action::ResolveIncident {
                severity: Some(Severity::Critical),
                resolution_time: Some(3.0)
            }
        );
        assert_eq!(action.module(), Some(Module::Incidents));
    }

    #[test]
    fn test_empty_severity_is_none() {
        let req = ActionRequest::from_json(r#"{"kind":"create-incident","severity":""}"#).unwrap();
        assert_eq!(Action::try_from(req).unwrap(), Action::CreateIncident { severity: None });
    }

    #[test]
    fn test_non_domain_actions_have_no_module() {
        assert_eq!(Action::Login.module(), None);
        assert_eq!(Action::ReceiveThanks.module(), None);
        assert_eq!(Action::ReturnLostItem.module(), Some(Module::LostFound));
    }
}
