use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use treesync::Record;

use crate::records::{Amount, FineId, ListItem, PersonId, ReasonTemplate, ReasonTemplateId};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Payed {
    Unpayed,
    Settled,
    Payed {
        pay_date: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        in_app: Option<bool>,
    },
}

impl Payed {
    pub fn state(&self) -> &'static str {
        match self {
            Payed::Unpayed => "unpayed",
            Payed::Settled => "settled",
            Payed::Payed { .. } => "payed",
        }
    }

    pub fn pay_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Payed::Payed { pay_date, .. } => Some(*pay_date),
            _ => None,
        }
    }

    pub fn in_app(&self) -> Option<bool> {
        match self {
            Payed::Payed { in_app, .. } => *in_app,
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Payed::Unpayed)
    }
}

/// What a fine is for: either a reference to a reason template or a one-off reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FineReason {
    Template {
        #[serde(rename = "templateId")]
        template_id: ReasonTemplateId,
    },
    Custom {
        reason: String,
        amount: Amount,
        importance: Importance,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedReason {
    pub reason: String,
    pub amount: Amount,
    pub importance: Importance,
}

impl FineReason {
    /// Looks up template references in `templates`. A template that no longer exists resolves to an empty reason
    /// with a zero amount and low importance.
    pub fn resolve(&self, templates: &[ReasonTemplate]) -> ResolvedReason {
        match self {
            FineReason::Template { template_id } => {
                match templates.iter().find(|template| template.id == *template_id) {
                    Some(template) => ResolvedReason {
                        reason: template.reason.clone(),
                        amount: template.amount,
                        importance: template.importance,
                    },
                    None => {
                        log::debug!("Reason template {template_id} not found");
                        ResolvedReason {
                            reason: String::new(),
                            amount: Amount::ZERO,
                            importance: Importance::Low,
                        }
                    }
                }
            }
            FineReason::Custom {
                reason,
                amount,
                importance,
            } => ResolvedReason {
                reason: reason.clone(),
                amount: *amount,
                importance: *importance,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fine {
    pub id: FineId,
    pub person_id: PersonId,
    pub date: DateTime<Utc>,
    pub payed: Payed,
    pub number: u32,
    pub reason: FineReason,
}

impl Fine {
    /// Amount of the reason times the number of times the fine was given.
    pub fn total(&self, templates: &[ReasonTemplate]) -> Amount {
        self.reason.resolve(templates).amount * self.number
    }
}

impl Record for Fine {
    type Id = FineId;

    fn id(&self) -> &FineId {
        &self.id
    }
}

impl ListItem for Fine {
    const LIST_TYPE: &'static str = "fine";
    const COLLECTION: &'static str = "fines";

    fn item_parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("personId".into(), json!(self.person_id));
        parameters.insert("payed".into(), json!(self.payed));
        parameters.insert("number".into(), json!(self.number));
        parameters.insert("date".into(), json!(self.date));
        match &self.reason {
            FineReason::Template { template_id } => {
                parameters.insert("templateId".into(), json!(template_id));
            }
            FineReason::Custom {
                reason,
                amount,
                importance,
            } => {
                parameters.insert("reason".into(), json!(reason));
                parameters.insert("amount".into(), json!(amount));
                parameters.insert("importance".into(), json!(importance));
            }
        }
        parameters
    }
}
