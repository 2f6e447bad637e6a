use serde::Deserialize;
use serde_json::{Map, Value, json};
use treesync::Record;

use crate::records::{Amount, Importance, ListItem, ReasonTemplateId};

/// A reusable fine reason with a fixed amount.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ReasonTemplate {
    pub id: ReasonTemplateId,
    pub reason: String,
    pub importance: Importance,
    pub amount: Amount,
}

impl Record for ReasonTemplate {
    type Id = ReasonTemplateId;

    fn id(&self) -> &ReasonTemplateId {
        &self.id
    }
}

impl ListItem for ReasonTemplate {
    const LIST_TYPE: &'static str = "reason";
    const COLLECTION: &'static str = "reasons";

    fn item_parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("reason".into(), json!(self.reason));
        parameters.insert("amount".into(), json!(self.amount));
        parameters.insert("importance".into(), json!(self.importance));
        parameters
    }
}
