//! The backend's procedures.

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::gateway::{CallError, Callable, parameters_of};
use crate::records::{
    Club, ClubId, FineId, LatePaymentInterest, ListItem, Payed, PersonId, PersonName,
};
use crate::registration::{ClubPropertiesInputProperty, PersonSelectionProperty};

macro_rules! serialized_parameters {
    ($name:ty) => {
        fn parameters(&self) -> Result<Map<String, Value>, CallError> {
            parameters_of(<$name as Callable>::NAME, self)
        }
    };
}

/// Creates a club with the signed up user as its first person and cashier.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClub {
    pub club_id: ClubId,
    pub club_name: String,
    pub region_code: String,
    pub club_identifier: String,
    pub in_app_payment: bool,
    pub person_id: PersonId,
    pub person_first_name: String,
    pub person_last_name: Option<String>,
    pub user_id: String,
    pub sign_in_date: DateTime<Utc>,
}

impl NewClub {
    pub fn new(
        property: &ClubPropertiesInputProperty,
        club: &Club,
        person_id: PersonId,
        sign_in_date: DateTime<Utc>,
    ) -> Self {
        Self {
            club_id: club.id,
            club_name: club.name.clone(),
            region_code: club.region_code.clone(),
            club_identifier: club.identifier.clone(),
            in_app_payment: club.in_app_payment_active.unwrap_or(false),
            person_id,
            person_first_name: property.name.first.clone(),
            person_last_name: property.name.last.clone(),
            user_id: property.user_id.clone(),
            sign_in_date,
        }
    }
}

impl Callable for NewClub {
    const NAME: &'static str = "newClub";
    type Response = IgnoredAny;

    serialized_parameters!(NewClub);
}

/// Adds the signed up user to an existing club as a new person.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPerson {
    pub club_id: ClubId,
    pub id: PersonId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub user_id: String,
    pub sign_in_date: DateTime<Utc>,
}

impl RegisterPerson {
    pub fn new(
        property: &PersonSelectionProperty,
        person_id: PersonId,
        sign_in_date: DateTime<Utc>,
    ) -> Self {
        Self {
            club_id: property.club_id,
            id: person_id,
            first_name: property.name.first.clone(),
            last_name: property.name.last.clone(),
            user_id: property.user_id.clone(),
            sign_in_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredClub {
    pub club_identifier: String,
    pub club_name: String,
    pub region_code: String,
    pub in_app_payment_active: bool,
}

impl Callable for RegisterPerson {
    const NAME: &'static str = "registerPerson";
    type Response = RegisteredClub;

    serialized_parameters!(RegisterPerson);
}

#[derive(Clone, Debug)]
pub struct ChangeFinePayed {
    pub club_id: ClubId,
    pub fine_id: FineId,
    pub payed: Payed,
}

impl Callable for ChangeFinePayed {
    const NAME: &'static str = "changeFinePayed";
    type Response = IgnoredAny;

    fn parameters(&self) -> Result<Map<String, Value>, CallError> {
        let mut parameters = Map::new();
        parameters.insert("clubId".into(), json!(self.club_id));
        parameters.insert("fineId".into(), json!(self.fine_id));
        parameters.insert("state".into(), json!(self.payed.state()));
        parameters.insert("payDate".into(), json!(self.payed.pay_date()));
        parameters.insert("inApp".into(), json!(self.payed.in_app()));
        Ok(parameters)
    }
}

/// Sets the club's late payment interest, or removes it with `None`.
#[derive(Clone, Debug)]
pub struct ChangeLatePaymentInterest {
    pub club_id: ClubId,
    pub interest: Option<LatePaymentInterest>,
}

impl Callable for ChangeLatePaymentInterest {
    const NAME: &'static str = "changeLatePaymentInterest";
    type Response = IgnoredAny;

    fn parameters(&self) -> Result<Map<String, Value>, CallError> {
        let mut parameters = Map::new();
        parameters.insert("clubId".into(), json!(self.club_id));
        match &self.interest {
            Some(interest) => {
                parameters.insert("changeType".into(), json!("update"));
                parameters.insert(
                    "interestFreeValue".into(),
                    json!(interest.interest_free_period.value),
                );
                parameters.insert(
                    "interestFreeUnit".into(),
                    serde_json::to_value(interest.interest_free_period.unit)?,
                );
                parameters.insert("interestRate".into(), json!(interest.interest_rate));
                parameters.insert("interestValue".into(), json!(interest.interest_period.value));
                parameters.insert(
                    "interestUnit".into(),
                    serde_json::to_value(interest.interest_period.unit)?,
                );
                parameters.insert("compoundInterest".into(), json!(interest.compound_interest));
            }
            None => {
                parameters.insert("changeType".into(), json!("remove"));
            }
        }
        Ok(parameters)
    }
}

#[derive(Clone, Debug)]
pub enum ListChange<T: ListItem> {
    Update(T),
    Delete(T::Id),
}

/// Creates, updates or deletes one item of a club's person, fine or reason list.
#[derive(Clone, Debug)]
pub struct ChangeList<T: ListItem> {
    pub club_id: ClubId,
    pub change: ListChange<T>,
}

impl<T: ListItem> Callable for ChangeList<T> {
    const NAME: &'static str = "changeList";
    type Response = IgnoredAny;

    fn parameters(&self) -> Result<Map<String, Value>, CallError> {
        let (change_type, item_id, mut parameters) = match &self.change {
            ListChange::Update(item) => ("update", serde_json::to_value(item.id())?, item.item_parameters()),
            ListChange::Delete(id) => ("delete", serde_json::to_value(id)?, Map::new()),
        };
        parameters.insert("clubId".into(), json!(self.club_id));
        parameters.insert("changeType".into(), json!(change_type));
        parameters.insert("listType".into(), json!(T::LIST_TYPE));
        parameters.insert("itemId".into(), item_id);
        Ok(parameters)
    }
}

/// Signs a person out on every device.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceSignOut {
    pub club_id: ClubId,
    pub person_id: PersonId,
}

impl Callable for ForceSignOut {
    const NAME: &'static str = "forceSignOut";
    type Response = IgnoredAny;

    serialized_parameters!(ForceSignOut);
}

#[derive(Clone, Debug, Serialize)]
pub struct ExistsClubWithIdentifier {
    pub identifier: String,
}

impl Callable for ExistsClubWithIdentifier {
    const NAME: &'static str = "existsClubWithIdentifier";
    type Response = bool;

    serialized_parameters!(ExistsClubWithIdentifier);
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsPersonWithUserId {
    pub user_id: String,
}

impl Callable for ExistsPersonWithUserId {
    const NAME: &'static str = "existsPersonWithUserId";
    type Response = bool;

    serialized_parameters!(ExistsPersonWithUserId);
}

#[derive(Clone, Debug, Serialize)]
pub struct GetClubId {
    pub identifier: String,
}

impl Callable for GetClubId {
    const NAME: &'static str = "getClubId";
    type Response = ClubId;

    serialized_parameters!(GetClubId);
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPersonProperties {
    pub user_id: String,
}

/// Everything a signed in device needs to know about its person.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonProperties {
    pub id: PersonId,
    pub name: PersonName,
    pub sign_in_date: DateTime<Utc>,
    pub is_cashier: bool,
    pub club_properties: Club,
}

impl Callable for GetPersonProperties {
    const NAME: &'static str = "getPersonProperties";
    type Response = PersonProperties;

    serialized_parameters!(GetPersonProperties);
}
