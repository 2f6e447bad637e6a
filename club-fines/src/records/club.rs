use serde::{Deserialize, Serialize};

use crate::records::ClubId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    /// Human readable identifier members use to find the club.
    pub identifier: String,
    pub region_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app_payment_active: Option<bool>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Month,
    Year,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub value: u32,
    pub unit: TimeUnit,
}

/// Interest charged on fines that stay unpaid for longer than the interest free period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatePaymentInterest {
    pub interest_free_period: TimePeriod,
    pub interest_rate: f64,
    pub interest_period: TimePeriod,
    pub compound_interest: bool,
}
