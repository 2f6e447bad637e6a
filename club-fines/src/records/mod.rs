//! The records a club stores remotely.
//!
//! Identifiers are node keys and are injected by the codec, the payloads never repeat them.

mod amount;
mod club;
mod fine;
mod person;
mod reason;

pub use amount::Amount;
pub use club::{Club, LatePaymentInterest, TimePeriod, TimeUnit};
pub use fine::{Fine, FineReason, Importance, Payed, ResolvedReason};
pub use person::{OptionalPersonName, Person, PersonName, SignInData};
pub use reason::ReasonTemplate;

use eyedee::Id;
use serde::Serialize;
use serde_json::{Map, Value};
use treesync::Record;

pub type ClubId = Id<Club>;
pub type PersonId = Id<Person>;
pub type FineId = Id<Fine>;
pub type ReasonTemplateId = Id<ReasonTemplate>;

/// A record that lives in one of a club's lists and is changed through the `changeList` procedure.
pub trait ListItem: Record<Id: Serialize> + PartialEq {
    /// Name of the list in procedure calls.
    const LIST_TYPE: &'static str;
    /// Node name of the list under the club.
    const COLLECTION: &'static str;

    fn item_parameters(&self) -> Map<String, Value>;
}
