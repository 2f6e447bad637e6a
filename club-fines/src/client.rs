//! Reading and observing the data of one club.

use std::sync::{Arc, Mutex, PoisonError};

use treesync::{
    CancelHandle, FetchError, Fetcher, Mirror, Observer, Outcome, OutcomeExt, RemoteRead,
    RemoteWatch,
};

use crate::paths::{ClubPaths, DatabaseLevel};
use crate::records::{Club, ClubId, Fine, LatePaymentInterest, ListItem, Person, ReasonTemplate};

pub struct ClubClient<S> {
    club_id: ClubId,
    paths: ClubPaths,
    fetcher: Fetcher<S>,
    observer: Observer<S>,
}

impl<S: RemoteRead + RemoteWatch> ClubClient<S> {
    pub fn new(store: Arc<S>, level: DatabaseLevel, club_id: ClubId) -> Self {
        Self {
            club_id,
            paths: ClubPaths::new(level, club_id),
            fetcher: Fetcher::new(store.clone()),
            observer: Observer::new(store),
        }
    }

    pub fn club_id(&self) -> ClubId {
        self.club_id
    }

    pub fn paths(&self) -> &ClubPaths {
        &self.paths
    }

    pub fn observer(&self) -> &Observer<S> {
        &self.observer
    }

    /// One of the club's lists. A list that doesn't exist yet is `NoData`.
    pub async fn fetch_list<T: ListItem>(&self) -> Outcome<Vec<T>> {
        self.fetcher.fetch_collection(&self.paths.list::<T>()).await
    }

    pub async fn fetch_persons(&self) -> Outcome<Vec<Person>> {
        self.fetch_list().await.or_default()
    }

    pub async fn fetch_fines(&self) -> Outcome<Vec<Fine>> {
        self.fetch_list().await.or_default()
    }

    pub async fn fetch_reasons(&self) -> Outcome<Vec<ReasonTemplate>> {
        self.fetch_list().await.or_default()
    }

    pub async fn fetch_club(&self) -> Outcome<Club> {
        let (name, identifier, region_code, in_app) = (
            self.paths.name(),
            self.paths.identifier(),
            self.paths.region_code(),
            self.paths.in_app_payment_active(),
        );
        let (name, identifier, region_code, in_app_payment_active) = futures::try_join!(
            self.fetcher.fetch_primitive::<String>(&name),
            self.fetcher.fetch_primitive::<String>(&identifier),
            self.fetcher.fetch_primitive::<String>(&region_code),
            async { self.fetcher.fetch_primitive::<bool>(&in_app).await.optional() },
        )?;
        Ok(Club {
            id: self.club_id,
            name,
            identifier,
            region_code,
            in_app_payment_active,
        })
    }

    /// `None` if the club has no late payment interest configured.
    pub async fn fetch_late_payment_interest(
        &self,
    ) -> Result<Option<LatePaymentInterest>, FetchError> {
        self.fetcher
            .fetch_object(&self.paths.late_payment_interest())
            .await
            .optional()
    }

    /// Keeps `mirror` in sync with one of the club's lists until the handle is cancelled.
    pub fn observe_list<T: ListItem>(&self, mirror: Mirror<T>) -> CancelHandle {
        self.observer.observe_into(&self.paths.list::<T>(), mirror)
    }

    /// Calls `on_change` with every new late payment interest, and with `None` when it is removed.
    pub fn observe_late_payment_interest<F>(&self, on_change: F) -> CancelHandle
    where
        F: FnMut(Option<LatePaymentInterest>) + Send + 'static,
    {
        let on_change = Arc::new(Mutex::new(on_change));
        let on_remove = on_change.clone();
        self.observer.observe_object(
            &self.paths.late_payment_interest(),
            move |interest: LatePaymentInterest| {
                let mut on_change = on_change.lock().unwrap_or_else(PoisonError::into_inner);
                (*on_change)(Some(interest));
            },
            move || {
                let mut on_remove = on_remove.lock().unwrap_or_else(PoisonError::into_inner);
                (*on_remove)(None);
            },
        )
    }

    /// Cancels every subscription opened through this client.
    pub fn close(&self) {
        self.observer.close();
    }
}
