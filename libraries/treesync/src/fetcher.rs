//! One-shot typed reads.
//!
//! Each call issues exactly one read and completes exactly once. There is no retry, no cache and no timeout here:
//! callers compose those themselves if they need them.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{self, Scalar};
use crate::data_model::{FetchError, Outcome, Path, Record};
use crate::store::RemoteRead;

pub struct Fetcher<S> {
    store: Arc<S>,
}

impl<S> Clone for Fetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: RemoteRead> Fetcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn read_node(&self, path: &Path) -> Outcome<Value> {
        let node = self.store.read(path).await.inspect_err(|e| {
            log::error!("Fetching {path} failed: {e}");
        })?;
        codec::present(node).ok_or_else(|| {
            log::debug!("No data at {path}");
            FetchError::NoData
        })
    }

    fn decoded<T>(path: &Path, result: Result<T, crate::data_model::DecodeError>) -> Outcome<T> {
        result.map_err(|e| {
            log::warn!("Data at {path} has an unexpected shape: {e}");
            FetchError::Decode(e)
        })
    }

    /// Fetches a single primitive, e.g. a club name or a flag.
    pub async fn fetch_primitive<T: Scalar>(&self, path: &Path) -> Outcome<T> {
        let node = self.read_node(path).await?;
        Self::decoded(path, codec::decode(&node))
    }

    /// Fetches a structured value that has no identity of its own.
    pub async fn fetch_object<T: DeserializeOwned>(&self, path: &Path) -> Outcome<T> {
        let node = self.read_node(path).await?;
        Self::decoded(path, codec::decode(&node))
    }

    /// Fetches one record of a keyed collection. The last path segment is its key.
    pub async fn fetch_record<T: Record>(&self, path: &Path) -> Outcome<T> {
        let node = self.read_node(path).await?;
        let key = path.key().unwrap_or_default();
        Self::decoded(path, codec::decode_keyed(key, &node))
    }

    /// Fetches a whole keyed collection. The order of the result follows the transport and means nothing;
    /// callers that need an order must sort.
    pub async fn fetch_collection<T: Record>(&self, path: &Path) -> Outcome<Vec<T>> {
        let node = self.read_node(path).await?;
        Self::decoded(path, codec::decode_collection(&node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{DecodeError, OutcomeExt};
    use crate::memory::MemoryStore;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, serde::Deserialize)]
    struct Person {
        id: String,
        name: String,
    }

    impl Record for Person {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Interest {
        interest_rate: f64,
        compound_interest: bool,
    }

    fn fetcher() -> Fetcher<MemoryStore> {
        let store = MemoryStore::with_root(json!({
            "clubA": {
                "name": "Club A",
                "persons": {
                    "P1": { "name": "Ann" },
                    "P2": { "name": "Bo" },
                    "P3": { "name": "Cid" },
                },
                "interest": { "interestRate": 2.5, "compoundInterest": false },
                "emptyList": {},
            }
        }));
        Fetcher::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_fetch_primitive() {
        let fetcher = fetcher();
        let name: String = fetcher
            .fetch_primitive(&Path::parse("clubA/name"))
            .await
            .unwrap();
        assert_eq!(name, "Club A");
    }

    #[tokio::test]
    async fn test_absent_is_no_data_and_wrong_shape_is_decode_error() {
        let fetcher = fetcher();

        let absent = fetcher
            .fetch_primitive::<f64>(&Path::parse("clubA/latePaymentInterest"))
            .await;
        assert_eq!(absent, Err(FetchError::NoData));

        let wrong = fetcher.fetch_primitive::<bool>(&Path::parse("clubA/name")).await;
        assert!(matches!(wrong, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_empty_collection_is_no_data() {
        let fetcher = fetcher();
        let result = fetcher
            .fetch_collection::<Person>(&Path::parse("clubA/emptyList"))
            .await;
        assert_eq!(result, Err(FetchError::NoData));
        assert_eq!(result.or_default(), Ok(vec![]));
    }

    #[tokio::test]
    async fn test_fetch_object() {
        let fetcher = fetcher();
        let interest: Interest = fetcher
            .fetch_object(&Path::parse("clubA/interest"))
            .await
            .unwrap();
        assert_eq!(
            interest,
            Interest {
                interest_rate: 2.5,
                compound_interest: false
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_collection_and_record() {
        let fetcher = fetcher();
        let mut persons: Vec<Person> = fetcher
            .fetch_collection(&Path::parse("clubA/persons"))
            .await
            .unwrap();
        persons.sort_by(|a, b| a.id.cmp(&b.id));
        let names: Vec<_> = persons.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bo", "Cid"]);

        let person: Person = fetcher
            .fetch_record(&Path::parse("clubA/persons/P2"))
            .await
            .unwrap();
        assert_eq!(person.id, "P2");
    }

    #[tokio::test]
    async fn test_one_malformed_child_fails_the_collection() {
        let fetcher = fetcher();
        fetcher
            .store()
            .set(&Path::parse("clubA/persons/P2/name"), json!(["not", "a", "name"]));

        let result = fetcher
            .fetch_collection::<Person>(&Path::parse("clubA/persons"))
            .await;
        match result {
            Err(FetchError::Decode(DecodeError::Child { key, .. })) => assert_eq!(key, "P2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let fetcher = fetcher();
        fetcher.store().fail_reads(Some("offline"));

        let result = fetcher.fetch_primitive::<String>(&Path::parse("clubA/name")).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));

        fetcher.store().fail_reads(None);
        assert!(fetcher.fetch_primitive::<String>(&Path::parse("clubA/name")).await.is_ok());
    }
}
