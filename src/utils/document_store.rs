// hackathon-service/src/utils/document_store.rs
//
// JSON document store: one directory per collection, one file per document.
// Reads go straight to disk. Mutations run inside a `Transaction` that holds
// the store's write lock, stages every write in memory and commits only when
// the closure returns `Ok`, so read-check-write sequences are atomic with
// respect to each other.
use crate::models::ServiceError;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait Document: Serialize + DeserializeOwned + Clone {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

pub struct DocumentStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let root = root.into();
        if !root.exists() {
            info!("Creating storage directory: {:?}", root);
            fs::create_dir_all(&root).map_err(|e| {
                error!("Failed to create storage directory: {:?}", e);
                ServiceError::InternalServerError
            })?;
        }

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf, ServiceError> {
        // Ids come from URLs, keep them inside the collection directory
        if id.is_empty() || id.contains(&['/', '\\', '.'][..]) {
            return Err(ServiceError::NotFound);
        }
        Ok(self.collection_dir(collection).join(format!("{}.json", id)))
    }

    fn read_document<T: Document>(&self, id: &str) -> Result<Option<T>, ServiceError> {
        let path = match self.document_path(T::COLLECTION, id) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read document {:?}: {:?}", path, e);
            ServiceError::InternalServerError
        })?;

        let document = serde_json::from_str(&content).map_err(|e| {
            error!("Failed to parse document {:?}: {:?}", path, e);
            ServiceError::InternalServerError
        })?;

        Ok(Some(document))
    }

    fn read_collection<T: Document>(&self) -> Result<BTreeMap<String, T>, ServiceError> {
        let dir = self.collection_dir(T::COLLECTION);
        let mut documents = BTreeMap::new();

        if !dir.exists() {
            return Ok(documents);
        }

        for entry_result in fs::read_dir(&dir).map_err(|e| {
            error!("Failed to read collection directory {:?}: {:?}", dir, e);
            ServiceError::InternalServerError
        })? {
            let entry = entry_result.map_err(|e| {
                error!("Failed to read directory entry: {:?}", e);
                ServiceError::InternalServerError
            })?;

            let path = entry.path();
            if !(path.is_file() && path.extension().map_or(false, |ext| ext == "json")) {
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to read document {:?}: {:?}", path, e);
                    continue;
                }
            };

            match serde_json::from_str::<T>(&content) {
                Ok(document) => {
                    documents.insert(document.id().to_string(), document);
                }
                Err(e) => {
                    warn!("Skipping unparsable document {:?}: {:?}", path, e);
                }
            }
        }

        Ok(documents)
    }

    /// Writes the document to a temp file beside its final path and returns
    /// both paths. Nothing is visible to readers until the rename.
    fn stage_raw(&self, collection: &str, id: &str, value: &serde_json::Value) -> Result<(PathBuf, PathBuf), ServiceError> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create collection directory {:?}: {:?}", dir, e);
            ServiceError::InternalServerError
        })?;

        let path = self.document_path(collection, id)?;
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(value).map_err(|e| {
            error!("Failed to serialize document {}/{}: {:?}", collection, id, e);
            ServiceError::InternalServerError
        })?;

        fs::write(&tmp_path, content).map_err(|e| {
            error!("Failed to write document {:?}: {:?}", tmp_path, e);
            ServiceError::InternalServerError
        })?;

        Ok((tmp_path, path))
    }

    pub fn find<T: Document>(&self, id: &str) -> Result<Option<T>, ServiceError> {
        self.read_document(id)
    }

    pub fn get<T: Document>(&self, id: &str) -> Result<T, ServiceError> {
        self.find(id)?.ok_or(ServiceError::NotFound)
    }

    pub fn list<T: Document>(&self) -> Result<Vec<T>, ServiceError> {
        Ok(self.read_collection::<T>()?.into_values().collect())
    }

    pub fn find_where<T, F>(&self, predicate: F) -> Result<Vec<T>, ServiceError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        Ok(self.list::<T>()?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub fn find_one_where<T, F>(&self, predicate: F) -> Result<Option<T>, ServiceError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        Ok(self.list::<T>()?.into_iter().find(|doc| predicate(doc)))
    }

    pub fn insert<T: Document>(&self, document: &T) -> Result<(), ServiceError> {
        self.transaction(|tx| tx.put(document))
    }

    /// Runs `f` under the store's write lock. Writes staged through the
    /// transaction are persisted only if `f` succeeds.
    pub fn transaction<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().map_err(|e| {
            error!("Document store lock poisoned: {:?}", e);
            ServiceError::InternalServerError
        })?;

        let mut tx = Transaction {
            store: self,
            staged: HashMap::new(),
        };

        let result = f(&mut tx)?;
        tx.commit()?;
        Ok(result)
    }
}

type StagedKey = (&'static str, String);

pub struct Transaction<'a> {
    store: &'a DocumentStore,
    // None marks a staged delete
    staged: HashMap<StagedKey, Option<serde_json::Value>>,
}

impl<'a> Transaction<'a> {
    fn decode<T: Document>(value: &serde_json::Value) -> Result<T, ServiceError> {
        serde_json::from_value(value.clone()).map_err(|e| {
            error!("Failed to decode staged {} document: {:?}", T::COLLECTION, e);
            ServiceError::InternalServerError
        })
    }

    pub fn find<T: Document>(&self, id: &str) -> Result<Option<T>, ServiceError> {
        match self.staged.get(&(T::COLLECTION, id.to_string())) {
            Some(Some(value)) => Ok(Some(Self::decode(value)?)),
            Some(None) => Ok(None),
            None => self.store.read_document(id),
        }
    }

    pub fn get<T: Document>(&self, id: &str) -> Result<T, ServiceError> {
        self.find(id)?.ok_or(ServiceError::NotFound)
    }

    pub fn list<T: Document>(&self) -> Result<Vec<T>, ServiceError> {
        let mut documents = self.store.read_collection::<T>()?;

        for ((collection, id), staged) in &self.staged {
            if *collection != T::COLLECTION {
                continue;
            }
            match staged {
                Some(value) => {
                    documents.insert(id.clone(), Self::decode(value)?);
                }
                None => {
                    documents.remove(id);
                }
            }
        }

        Ok(documents.into_values().collect())
    }

    pub fn find_where<T, F>(&self, predicate: F) -> Result<Vec<T>, ServiceError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        Ok(self.list::<T>()?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub fn put<T: Document>(&mut self, document: &T) -> Result<(), ServiceError> {
        let value = serde_json::to_value(document).map_err(|e| {
            error!("Failed to serialize {} document: {:?}", T::COLLECTION, e);
            ServiceError::InternalServerError
        })?;
        self.staged
            .insert((T::COLLECTION, document.id().to_string()), Some(value));
        Ok(())
    }

    pub fn delete<T: Document>(&mut self, id: &str) -> Result<(), ServiceError> {
        self.staged.insert((T::COLLECTION, id.to_string()), None);
        Ok(())
    }

    /// Two phases: every write goes to a temp file first, and only when all
    /// of them succeeded are they renamed into place and deletes applied.
    /// A failure in the first phase leaves the stored documents untouched.
    fn commit(self) -> Result<(), ServiceError> {
        let mut renames = Vec::new();
        let mut removals = Vec::new();

        for ((collection, id), staged) in &self.staged {
            let outcome = match staged {
                Some(value) => self.store.stage_raw(collection, id, value).map(|paths| renames.push(paths)),
                None => self.store.document_path(collection, id).map(|path| removals.push(path)),
            };

            if let Err(e) = outcome {
                error!("❌ Aborting commit at {}/{}", collection, id);
                for (tmp_path, _) in &renames {
                    if let Err(cleanup) = fs::remove_file(tmp_path) {
                        warn!("Failed to remove temp file {:?}: {:?}", tmp_path, cleanup);
                    }
                }
                return Err(e);
            }
        }

        let total = renames.len() + removals.len();
        let mut applied = 0;
        for (tmp_path, path) in &renames {
            fs::rename(tmp_path, path).map_err(|e| {
                error!(
                    "Commit interrupted after {} of {} changes, failed to move {:?}: {:?}",
                    applied, total, path, e
                );
                ServiceError::InternalServerError
            })?;
            debug!("Wrote document {:?}", path);
            applied += 1;
        }

        for path in &removals {
            if path.exists() {
                fs::remove_file(path).map_err(|e| {
                    error!(
                        "Commit interrupted after {} of {} changes, failed to delete {:?}: {:?}",
                        applied, total, path, e
                    );
                    ServiceError::InternalServerError
                })?;
                debug!("Deleted document {:?}", path);
            }
            applied += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Counter {
        id: String,
        value: u32,
    }

    impl Document for Counter {
        const COLLECTION: &'static str = "counters";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn counter(id: &str, value: u32) -> Counter {
        Counter {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn insert_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();

        store.insert(&counter("a", 1)).unwrap();

        assert_eq!(store.find::<Counter>("a").unwrap(), Some(counter("a", 1)));
        assert_eq!(store.find::<Counter>("missing").unwrap(), None);
        assert_eq!(store.list::<Counter>().unwrap().len(), 1);
    }

    #[test]
    fn failed_transaction_discards_staged_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        store.insert(&counter("a", 1)).unwrap();

        let result: Result<(), ServiceError> = store.transaction(|tx| {
            tx.put(&counter("a", 2))?;
            tx.put(&counter("b", 1))?;
            Err(ServiceError::conflict("nope"))
        });

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(store.get::<Counter>("a").unwrap().value, 1);
        assert!(store.find::<Counter>("b").unwrap().is_none());
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        store.insert(&counter("a", 1)).unwrap();
        store.insert(&counter("b", 1)).unwrap();

        store
            .transaction(|tx| {
                tx.put(&counter("c", 3))?;
                tx.delete::<Counter>("b")?;
                let ids: Vec<String> = tx.list::<Counter>()?.into_iter().map(|c| c.id).collect();
                assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
                assert!(tx.find::<Counter>("b")?.is_none());
                Ok(())
            })
            .unwrap();

        assert!(store.find::<Counter>("b").unwrap().is_none());
        assert_eq!(store.get::<Counter>("c").unwrap().value, 3);
    }

    #[test]
    fn commit_that_cannot_stage_every_write_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        store.insert(&counter("a", 1)).unwrap();

        let result = store.transaction(|tx| {
            tx.put(&counter("a", 2))?;
            tx.put(&counter("b", 1))?;
            // Rejected only when the commit resolves its path
            tx.put(&counter("../c", 1))
        });

        assert!(result.is_err());
        assert_eq!(store.get::<Counter>("a").unwrap().value, 1);
        assert!(store.find::<Counter>("b").unwrap().is_none());

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("counters"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn path_like_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert!(store.find::<Counter>("../etc").unwrap().is_none());
    }

    #[test]
    fn concurrent_increments_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(DocumentStore::open(dir.path()).unwrap());
        store.insert(&counter("n", 0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .transaction(|tx| {
                            let mut current = tx.get::<Counter>("n")?;
                            current.value += 1;
                            tx.put(&current)
                        })
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get::<Counter>("n").unwrap().value, 8);
    }
}
