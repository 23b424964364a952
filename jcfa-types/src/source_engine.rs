use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::RwLock,
};

use crate::SourceId;

/// The Source Engine manages a relationship between file paths and their corresponding
/// integer-based source IDs. Additionally, it maintains a reverse map that traces back from a
/// source ID to its original file path, so that spans only need to carry the small integer id.
///
/// Its internal structures are secured by `RwLock`s, which allows its functions to be invoked
/// through a shared reference.
#[derive(Debug, Default)]
pub struct SourceEngine {
    next_id: RwLock<u32>,
    source_map: RwLock<HashMap<PathBuf, SourceId>>,
    path_map: RwLock<BTreeMap<SourceId, PathBuf>>,
}

impl SourceEngine {
    /// This function retrieves an integer-based source ID for a provided path buffer.
    /// If an ID already exists for the given path, the function will return that
    /// existing ID. If not, a new ID will be created.
    pub fn get_source_id(&self, path: &PathBuf) -> SourceId {
        {
            let source_map = self.source_map.read().unwrap();
            if let Some(source_id) = source_map.get(path) {
                return *source_id;
            }
        }

        let mut next_id = self.next_id.write().unwrap();
        let source_id = SourceId::new(*next_id);
        *next_id += 1;

        self.source_map
            .write()
            .unwrap()
            .insert(path.clone(), source_id);
        self.path_map
            .write()
            .unwrap()
            .insert(source_id, path.clone());

        source_id
    }

    /// This function provides the file path corresponding to a specified source ID.
    pub fn get_path(&self, source_id: &SourceId) -> Option<PathBuf> {
        self.path_map.read().unwrap().get(source_id).cloned()
    }

    /// All registered paths, ordered by their source ID.
    pub fn all_paths(&self) -> Vec<(SourceId, PathBuf)> {
        self.path_map
            .read()
            .unwrap()
            .iter()
            .map(|(id, path)| (*id, path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_stable_per_path() {
        let engine = SourceEngine::default();
        let a = engine.get_source_id(&PathBuf::from("src/A.java"));
        let b = engine.get_source_id(&PathBuf::from("src/B.java"));
        assert_ne!(a, b);
        assert_eq!(engine.get_source_id(&PathBuf::from("src/A.java")), a);
        assert_eq!(engine.get_path(&b), Some(PathBuf::from("src/B.java")));
        let all = engine.all_paths();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, a);
    }
}
