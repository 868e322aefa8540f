//! The process table.
//!
//! Maps node ids to process records and owns the component instances and
//! their driver tasks. A record without a component is a reserved
//! placeholder: the node is declared, nothing runs for it, and the
//! coordinator neither subscribes to it nor counts it.

use crate::error::NetworkError;
use std::collections::BTreeMap;
use tokio::task::JoinHandle;
use weir_component::ComponentHandle;

/// An instantiated (or reserved) process.
pub struct ProcessRecord {
    /// Node id this record is registered under.
    pub id: String,
    /// The loaded instance; `None` for placeholders.
    pub component: Option<ComponentHandle>,
    /// Name the component was loaded as; `None` for placeholders.
    pub component_name: Option<String>,
    pub(crate) driver: Option<JoinHandle<()>>,
}

impl ProcessRecord {
    pub(crate) fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: None,
            component_name: None,
            driver: None,
        }
    }

    /// Returns `true` if a component instance is attached.
    #[must_use]
    pub fn has_component(&self) -> bool {
        self.component.is_some()
    }
}

impl Drop for ProcessRecord {
    fn drop(&mut self) {
        // The driver holds a handle to the component; without this the task
        // would outlive the record.
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

#[derive(Default)]
pub(crate) struct ProcessTable {
    records: BTreeMap<String, ProcessRecord>,
}

impl ProcessTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub(crate) fn insert(&mut self, record: ProcessRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ProcessRecord> {
        self.records.get(id)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<ProcessRecord> {
        self.records.remove(id)
    }

    /// Re-keys a record. Collision with a live id is an error rather than a
    /// silent overwrite that would orphan the existing process.
    pub(crate) fn rename(&mut self, old: &str, new: &str) -> Result<(), NetworkError> {
        if self.records.contains_key(new) {
            return Err(NetworkError::NodeExists(new.to_string()));
        }
        let Some(mut record) = self.records.remove(old) else {
            return Err(NetworkError::UnknownNode(old.to_string()));
        };
        record.id = new.to_string();
        self.records.insert(new.to_string(), record);
        Ok(())
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_no_component() {
        let record = ProcessRecord::placeholder("a");
        assert_eq!(record.id, "a");
        assert!(!record.has_component());
        assert!(record.component_name.is_none());
    }

    #[test]
    fn insert_and_lookup() {
        let mut table = ProcessTable::new();
        table.insert(ProcessRecord::placeholder("a"));

        assert!(table.contains("a"));
        assert_eq!(table.get("a").unwrap().id, "a");
        assert!(table.get("b").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ids_are_sorted() {
        let mut table = ProcessTable::new();
        for id in ["zeta", "alpha", "mid"] {
            table.insert(ProcessRecord::placeholder(id));
        }
        assert_eq!(table.ids(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn rename_rekeys_and_updates_record() {
        let mut table = ProcessTable::new();
        table.insert(ProcessRecord::placeholder("old"));

        table.rename("old", "new").unwrap();
        assert!(!table.contains("old"));
        assert_eq!(table.get("new").unwrap().id, "new");
    }

    #[test]
    fn rename_unknown_node_errors() {
        let mut table = ProcessTable::new();
        assert_eq!(
            table.rename("ghost", "new"),
            Err(NetworkError::UnknownNode("ghost".into()))
        );
    }

    #[test]
    fn rename_collision_errors() {
        let mut table = ProcessTable::new();
        table.insert(ProcessRecord::placeholder("a"));
        table.insert(ProcessRecord::placeholder("b"));

        assert_eq!(
            table.rename("a", "b"),
            Err(NetworkError::NodeExists("b".into()))
        );
        // Both records survive the failed rename.
        assert!(table.contains("a"));
        assert!(table.contains("b"));
    }

    #[test]
    fn remove_returns_the_record() {
        let mut table = ProcessTable::new();
        table.insert(ProcessRecord::placeholder("a"));
        let record = table.remove("a").unwrap();
        assert_eq!(record.id, "a");
        assert!(table.remove("a").is_none());
    }
}
