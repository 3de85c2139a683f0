// Storable record trait

use serde::{Deserialize, Serialize};

/// Core trait that any record kept in the journal must implement
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Timestamp when this record was last updated (milliseconds since epoch)
    fn updated_at(&self) -> i64;

    /// Collection name for this record type (e.g., "tasks")
    /// Determines the journal filename: {collection}.jsonl
    fn collection_name() -> &'static str
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestRecord {
        id: String,
        name: String,
        updated_at: i64,
    }

    impl Record for TestRecord {
        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> i64 {
            self.updated_at
        }

        fn collection_name() -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_record_trait_implementation() {
        let record = TestRecord {
            id: "test-1".to_string(),
            name: "Test".to_string(),
            updated_at: 1000,
        };

        assert_eq!(record.id(), "test-1");
        assert_eq!(record.updated_at(), 1000);
        assert_eq!(record.name, "Test");
        assert_eq!(TestRecord::collection_name(), "test");
    }
}
