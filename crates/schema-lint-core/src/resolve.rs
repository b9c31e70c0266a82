//! Schema discovery by naming convention.
//!
//! For `Foo.json` the candidates are, in order, `FooSchema.json`,
//! `Foo.schema.json` and `schema.json`, matched case-insensitively against
//! the files next to it. Documents whose name ends in `schema.json` are
//! schemas themselves and never get one.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::{ResourceStore, StoreError};

const JSON_SUFFIX: &str = ".json";
const SCHEMA_SUFFIX: &str = "schema.json";
const FOLDER_SCHEMA: &str = "schema.json";

/// Returns `true` for names the orchestrator handles at all.
#[must_use]
pub fn is_json_name(name: &str) -> bool {
    name.ends_with(JSON_SUFFIX)
}

/// Returns `true` for names that mark a document as a schema.
#[must_use]
pub fn is_schema_name(name: &str) -> bool {
    name.to_lowercase().ends_with(SCHEMA_SUFFIX)
}

/// Schema file names to look for next to a data file called `name`.
///
/// Empty for schema-named or non-JSON documents.
#[must_use]
pub fn candidate_names(name: &str) -> Vec<String> {
    if is_schema_name(name) {
        return Vec::new();
    }
    let Some(basename) = name.strip_suffix(JSON_SUFFIX) else {
        return Vec::new();
    };
    vec![
        format!("{basename}Schema.json"),
        format!("{basename}.schema.json"),
        FOLDER_SCHEMA.to_string(),
    ]
}

/// Finds the schema for the data resource `id`.
///
/// # Errors
///
/// Returns an error if the containing folder cannot be listed.
pub fn find_schema(store: &dyn ResourceStore, id: &Path) -> Result<Option<PathBuf>, StoreError> {
    let candidates = candidate_names(&store.name_of(id));
    if candidates.is_empty() {
        return Ok(None);
    }

    let siblings = store.siblings_of(id)?;
    for wanted in &candidates {
        debug!("Looking for {wanted:?} next to {}", id.display());
        let wanted = wanted.to_lowercase();
        if let Some(found) = siblings
            .iter()
            .find(|s| store.name_of(s).to_lowercase() == wanted)
        {
            return Ok(Some(found.clone()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_candidates() {
        assert_eq!(
            candidate_names("Foo.json"),
            vec!["FooSchema.json", "Foo.schema.json", "schema.json"]
        );
        assert!(candidate_names("FooSchema.json").is_empty());
        assert!(candidate_names("foo.SCHEMA.JSON").is_empty());
        assert!(candidate_names("schema.json").is_empty());
        assert!(candidate_names("notes.txt").is_empty());
    }

    #[test]
    fn test_is_json_name() {
        assert!(is_json_name("a.json"));
        assert!(!is_json_name("a.jsonc"));
        assert!(!is_json_name("a.yaml"));
    }

    #[test]
    fn test_candidate_order() {
        let store = MemoryStore::new();
        store.insert("d/Foo.json", "{}");
        store.insert("d/schema.json", "{}");
        store.insert("d/Foo.schema.json", "{}");
        assert_eq!(
            find_schema(&store, Path::new("d/Foo.json")).unwrap(),
            Some(PathBuf::from("d/Foo.schema.json"))
        );

        store.insert("d/FooSchema.json", "{}");
        assert_eq!(
            find_schema(&store, Path::new("d/Foo.json")).unwrap(),
            Some(PathBuf::from("d/FooSchema.json"))
        );
    }

    #[test]
    fn test_case_insensitive_match() {
        let store = MemoryStore::new();
        store.insert("d/products.json", "{}");
        store.insert("d/PRODUCTSschema.JSON", "{}");
        assert_eq!(
            find_schema(&store, Path::new("d/products.json")).unwrap(),
            Some(PathBuf::from("d/PRODUCTSschema.JSON"))
        );
    }

    #[test]
    fn test_folder_schema_fallback() {
        let store = MemoryStore::new();
        store.insert("d/a.json", "{}");
        store.insert("d/Schema.json", "{}");
        store.insert("e/b.json", "{}");
        assert_eq!(
            find_schema(&store, Path::new("d/a.json")).unwrap(),
            Some(PathBuf::from("d/Schema.json"))
        );
        assert_eq!(find_schema(&store, Path::new("e/b.json")).unwrap(), None);
    }

    #[test]
    fn test_schema_never_gets_schema() {
        let store = MemoryStore::new();
        store.insert("d/FooSchema.json", "{}");
        store.insert("d/schema.json", "{}");
        assert_eq!(
            find_schema(&store, Path::new("d/FooSchema.json")).unwrap(),
            None
        );
        assert_eq!(find_schema(&store, Path::new("d/schema.json")).unwrap(), None);
    }
}
