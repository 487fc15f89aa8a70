#[cfg(test)]
pub mod test {
    use std::path::Path;

    use serde_json::json;

    use crate::array::ConfigArray;
    use crate::schema::{MergeStrategy, PropertySchema, Schema, ValidateStrategy};
    use crate::types::{ConfigArrayOptions, ConfigEntry, ConfigSource, FilePattern, Pattern};

    pub const BASE: &str = "/base";

    /// Schema used by the fixture: `defs` objects merge shallowly,
    /// `language` is a replaced string.
    pub fn defs_schema() -> Schema {
        Schema::new()
            .with_property(
                "defs",
                PropertySchema::new(ValidateStrategy::Object, MergeStrategy::Assign),
            )
            .with_property(
                "language",
                PropertySchema::new(ValidateStrategy::String, MergeStrategy::Replace),
            )
    }

    /// The canonical entry set shared across test modules: a universal
    /// entry, plain js globs, a file-specific override, a predicate, and an
    /// AND-sequence.
    pub fn base_entries() -> Vec<ConfigSource> {
        vec![
            ConfigEntry::new()
                .name("universal")
                .value("defs", json!({"universal": true}))
                .into(),
            ConfigEntry::new()
                .name("js")
                .files(["**/*.js"])
                .value("defs", json!({"name": "js"}))
                .into(),
            ConfigEntry::new()
                .name("test-overrides")
                .files(["foo.test.js"])
                .value("defs", json!({"name": "test-overrides"}))
                .into(),
            ConfigEntry::new()
                .name("html")
                .files(vec![FilePattern::One(Pattern::predicate(|p: &Path| {
                    p.extension().is_some_and(|ext| ext == "html")
                }))])
                .value("defs", json!({"name": "html"}))
                .into(),
            ConfigEntry::new()
                .name("and")
                .files(vec![FilePattern::all(["*.and.*", "*.js"])])
                .value("defs", json!({"name": "and"}))
                .into(),
        ]
    }

    /// A normalized array over [`base_entries`], rooted at [`BASE`].
    pub fn base_array() -> ConfigArray {
        let mut array = ConfigArray::new(
            base_entries(),
            ConfigArrayOptions::new(BASE).schema(defs_schema()),
        );
        array.normalize_sync(&()).unwrap();
        array
    }

    #[test]
    fn fixture_normalizes_cleanly() {
        let array = base_array();
        assert!(array.is_normalized());
        assert_eq!(array.base_path(), Path::new(BASE));
    }
}
