use compact_str::CompactString;
use indexmap::IndexMap;

use super::walk::Source;

#[derive(Debug, Clone)]
struct AliasEntry {
    /// Qualifier as written in the query
    written: String,
    /// Lowercased base table (or derived/CTE name)
    base:    CompactString
}

/// Per-query mapping from qualifiers to the table they denote.
///
/// Aliases map to their base table and every table name maps to itself.
/// Lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: IndexMap<CompactString, AliasEntry>
}

impl AliasMap {
    pub fn from_sources(sources: &[Source<'_>]) -> Self {
        let mut map = Self::default();
        for source in sources {
            match source {
                Source::Table {
                    name,
                    alias
                } => {
                    let written = name.to_string();
                    let table = written.rsplit('.').next().unwrap_or(&written).to_string();
                    let base = CompactString::from(unquote(&table).to_lowercase());
                    map.insert(unquote(&table), base.clone());
                    if let Some(alias) = alias {
                        map.insert(&alias.value, base);
                    }
                }
                Source::Derived(alias) | Source::Cte(alias) => {
                    let base = CompactString::from(alias.value.to_lowercase());
                    map.insert(&alias.value, base);
                }
            }
        }
        map
    }

    fn insert(&mut self, written: &str, base: CompactString) {
        self.entries
            .entry(CompactString::from(written.to_lowercase()))
            .or_insert_with(|| AliasEntry {
                written: written.to_string(),
                base
            });
    }

    /// Base table of `qualifier`, if it is declared.
    pub fn resolve(&self, qualifier: &str) -> Option<&str> {
        self.entries
            .get(qualifier.to_lowercase().as_str())
            .map(|e| e.base.as_str())
    }

    pub fn contains(&self, qualifier: &str) -> bool {
        self.resolve(qualifier).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every valid qualifier, as written, in declaration order.
    pub fn qualifiers(&self) -> Vec<&str> {
        self.entries.values().map(|e| e.written.as_str()).collect()
    }
}

fn unquote(name: &str) -> &str {
    name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
}
