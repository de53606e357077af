use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Every statement the page store knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryId {
    CreateTable,
    ListNames,
    GetByName,
    GetById,
    Create,
    Update,
    Delete,
    ListAll,
}

impl QueryId {
    pub const ALL: [QueryId; 8] = [
        QueryId::CreateTable,
        QueryId::ListNames,
        QueryId::GetByName,
        QueryId::GetById,
        QueryId::Create,
        QueryId::Update,
        QueryId::Delete,
        QueryId::ListAll,
    ];

    /// Position in `ALL`, which follows declaration order
    fn slot(self) -> usize {
        self as usize
    }

    fn builtin_statement(self) -> &'static str {
        match self {
            QueryId::CreateTable => {
                "CREATE TABLE IF NOT EXISTS pages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name VARCHAR(255) NOT NULL UNIQUE CHECK (name <> ''),
                    content TEXT NOT NULL
                )"
            }
            QueryId::ListNames => "SELECT name FROM pages",
            QueryId::GetByName => "SELECT id, content FROM pages WHERE name = ?",
            QueryId::GetById => "SELECT id, name, content FROM pages WHERE id = ?",
            QueryId::Create => "INSERT INTO pages (name, content) VALUES (?, ?)",
            QueryId::Update => "UPDATE pages SET content = ? WHERE id = ?",
            QueryId::Delete => "DELETE FROM pages WHERE id = ?",
            QueryId::ListAll => "SELECT id, name, content FROM pages",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No statement configured for query {0:?}")]
    Missing(QueryId),

    #[error("Failed to read query file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse query file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Immutable mapping from query id to statement text.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    statements: [String; QueryId::ALL.len()],
}

impl QueryCatalog {
    pub fn builtin() -> Self {
        Self {
            statements: QueryId::ALL.map(|id| id.builtin_statement().to_string()),
        }
    }

    /// Build from an explicit table, failing when any query id has no statement
    pub fn from_statements(mut statements: HashMap<QueryId, String>) -> Result<Self, CatalogError> {
        let mut table: [String; QueryId::ALL.len()] = Default::default();
        for id in QueryId::ALL {
            match statements.remove(&id) {
                Some(sql) if !sql.trim().is_empty() => table[id.slot()] = sql,
                _ => return Err(CatalogError::Missing(id)),
            }
        }
        Ok(Self { statements: table })
    }

    /// Load statements from a YAML map keyed by snake_case query id
    pub fn from_yaml_file(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|err| match err {
            CatalogError::Parse { source, .. } => CatalogError::Parse { path: display, source },
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let statements: HashMap<QueryId, String> =
            serde_yaml::from_str(raw).map_err(|source| CatalogError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_statements(statements)
    }

    pub fn lookup(&self, id: QueryId) -> &str {
        &self.statements[id.slot()]
    }
}
