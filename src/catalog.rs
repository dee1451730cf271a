//! The tool catalog: one ordered JSON document, rewritten on every change.

use crate::model::ToolRecord;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no tool named '{name}' in category '{category}'")]
    NotFound { name: String, category: String },

    #[error("no tool named '{0}'")]
    UnknownName(String),

    #[error("'{name}' exists in several categories ({}); pick one with --category", .categories.join(", "))]
    Ambiguous { name: String, categories: Vec<String> },

    #[error("a tool named '{name}' already exists in category '{category}'")]
    Duplicate { name: String, category: String },

    #[error("catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("catalog {} is not valid: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tools: Vec<ToolRecord>,
}

impl Catalog {
    pub fn from_tools(tools: Vec<ToolRecord>) -> Self {
        Self { tools }
    }

    /// Missing file means an empty catalog. A file that doesn't parse is an
    /// error so the next save can't clobber it.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No catalog at {:?}", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CatalogError::Io { path: path.to_path_buf(), source });
            }
        };
        let tools: Vec<ToolRecord> = serde_json::from_str(&content)
            .map_err(|source| CatalogError::Json { path: path.to_path_buf(), source })?;
        info!("Catalog: loaded {} tools from {:?}", tools.len(), path);
        Ok(Self::from_tools(tools))
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let io_err = |source| CatalogError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.tools)
            .map_err(|source| CatalogError::Json { path: path.to_path_buf(), source })?;
        fs::write(path, content).map_err(io_err)?;
        debug!("Catalog: wrote {} tools to {:?}", self.tools.len(), path);
        Ok(())
    }

    pub fn tools(&self) -> &[ToolRecord] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn position(&self, name: &str, category: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.matches_key(name, category))
    }

    pub fn add(&mut self, tool: ToolRecord) -> Result<(), CatalogError> {
        if self.position(&tool.name, &tool.category).is_some() {
            return Err(CatalogError::Duplicate { name: tool.name, category: tool.category });
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Replace the record keyed by `(name, category)` wholesale, keeping its
    /// position in the catalog.
    pub fn replace(&mut self, name: &str, category: &str, tool: ToolRecord) -> Result<(), CatalogError> {
        let idx = self.position(name, category).ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
            category: category.to_string(),
        })?;
        if let Some(other) = self.position(&tool.name, &tool.category) {
            if other != idx {
                return Err(CatalogError::Duplicate { name: tool.name, category: tool.category });
            }
        }
        self.tools[idx] = tool;
        Ok(())
    }

    /// Remove every record matching `(name, category)`; returns how many went.
    pub fn remove(&mut self, name: &str, category: &str) -> usize {
        let before = self.tools.len();
        self.tools.retain(|t| !t.matches_key(name, category));
        before - self.tools.len()
    }

    /// Look a tool up by name, narrowing by category when given.
    pub fn find(&self, name: &str, category: Option<&str>) -> Result<&ToolRecord, CatalogError> {
        if let Some(category) = category {
            return self
                .tools
                .iter()
                .find(|t| t.matches_key(name, category))
                .ok_or_else(|| CatalogError::NotFound {
                    name: name.to_string(),
                    category: category.to_string(),
                });
        }

        let hits: Vec<&ToolRecord> = self.tools.iter().filter(|t| t.name == name).collect();
        match hits.as_slice() {
            [] => Err(CatalogError::UnknownName(name.to_string())),
            [one] => Ok(*one),
            many => Err(CatalogError::Ambiguous {
                name: name.to_string(),
                categories: many.iter().map(|t| t.category.clone()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolKind;

    fn tool(name: &str, category: &str) -> ToolRecord {
        let mut t = ToolRecord::new(name, ToolKind::CliExecutable);
        t.category = category.to_string();
        t.path = PathBuf::from(format!("/opt/{name}"));
        t
    }

    fn sample() -> Catalog {
        Catalog::from_tools(vec![
            tool("X", "Y"),
            tool("X", "Z"),
            tool("W", "Y"),
            tool("V", ""),
        ])
    }

    #[test]
    fn remove_only_touches_exact_key_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let mut catalog = sample();
        // Hand-edited files can carry the same key twice.
        catalog.tools.push(tool("X", "Y"));

        assert_eq!(catalog.remove("X", "Y"), 2);
        let names: Vec<_> = catalog.tools().iter().map(|t| (t.name.as_str(), t.category.as_str())).collect();
        assert_eq!(names, vec![("X", "Z"), ("W", "Y"), ("V", "")]);

        catalog.save(&path).unwrap();
        assert_eq!(Catalog::load(&path).unwrap(), catalog);
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let mut catalog = sample();
        assert_eq!(catalog.remove("X", "nope"), 0);
        assert_eq!(catalog, sample());
    }

    #[test]
    fn add_rejects_duplicate_key() {
        let mut catalog = sample();
        let err = catalog.add(tool("W", "Y")).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { .. }));
        catalog.add(tool("W", "Z")).unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn replace_keeps_position() {
        let mut catalog = sample();
        let mut edited = tool("W2", "Y");
        edited.kind = ToolKind::Website;
        edited.url = "https://example.com".to_string();
        catalog.replace("W", "Y", edited.clone()).unwrap();
        assert_eq!(catalog.tools()[2], edited);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn replace_rejects_collision_with_other_record() {
        let mut catalog = sample();
        let err = catalog.replace("W", "Y", tool("X", "Y")).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { .. }));
        let err = catalog.replace("nope", "Y", tool("Q", "Y")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn find_by_name_needs_category_when_ambiguous() {
        let catalog = sample();
        assert_eq!(catalog.find("W", None).unwrap().category, "Y");
        assert_eq!(catalog.find("X", Some("Z")).unwrap().category, "Z");
        assert!(matches!(catalog.find("X", None), Err(CatalogError::Ambiguous { .. })));
        assert!(matches!(catalog.find("Q", None), Err(CatalogError::UnknownName(_))));
    }

    #[test]
    fn missing_file_is_empty_and_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        assert!(Catalog::load(&path).unwrap().is_empty());

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Catalog::load(&path), Err(CatalogError::Json { .. })));
    }

    #[test]
    fn non_ascii_text_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let catalog = Catalog::from_tools(vec![tool("抓包", "测试工具")]);
        catalog.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("测试工具"));
    }
}
