use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a catalog entry is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "website", alias = "网站", alias = "Website")]
    Website,
    #[serde(rename = "cli", alias = "命令行工具", alias = "CLI")]
    CliExecutable,
    #[serde(rename = "exec", alias = "可执行程序", alias = "Executable")]
    GuiExecutable,
    #[serde(rename = "script_cli", alias = "命令行Python工具", alias = "Python CLI Tool")]
    InterpretedCli,
    #[serde(rename = "script_gui", alias = "可执行Python工具", alias = "Python Executable")]
    InterpretedGui,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Website,
        ToolKind::CliExecutable,
        ToolKind::GuiExecutable,
        ToolKind::InterpretedCli,
        ToolKind::InterpretedGui,
    ];

    /// Short identifier used on the command line and in the catalog file.
    pub fn key(self) -> &'static str {
        match self {
            ToolKind::Website => "website",
            ToolKind::CliExecutable => "cli",
            ToolKind::GuiExecutable => "exec",
            ToolKind::InterpretedCli => "script_cli",
            ToolKind::InterpretedGui => "script_gui",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    pub fn uses_url(self) -> bool {
        self == ToolKind::Website
    }

    pub fn uses_path(self) -> bool {
        self != ToolKind::Website
    }

    pub fn uses_args(self) -> bool {
        matches!(self, ToolKind::CliExecutable | ToolKind::InterpretedCli)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub args: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_path: Option<PathBuf>,
    #[serde(default)]
    pub description: String,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: String::new(),
            category: String::new(),
            path: PathBuf::new(),
            args: String::new(),
            doc_path: None,
            description: String::new(),
        }
    }

    pub fn matches_key(&self, name: &str, category: &str) -> bool {
        self.name == name && self.category == category
    }

    /// The companion document, if one is set. Old catalogs store "" for none.
    pub fn companion_doc(&self) -> Option<&Path> {
        self.doc_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Stored default arguments, split on whitespace.
    pub fn default_args(&self) -> Vec<String> {
        split_args(&self.args)
    }
}

pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}
