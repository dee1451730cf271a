use crate::model::ToolKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh", alias = "中文")]
    Chinese,
    #[serde(rename = "en", alias = "English")]
    English,
}

impl Language {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "zh" | "中文" => Some(Language::Chinese),
            "en" | "English" => Some(Language::English),
            _ => None,
        }
    }
}

/// Display strings, looked up per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    AppTitle,
    Category,
    Type,
    Path,
    Url,
    Args,
    LaunchError,
    ConfirmDelete,
    TodayTop5,
    Trend7,
    Trend30,
    RecentUsage,
    NoUsage,
    SessionHint,
    Interrupted,
    Uncategorized,
    Saved,
    Deleted,
}

pub fn tr(lang: Language, text: Text) -> &'static str {
    use Language::*;
    use Text::*;
    match (lang, text) {
        (Chinese, AppTitle) => "工具管理平台",
        (English, AppTitle) => "Tool Manager",
        (Chinese, Category) => "分类",
        (English, Category) => "Category",
        (Chinese, Type) => "类型",
        (English, Type) => "Type",
        (Chinese, Path) => "执行文件",
        (English, Path) => "Executable",
        (Chinese, Url) => "网址",
        (English, Url) => "URL",
        (Chinese, Args) => "默认参数",
        (English, Args) => "Default Args",
        (Chinese, LaunchError) => "启动失败",
        (English, LaunchError) => "Launch Error",
        (Chinese, ConfirmDelete) => "确认删除",
        (English, ConfirmDelete) => "Confirm Delete",
        (Chinese, TodayTop5) => "今日使用 Top5",
        (English, TodayTop5) => "Today Top5",
        (Chinese, Trend7) => "7天趋势",
        (English, Trend7) => "7-day Trend",
        (Chinese, Trend30) => "30天趋势",
        (English, Trend30) => "30-day Trend",
        (Chinese, RecentUsage) => "近期工具使用情况",
        (English, RecentUsage) => "Recent Usage",
        (Chinese, NoUsage) => "(无记录)",
        (English, NoUsage) => "(no data)",
        (Chinese, SessionHint) => "输入新参数并回车重新运行，:q 退出",
        (English, SessionHint) => "Enter new arguments to run again, :q to quit",
        (Chinese, Interrupted) => "\n--- 进程被中断 ---\n",
        (English, Interrupted) => "\n--- process interrupted ---\n",
        (Chinese, Uncategorized) => "(未分类)",
        (English, Uncategorized) => "(uncategorized)",
        (Chinese, Saved) => "已保存",
        (English, Saved) => "Saved",
        (Chinese, Deleted) => "已删除",
        (English, Deleted) => "Deleted",
    }
}

pub fn kind_label(lang: Language, kind: ToolKind) -> &'static str {
    match (lang, kind) {
        (Language::Chinese, ToolKind::Website) => "网站",
        (Language::English, ToolKind::Website) => "Website",
        (Language::Chinese, ToolKind::CliExecutable) => "命令行工具",
        (Language::English, ToolKind::CliExecutable) => "CLI",
        (Language::Chinese, ToolKind::GuiExecutable) => "可执行程序",
        (Language::English, ToolKind::GuiExecutable) => "Executable",
        (Language::Chinese, ToolKind::InterpretedCli) => "命令行Python工具",
        (Language::English, ToolKind::InterpretedCli) => "Python CLI Tool",
        (Language::Chinese, ToolKind::InterpretedGui) => "可执行Python工具",
        (Language::English, ToolKind::InterpretedGui) => "Python Executable",
    }
}

pub fn finished_marker(lang: Language, code: i32) -> String {
    match lang {
        Language::Chinese => format!("\n--- 进程结束，退出码: {} ---\n", code),
        Language::English => format!("\n--- process finished, exit code: {} ---\n", code),
    }
}

pub fn start_failed_marker(lang: Language, message: &str) -> String {
    match lang {
        Language::Chinese => format!("\n--- 启动失败: {} ---\n", message),
        Language::English => format!("\n--- failed to start: {} ---\n", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_marker_carries_code() {
        assert!(finished_marker(Language::English, 3).contains("exit code: 3"));
        assert!(finished_marker(Language::Chinese, -1).contains("退出码: -1"));
    }

    #[test]
    fn kind_labels_parse_back_as_legacy_types() {
        for lang in [Language::Chinese, Language::English] {
            for kind in ToolKind::ALL {
                let quoted = format!("\"{}\"", kind_label(lang, kind));
                let parsed: ToolKind = serde_json::from_str(&quoted).unwrap();
                assert_eq!(parsed, kind);
            }
        }
    }
}
