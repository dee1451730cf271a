use regex::Regex;
use crate::config::Theme;
use crate::i18n::{self, Language, Text};
use crate::model::ToolRecord;

const RESET: &str = "\x1b[0m";

/// ANSI styles for terminal output. All empty in plain mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub heading: &'static str,
    pub strong: &'static str,
    pub emphasis: &'static str,
    pub code: &'static str,
    pub link: &'static str,
    pub muted: &'static str,
    pub bar: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn plain() -> Self {
        Self {
            heading: "",
            strong: "",
            emphasis: "",
            code: "",
            link: "",
            muted: "",
            bar: "",
            reset: "",
        }
    }

    pub fn for_theme(theme: Theme) -> Self {
        if theme.is_dark() {
            Self {
                heading: "\x1b[1;96m",
                strong: "\x1b[1;97m",
                emphasis: "\x1b[3m",
                code: "\x1b[93m",
                link: "\x1b[4;94m",
                muted: "\x1b[90m",
                bar: "\x1b[92m",
                reset: RESET,
            }
        } else {
            Self {
                heading: "\x1b[1;34m",
                strong: "\x1b[1;30m",
                emphasis: "\x1b[3m",
                code: "\x1b[35m",
                link: "\x1b[4;34m",
                muted: "\x1b[37m",
                bar: "\x1b[32m",
                reset: RESET,
            }
        }
    }
}

/// Turns the lightweight markup used in tool descriptions into terminal text:
/// `#` headings, `-`/`*` bullets, fenced code blocks, and inline
/// `**strong**`, `*emphasis*`, `` `code` `` and `[text](url)` links.
pub struct MarkupRenderer {
    strong: Regex,
    emphasis: Regex,
    code: Regex,
    link: Regex,
    heading: Regex,
    bullet: Regex,
    pub palette: Palette,
}

impl MarkupRenderer {
    pub fn new(palette: Palette) -> Result<Self, regex::Error> {
        Ok(Self {
            strong: Regex::new(r"\*\*(.+?)\*\*")?,
            emphasis: Regex::new(r"\*([^*\s][^*]*?)\*")?,
            code: Regex::new(r"`([^`]+)`")?,
            link: Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)")?,
            heading: Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$")?,
            bullet: Regex::new(r"^(\s*)[-*+]\s+(.*)$")?,
            palette,
        })
    }

    fn inline(&self, text: &str) -> String {
        let p = &self.palette;
        let text = self.code.replace_all(text, format!("{}${{1}}{}", p.code, p.reset));
        let text = self
            .link
            .replace_all(&text, format!("{}${{1}}{} (${{2}})", p.link, p.reset));
        let text = self.strong.replace_all(&text, format!("{}${{1}}{}", p.strong, p.reset));
        let text = self
            .emphasis
            .replace_all(&text, format!("{}${{1}}{}", p.emphasis, p.reset));
        text.into_owned()
    }

    pub fn render(&self, markup: &str) -> String {
        let p = &self.palette;
        let mut out: Vec<String> = Vec::new();
        let mut in_fence = false;

        for line in markup.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                out.push(format!("    {}{}{}", p.code, line, p.reset));
                continue;
            }

            if let Some(caps) = self.heading.captures(line) {
                let level = caps[1].len();
                let title = self.inline(&caps[2]);
                out.push(format!("{}{}{}", p.heading, title, p.reset));
                if level <= 2 {
                    let rule = if level == 1 { '=' } else { '-' };
                    let width = caps[2].chars().count().max(3);
                    out.push(rule.to_string().repeat(width));
                }
            } else if let Some(caps) = self.bullet.captures(line) {
                out.push(format!("{}  • {}", &caps[1], self.inline(&caps[2])));
            } else {
                out.push(self.inline(line));
            }
        }
        out.join("\n")
    }
}

/// The details pane for one tool: title, category and type, then the
/// description.
pub fn details_markup(tool: &ToolRecord, lang: Language) -> String {
    let mut md = format!(
        "# {}\n\n- **{}**: {}\n- **{}**: {}\n",
        tool.name,
        i18n::tr(lang, Text::Category),
        tool.category,
        i18n::tr(lang, Text::Type),
        i18n::kind_label(lang, tool.kind),
    );
    if tool.kind.uses_url() && !tool.url.is_empty() {
        md.push_str(&format!("- **{}**: {}\n", i18n::tr(lang, Text::Url), tool.url));
    }
    if tool.kind.uses_path() && !tool.path.as_os_str().is_empty() {
        md.push_str(&format!(
            "- **{}**: `{}`\n",
            i18n::tr(lang, Text::Path),
            tool.path.display()
        ));
    }
    if tool.kind.uses_args() && !tool.args.is_empty() {
        md.push_str(&format!("- **{}**: `{}`\n", i18n::tr(lang, Text::Args), tool.args));
    }
    if !tool.description.is_empty() {
        md.push('\n');
        md.push_str(&tool.description);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolKind;

    fn plain() -> MarkupRenderer {
        MarkupRenderer::new(Palette::plain()).unwrap()
    }

    #[test]
    fn headings_get_a_rule() {
        assert_eq!(plain().render("# Title"), "Title\n=====");
        assert_eq!(plain().render("## Sub ##"), "Sub\n---");
        assert_eq!(plain().render("### Deep"), "Deep");
    }

    #[test]
    fn inline_markup_is_stripped_in_plain_mode() {
        let out = plain().render("Use **bold**, *soft* and `code` see [docs](https://x.io)");
        assert_eq!(out, "Use bold, soft and code see docs (https://x.io)");
    }

    #[test]
    fn bullets_and_fences() {
        let md = "- one\n  * two\n```\n**raw**\n```\nafter";
        assert_eq!(plain().render(md), "  • one\n    • two\n    **raw**\nafter");
    }

    #[test]
    fn palette_wraps_styled_spans() {
        let renderer = MarkupRenderer::new(Palette::for_theme(Theme::Dark)).unwrap();
        let out = renderer.render("**hi**");
        assert_eq!(out, format!("{}hi{}", renderer.palette.strong, RESET));
    }

    #[test]
    fn details_show_only_active_fields() {
        let mut tool = ToolRecord::new("Burp", ToolKind::GuiExecutable);
        tool.category = "测试工具".to_string();
        tool.path = "/opt/burp".into();
        tool.url = "https://unused.example".to_string();
        tool.args = "--unused".to_string();
        tool.description = "Proxy for **web** testing".to_string();

        let out = plain().render(&details_markup(&tool, Language::English));
        assert!(out.starts_with("Burp\n===="));
        assert!(out.contains("  • Category: 测试工具"));
        assert!(out.contains("  • Type: Executable"));
        assert!(out.contains("  • Executable: /opt/burp"));
        assert!(!out.contains("unused"));
        assert!(out.ends_with("Proxy for web testing"));
    }
}
