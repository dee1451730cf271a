use chrono::NaiveDate;
use crate::i18n::{self, Language, Text};
use crate::usage::UsageLog;
use super::Palette;

const BAR_WIDTH: usize = 40;
const BAR: char = '█';

/// Horizontal bar chart, one row per label, bars scaled to the largest value.
pub fn bar_chart(title: &str, labels: &[String], values: &[u32], palette: &Palette, empty: &str) -> String {
    let mut out = format!("{}{}{}\n", palette.heading, title, palette.reset);
    if labels.is_empty() {
        out.push_str(&format!("  {}{}{}\n", palette.muted, empty, palette.reset));
        return out;
    }

    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0).max(1) as usize;

    for (label, &value) in labels.iter().zip(values) {
        let len = (value as usize * BAR_WIDTH).div_ceil(max);
        let pad = label_width - label.chars().count();
        out.push_str(&format!(
            "  {}{} {}{}{} {}\n",
            label,
            " ".repeat(pad),
            palette.bar,
            BAR.to_string().repeat(len),
            palette.reset,
            value
        ));
    }
    out
}

pub fn trend_labels(days: &[NaiveDate]) -> Vec<String> {
    days.iter().map(|d| d.format("%m-%d").to_string()).collect()
}

/// The usage dashboard: today's top five, then the 7 and 30 day trends.
pub fn dashboard(usage: &UsageLog, today: NaiveDate, lang: Language, palette: &Palette) -> String {
    let empty = i18n::tr(lang, Text::NoUsage);
    let mut sections = Vec::new();

    let (tools, counts) = usage.today_top(today, 5);
    sections.push(bar_chart(i18n::tr(lang, Text::TodayTop5), &tools, &counts, palette, empty));

    for (days, title) in [(7, Text::Trend7), (30, Text::Trend30)] {
        let (dates, counts) = usage.trend(today, days);
        sections.push(bar_chart(
            i18n::tr(lang, title),
            &trend_labels(&dates),
            &counts,
            palette,
            empty,
        ));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_largest_value() {
        let labels = vec!["A".to_string(), "Bee".to_string()];
        let out = bar_chart("Top", &labels, &[2, 1], &Palette::plain(), "-");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Top");
        assert_eq!(lines[1], format!("  A   {} 2", "█".repeat(BAR_WIDTH)));
        assert_eq!(lines[2], format!("  Bee {} 1", "█".repeat(BAR_WIDTH / 2)));
    }

    #[test]
    fn empty_chart_says_so() {
        let out = bar_chart("Top", &[], &[], &Palette::plain(), "(no data)");
        assert_eq!(out, "Top\n  (no data)\n");
    }

    #[test]
    fn dashboard_has_three_sections() {
        let mut usage = UsageLog::default();
        let now = "2024-05-01T09:00:00".parse().unwrap();
        usage.record("A", now);
        let today = now.date();

        let out = dashboard(&usage, today, Language::English, &Palette::plain());
        assert!(out.contains("Today Top5\n  A "));
        assert!(out.contains("7-day Trend\n  05-01 "));
        assert!(out.contains("30-day Trend\n  05-01 "));
    }
}
