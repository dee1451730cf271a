use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use anyhow::Result;
use log::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub tool: String,
    pub time: NaiveDateTime,
}

/// Append-only launch history. Grows without bound.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct UsageLog {
    pub events: Vec<UsageEvent>,
}

pub fn load_usage(path: &Path) -> UsageLog {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(log) => log,
            Err(e) => {
                warn!("Ignoring unreadable usage log {:?}: {}", path, e);
                UsageLog::default()
            }
        },
        Err(_) => UsageLog::default(),
    }
}

pub fn save_usage(path: &Path, log: &UsageLog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(log)?;
    fs::write(path, content)?;
    Ok(())
}

impl UsageLog {
    pub fn record(&mut self, tool: &str, time: NaiveDateTime) {
        debug!("Usage: {} at {}", tool, time);
        self.events.push(UsageEvent { tool: tool.to_string(), time });
    }

    /// The `limit` most launched tools on `today`, most used first. Ties keep
    /// the order in which the tools first showed up that day.
    pub fn today_top(&self, today: NaiveDate, limit: usize) -> (Vec<String>, Vec<u32>) {
        let mut counts: Vec<(&str, u32)> = Vec::new();
        for event in self.events.iter().filter(|e| e.time.date() == today) {
            match counts.iter_mut().find(|(name, _)| *name == event.tool) {
                Some((_, n)) => *n += 1,
                None => counts.push((event.tool.as_str(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(limit)
            .map(|(name, n)| (name.to_string(), n))
            .unzip()
    }

    /// Launch counts per calendar day over the `days` days ending at `today`,
    /// oldest first. Days without launches are left out.
    pub fn trend(&self, today: NaiveDate, days: u32) -> (Vec<NaiveDate>, Vec<u32>) {
        if days == 0 {
            return (Vec::new(), Vec::new());
        }
        let Some(start) = today.checked_sub_days(Days::new(u64::from(days - 1))) else {
            return (Vec::new(), Vec::new());
        };

        let mut buckets: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for event in &self.events {
            let day = event.time.date();
            if day >= start {
                *buckets.entry(day).or_insert(0) += 1;
            }
        }
        buckets.into_iter().unzip()
    }
}
