use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use crate::catalog::Catalog;
use crate::config::{self, DataPaths, Settings};
use crate::usage::{self, UsageLog};

/// Everything the launcher reads and writes, loaded once per invocation.
pub struct AppContext {
    pub paths: DataPaths,
    pub settings: Settings,
    pub catalog: Catalog,
    pub usage: UsageLog,
}

impl AppContext {
    pub fn load(paths: DataPaths) -> Result<Self> {
        let settings = config::load_settings(&paths.settings_file);
        let catalog = Catalog::load(&paths.tools_file)?;
        let usage = usage::load_usage(&paths.usage_file);
        info!(
            "Context: {} tools, {} usage events, language {:?}",
            catalog.len(),
            usage.events.len(),
            settings.language
        );
        if catalog.is_empty() {
            info!("Catalog {:?} is empty", paths.tools_file);
        }
        Ok(Self { paths, settings, catalog, usage })
    }

    pub fn save_catalog(&self) -> Result<()> {
        self.catalog.save(&self.paths.tools_file)?;
        Ok(())
    }

    pub fn save_settings(&self) -> Result<()> {
        config::save_settings(&self.paths.settings_file, &self.settings)
    }

    /// Append a usage event stamped with the local time and rewrite the log.
    pub fn record_usage(&mut self, tool: &str) -> Result<()> {
        self.usage.record(tool, Local::now().naive_local());
        usage::save_usage(&self.paths.usage_file, &self.usage)
            .with_context(|| format!("writing {}", self.paths.usage_file.display()))
    }
}
