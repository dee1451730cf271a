use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use anyhow::{anyhow, bail, Context, Result};
use calloop::channel::{self, Event};
use calloop::EventLoop;
use chrono::Local;
use clap::{Args as ClapArgs, Subcommand};
use log::info;
use crate::config::Theme;
use crate::context::AppContext;
use crate::executor::{self, Dispatch};
use crate::i18n::{self, Language, Text};
use crate::model::{ToolKind, ToolRecord};
use crate::opener::SystemOpener;
use crate::relay::{LaunchSession, RelayEvent, SessionCommand};
use crate::state::ViewState;
use crate::ui::{charts, render, MarkupRenderer, Palette};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tools by category, optionally filtered by name or category
    List { query: Option<String> },
    /// Show the details of one tool
    Show {
        name: String,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a tool to the catalog
    Add(AddArgs),
    /// Replace the fields of an existing tool
    Edit(EditArgs),
    /// Delete a tool
    Delete {
        name: String,
        #[arg(short, long, default_value = "")]
        category: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Launch a tool; CLI tools run in an interactive session
    Launch {
        name: String,
        #[arg(short, long)]
        category: Option<String>,
        /// Argument line for the first run instead of the stored default
        #[arg(long, allow_hyphen_values = true)]
        args: Option<String>,
    },
    /// Usage dashboard: today's top five and the 7/30 day trends
    Stats,
    /// Show or change settings
    Settings(SettingsArgs),
}

fn parse_kind(s: &str) -> Result<ToolKind, String> {
    ToolKind::from_key(s).ok_or_else(|| {
        let keys: Vec<&str> = ToolKind::ALL.iter().map(|k| k.key()).collect();
        format!("unknown type '{}', expected one of: {}", s, keys.join(", "))
    })
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    Theme::from_key(s).ok_or_else(|| format!("unknown theme '{}', expected light, dark or system", s))
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::from_key(s).ok_or_else(|| format!("unknown language '{}', expected zh or en", s))
}

fn parse_window(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

#[derive(ClapArgs, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    /// website, cli, exec, script_cli or script_gui
    #[arg(long = "type", value_parser = parse_kind)]
    pub kind: ToolKind,
    #[arg(long, default_value = "")]
    pub url: String,
    #[arg(short, long, default_value = "")]
    pub category: String,
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Default argument line
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub args: String,
    /// Companion document opened on launch
    #[arg(long)]
    pub doc: Option<PathBuf>,
    #[arg(long, default_value = "")]
    pub description: String,
}

impl AddArgs {
    fn into_record(self) -> ToolRecord {
        let mut tool = ToolRecord::new(self.name.trim(), self.kind);
        tool.url = self.url.trim().to_string();
        tool.category = self.category.trim().to_string();
        tool.path = self.path.unwrap_or_default();
        tool.args = self.args.trim().to_string();
        tool.doc_path = self.doc;
        tool.description = self.description.trim().to_string();
        tool
    }
}

#[derive(ClapArgs, Debug)]
pub struct EditArgs {
    pub name: String,
    #[arg(short, long, default_value = "")]
    pub category: String,
    #[arg(long)]
    pub new_name: Option<String>,
    #[arg(long)]
    pub new_category: Option<String>,
    #[arg(long = "type", value_parser = parse_kind)]
    pub kind: Option<ToolKind>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub path: Option<PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    pub args: Option<String>,
    /// Companion document; pass an empty string to clear it
    #[arg(long)]
    pub doc: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl EditArgs {
    /// The existing record with every given field overwritten.
    fn apply(&self, current: &ToolRecord) -> ToolRecord {
        let mut tool = current.clone();
        if let Some(name) = &self.new_name {
            tool.name = name.trim().to_string();
        }
        if let Some(category) = &self.new_category {
            tool.category = category.trim().to_string();
        }
        if let Some(kind) = self.kind {
            tool.kind = kind;
        }
        if let Some(url) = &self.url {
            tool.url = url.trim().to_string();
        }
        if let Some(path) = &self.path {
            tool.path = path.clone();
        }
        if let Some(args) = &self.args {
            tool.args = args.trim().to_string();
        }
        if let Some(doc) = &self.doc {
            let doc = doc.trim();
            tool.doc_path = (!doc.is_empty()).then(|| PathBuf::from(doc));
        }
        if let Some(description) = &self.description {
            tool.description = description.trim().to_string();
        }
        tool
    }
}

#[derive(ClapArgs, Debug)]
pub struct SettingsArgs {
    /// light, dark or system
    #[arg(long, value_parser = parse_theme)]
    pub theme: Option<Theme>,
    #[arg(long)]
    pub font_size: Option<u32>,
    /// Initial window size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_window)]
    pub window: Option<(u32, u32)>,
    /// zh or en
    #[arg(long, value_parser = parse_language)]
    pub language: Option<Language>,
    /// Command used to run script tools
    #[arg(long)]
    pub interpreter: Option<String>,
}

pub fn palette(ctx: &AppContext, plain: bool) -> Palette {
    if plain || !io::stdout().is_terminal() {
        Palette::plain()
    } else {
        Palette::for_theme(ctx.settings.theme)
    }
}

pub fn dispatch(command: Command, ctx: &mut AppContext, palette: Palette) -> Result<()> {
    let lang = ctx.settings.language;
    match command {
        Command::List { query } => {
            let mut view = ViewState::new(&ctx.catalog);
            if let Some(query) = query {
                view.update_query(&query);
            }
            if view.is_empty() {
                info!("No tools to list for query '{}'", view.query);
            }
            print!("{}", list_view(&view, lang, &palette));
        }
        Command::Show { name, category } => {
            let tool = ctx.catalog.find(&name, category.as_deref())?;
            let renderer = MarkupRenderer::new(palette)?;
            println!("{}", renderer.render(&render::details_markup(tool, lang)));
        }
        Command::Add(add) => {
            let tool = add.into_record();
            if tool.name.is_empty() {
                bail!("tool name must not be empty");
            }
            info!("Adding '{}' to '{}'", tool.name, tool.category);
            ctx.catalog.add(tool)?;
            ctx.save_catalog()?;
            println!("{}", i18n::tr(lang, Text::Saved));
        }
        Command::Edit(edit) => {
            let current = ctx.catalog.find(&edit.name, Some(edit.category.as_str()))?;
            let updated = edit.apply(current);
            ctx.catalog.replace(&edit.name, &edit.category, updated)?;
            ctx.save_catalog()?;
            println!("{}", i18n::tr(lang, Text::Saved));
        }
        Command::Delete { name, category, yes } => {
            ctx.catalog.find(&name, Some(category.as_str()))?;
            if !yes && !confirm(&format!("{} {}?", i18n::tr(lang, Text::ConfirmDelete), name))? {
                return Ok(());
            }
            let removed = ctx.catalog.remove(&name, &category);
            ctx.save_catalog()?;
            info!("Removed {} record(s) for '{}'", removed, name);
            println!("{}", i18n::tr(lang, Text::Deleted));
        }
        Command::Launch { name, category, args } => {
            let tool = ctx.catalog.find(&name, category.as_deref())?.clone();
            match executor::execute(&tool, ctx, &SystemOpener) {
                Ok(Dispatch::Session(mut command)) => {
                    if let Some(args) = args {
                        command.initial_args = crate::model::split_args(&args);
                    }
                    run_session(command, lang)?;
                }
                Ok(Dispatch::Skipped) => info!("Nothing to launch for '{}'", tool.name),
                Ok(Dispatch::Opened) | Ok(Dispatch::Detached { .. }) => {}
                Err(e) => return Err(anyhow::Error::new(e).context(i18n::tr(lang, Text::LaunchError))),
            }
        }
        Command::Stats => {
            let today = Local::now().date_naive();
            println!("{}{}{}\n", palette.heading, i18n::tr(lang, Text::RecentUsage), palette.reset);
            print!("{}", charts::dashboard(&ctx.usage, today, lang, &palette));
        }
        Command::Settings(args) => settings(ctx, args)?,
    }
    Ok(())
}

fn list_view(view: &ViewState<'_>, lang: Language, palette: &Palette) -> String {
    let mut out = format!("{}{}{}\n", palette.heading, i18n::tr(lang, Text::AppTitle), palette.reset);
    for group in &view.groups {
        let category = if group.category.is_empty() {
            i18n::tr(lang, Text::Uncategorized)
        } else {
            group.category
        };
        out.push_str(&format!("{}{}{}\n", palette.strong, category, palette.reset));
        for tool in &group.tools {
            out.push_str(&format!(
                "  {}  {}[{}]{}\n",
                tool.name,
                palette.muted,
                i18n::kind_label(lang, tool.kind),
                palette.reset
            ));
        }
    }
    out
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn settings(ctx: &mut AppContext, args: SettingsArgs) -> Result<()> {
    let SettingsArgs { theme, font_size, window, language, interpreter } = args;
    let changed = theme.is_some()
        || font_size.is_some()
        || window.is_some()
        || language.is_some()
        || interpreter.is_some();

    if changed {
        let mut next = ctx.settings.clone();
        if let Some(theme) = theme {
            next.theme = theme;
        }
        if let Some(size) = font_size {
            next.font_size = size;
        }
        if let Some((w, h)) = window {
            next.window_width = w;
            next.window_height = h;
        }
        if let Some(language) = language {
            next.language = language;
        }
        if let Some(interpreter) = interpreter {
            next.interpreter = interpreter;
        }
        ctx.settings = next.normalized();
        ctx.save_settings()?;
        info!("Settings saved to {:?}", ctx.paths.settings_file);
    }

    print!("{}", toml::to_string_pretty(&ctx.settings).context("formatting settings")?);
    Ok(())
}

struct SessionLoop {
    session: LaunchSession<channel::Sender<RelayEvent>>,
    /// Input is gone; leave once the current run has finished.
    closing: bool,
    should_exit: bool,
    language: Language,
}

impl SessionLoop {
    fn show(text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn start_run(&mut self) {
        match self.session.run() {
            Ok(started) => {
                if started.interrupted {
                    Self::show(i18n::tr(self.language, Text::Interrupted));
                }
                info!("Run {} started (pid {})", started.run, started.pid);
            }
            Err(e) => {
                info!("Run failed to start: {}", e);
                Self::show(self.session.buffer());
                if self.closing {
                    self.should_exit = true;
                }
            }
        }
    }
}

/// Interactive relay: stream output, rerun on every input line (a new line
/// replaces the arguments, an empty one reuses them), `:q` to quit.
fn run_session(command: SessionCommand, lang: Language) -> Result<()> {
    let mut event_loop: EventLoop<SessionLoop> = EventLoop::try_new()?;
    let (tx_relay, rx_relay) = channel::channel::<RelayEvent>();
    let (tx_input, rx_input) = channel::channel::<String>();

    let session = LaunchSession::new(command, lang, tx_relay);
    eprintln!("{}", i18n::tr(lang, Text::SessionHint));
    eprintln!("> {}", session.args());

    let mut state = SessionLoop { session, closing: false, should_exit: false, language: lang };

    event_loop
        .handle()
        .insert_source(rx_relay, |event, _, state: &mut SessionLoop| {
            if let Event::Msg(event) = event {
                if let Some(text) = state.session.apply(event) {
                    SessionLoop::show(&text);
                }
                if state.closing && !state.session.is_running() {
                    state.should_exit = true;
                }
            }
        })
        .map_err(|e| anyhow!("registering relay channel: {}", e.error))?;

    event_loop
        .handle()
        .insert_source(rx_input, |event, _, state: &mut SessionLoop| match event {
            Event::Msg(line) => {
                let line = line.trim();
                if line == ":q" {
                    if let Some(pid) = state.session.pid() {
                        info!("Leaving while pid {} is still running", pid);
                    }
                    state.should_exit = true;
                    return;
                }
                if !line.is_empty() {
                    state.session.set_args(line);
                }
                state.start_run();
            }
            Event::Closed => {
                state.closing = true;
                if !state.session.is_running() {
                    state.should_exit = true;
                }
            }
        })
        .map_err(|e| anyhow!("registering input channel: {}", e.error))?;

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx_input.send(line).is_err() {
                break;
            }
        }
    });

    state.start_run();
    while !state.should_exit {
        event_loop.dispatch(None, &mut state)?;
    }
    // Dropping the session kills a run that is still going.
    drop(state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn window_size_parses() {
        assert_eq!(parse_window("1600x900"), Ok((1600, 900)));
        assert_eq!(parse_window("800 X 600"), Ok((800, 600)));
        assert!(parse_window("800").is_err());
        assert!(parse_window("ax600").is_err());
    }

    #[test]
    fn kind_parser_lists_choices_on_error() {
        assert_eq!(parse_kind("script_cli"), Ok(ToolKind::InterpretedCli));
        let err = parse_kind("python").unwrap_err();
        assert!(err.contains("website, cli, exec, script_cli, script_gui"));
    }

    #[test]
    fn edit_overwrites_only_given_fields() {
        let mut current = ToolRecord::new("demo", ToolKind::InterpretedCli);
        current.category = "Dev".to_string();
        current.args = "--x 1".to_string();
        current.doc_path = Some(PathBuf::from("/tmp/doc.md"));

        let edit = EditArgs {
            name: "demo".to_string(),
            category: "Dev".to_string(),
            new_name: None,
            new_category: Some(" Ops ".to_string()),
            kind: None,
            url: None,
            path: None,
            args: Some("--y 2".to_string()),
            doc: Some(String::new()),
            description: None,
        };
        let updated = edit.apply(&current);
        assert_eq!(updated.name, "demo");
        assert_eq!(updated.category, "Ops");
        assert_eq!(updated.args, "--y 2");
        assert_eq!(updated.doc_path, None);
        assert_eq!(updated.kind, ToolKind::InterpretedCli);
    }

    #[test]
    fn list_view_groups_under_categories() {
        let mut a = ToolRecord::new("nmap", ToolKind::CliExecutable);
        a.category = "Scan".to_string();
        let b = ToolRecord::new("notes", ToolKind::Website);
        let catalog = Catalog::from_tools(vec![a, b]);
        let view = ViewState::new(&catalog);

        let out = list_view(&view, Language::English, &Palette::plain());
        assert_eq!(
            out,
            "Tool Manager\nScan\n  nmap  [CLI]\n(uncategorized)\n  notes  [Website]\n"
        );
    }
}
