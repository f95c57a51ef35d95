use anyhow::{Result, bail};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use foldline_config::{Config, FoldDelays};
use foldline_engine::{
    CycleOutcome, D3Node, DocumentId, EditError, EditOutcome, FoldCommands, HeadlessRenderer,
    OutlineTree, PanelIntent, PanelOutcome, Renderer, SettleDelays, TextDocument, TreeRegistry,
    collect_agenda_items, document_symbols, editing, headline_folding_ranges,
    syntax_folding_ranges,
};
use foldline_syntax::{Document, HeadlineSyntax, Tokenizer, parse_with};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::Duration,
};

struct OutlineEntry {
    depth: usize,
    title: String,
    line: usize,
}

struct App {
    path: PathBuf,
    config: Config,
    doc: TextDocument,
    renderer: HeadlessRenderer,
    commands: FoldCommands,
    outline_state: ListState,
    scroll: usize,
    all_folded: bool,
    dirty: bool,
    status: String,
}

impl App {
    fn new(path: PathBuf, doc: TextDocument, config: Config) -> Self {
        let renderer = HeadlessRenderer::new(doc.syntax(), &doc.text());
        let commands = FoldCommands::new(TreeRegistry::new(), settle_delays(&config.delays));
        Self {
            path,
            config,
            doc,
            renderer,
            commands,
            outline_state: ListState::default(),
            scroll: 0,
            all_folded: false,
            dirty: false,
            status: String::new(),
        }
    }

    fn move_caret(&mut self, down: bool) {
        let caret = self.renderer.caret_line();
        let visible = self.renderer.visible_lines();
        let target = if down {
            visible.iter().find(|&&line| line > caret)
        } else {
            visible.iter().rev().find(|&&line| line < caret)
        };
        if let Some(&line) = target {
            self.renderer.move_caret_to(line, 0);
        }
    }

    /// Move to the next or previous visible headline.
    fn jump_headline(&mut self, down: bool) {
        let caret = self.renderer.caret_line();
        let lines: Vec<usize> = self
            .outline_entries()
            .into_iter()
            .map(|entry| entry.line)
            .filter(|&line| !self.renderer.is_hidden(line))
            .collect();
        let target = if down {
            lines.iter().find(|&&line| line > caret)
        } else {
            lines.iter().rev().find(|&&line| line < caret)
        };
        if let Some(&line) = target {
            self.panel_intent(PanelIntent::SelectNode { line });
        }
    }

    fn cycle(&mut self) {
        if self.commands.cycle_folding(&self.doc, &mut self.renderer) == CycleOutcome::PassThrough
        {
            self.status = "Not on a headline".to_string();
        }
    }

    fn toggle_all(&mut self) {
        if self.all_folded {
            self.commands.unfold_all(&self.doc, &mut self.renderer);
        } else {
            self.commands.fold_all(&self.doc, &mut self.renderer);
        }
        self.all_folded = !self.all_folded;
    }

    fn panel_intent(&mut self, intent: PanelIntent) {
        match self
            .commands
            .handle_panel_intent(&mut self.doc, &mut self.renderer, intent)
        {
            Ok(PanelOutcome::Saved) => self.reload_view(self.renderer.caret_line()),
            Ok(PanelOutcome::NoTarget(reason)) => self.status = reason.to_string(),
            Ok(_) => {}
            Err(error) => self.report(&error),
        }
    }

    fn edit(&mut self, op: impl FnOnce(&mut TextDocument, usize) -> Result<EditOutcome, EditError>) {
        let caret = self.renderer.caret_line();
        match op(&mut self.doc, caret) {
            Ok(EditOutcome::Applied { cursor_line }) => self.reload_view(cursor_line),
            Ok(EditOutcome::NoTarget(reason)) => self.status = reason.to_string(),
            Err(error) => self.report(&error),
        }
    }

    fn cycle_todo(&mut self) {
        let keywords = self.config.todo_keywords.clone();
        let cycle = self.config.todo_cycle.clone();
        self.edit(|doc, line| {
            editing::cycle_todo_at(doc, line, keywords.as_slice(), cycle.as_slice())
        });
    }

    fn cycle_priority(&mut self) {
        let keywords = self.config.todo_keywords.clone();
        self.edit(|doc, line| editing::cycle_priority_at(doc, line, keywords.as_slice()));
    }

    fn reload_view(&mut self, cursor_line: usize) {
        self.renderer.set_text(&self.doc.text());
        self.commands.document_changed(&self.doc);
        self.renderer.move_caret_to(cursor_line, 0);
        self.dirty = true;
    }

    fn write(&mut self) -> Result<()> {
        fs::write(&self.path, self.doc.text())?;
        self.dirty = false;
        self.status = format!("Wrote {}", self.path.display());
        log::info!("{}", self.status);
        Ok(())
    }

    fn report(&mut self, error: &EditError) {
        log::error!("edit failed: {error}");
        self.status = error.to_string();
    }

    fn outline_entries(&mut self) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        flatten(&self.commands.tree_for(&self.doc).to_d3_format(), 0, &mut entries);
        entries
    }
}

fn flatten(nodes: &[D3Node], depth: usize, out: &mut Vec<OutlineEntry>) {
    for node in nodes {
        out.push(OutlineEntry {
            depth,
            title: node.title.clone(),
            line: node.line,
        });
        flatten(&node.children, depth + 1, out);
    }
}

fn settle_delays(delays: &FoldDelays) -> SettleDelays {
    SettleDelays {
        caret: Duration::from_millis(delays.caret_ms),
        primitive: Duration::from_millis(delays.settle_ms),
        child: Duration::from_millis(delays.child_ms),
        verify: Duration::from_millis(delays.verify_ms),
    }
}

#[derive(Debug, Clone, Copy)]
enum DumpMode {
    Outline,
    Symbols,
    Agenda,
    Ranges,
}

impl DumpMode {
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "--outline" => Some(Self::Outline),
            "--symbols" => Some(Self::Symbols),
            "--agenda" => Some(Self::Agenda),
            "--ranges" => Some(Self::Ranges),
            _ => None,
        }
    }
}

fn parse_org(config: &Config, text: &str) -> Document {
    parse_with(&Tokenizer::new(config.todo_keywords.iter().cloned()), text)
}

fn dump(mode: DumpMode, config: &Config, doc: &TextDocument) -> Result<String> {
    let syntax = doc.syntax();
    let text = doc.text();
    let json = match (mode, syntax) {
        (DumpMode::Outline, _) => {
            serde_json::to_string_pretty(&OutlineTree::from_text(syntax, &text).to_d3_format())?
        }
        (DumpMode::Ranges, HeadlineSyntax::Org) => {
            serde_json::to_string_pretty(&syntax_folding_ranges(&parse_org(config, &text)))?
        }
        (DumpMode::Ranges, HeadlineSyntax::Markdown) => {
            serde_json::to_string_pretty(&headline_folding_ranges(syntax, &text))?
        }
        (DumpMode::Symbols, HeadlineSyntax::Org) => {
            serde_json::to_string_pretty(&document_symbols(&parse_org(config, &text)))?
        }
        (DumpMode::Agenda, HeadlineSyntax::Org) => {
            serde_json::to_string_pretty(&collect_agenda_items(&parse_org(config, &text)))?
        }
        (DumpMode::Symbols | DumpMode::Agenda, HeadlineSyntax::Markdown) => {
            bail!("{mode:?} output needs an Org document")
        }
    };
    Ok(json)
}

fn init_logging(config: &Config, to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env();
    if to_file {
        // The TUI owns the terminal, so logs go to a file.
        let log_path = config
            .log_file
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("foldline.log"));
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [--outline|--symbols|--agenda|--ranges] <file>");
    process::exit(1);
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("foldline", String::as_str);
    let (mode, file) = match args.as_slice() {
        [_, file] if !file.starts_with("--") => (None, file),
        [_, flag, file] => match DumpMode::from_flag(flag) {
            Some(mode) => (Some(mode), file),
            None => usage(program),
        },
        _ => usage(program),
    };

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let path = PathBuf::from(file);
    let Some(syntax) = config.syntax_for_path(&path) else {
        eprintln!(
            "Error: '{}' matches no document pattern in {}",
            path.display(),
            Config::config_path().display()
        );
        process::exit(1);
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {e}", path.display());
            process::exit(1);
        }
    };
    let doc = TextDocument::from_bytes(DocumentId::from_path(&path), syntax, &bytes)?;

    init_logging(&config, mode.is_none())?;

    if let Some(mode) = mode {
        println!("{}", dump(mode, &config, &doc)?);
        return Ok(());
    }

    log::info!("opening {} as {syntax:?}", path.display());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(path, doc, config);

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.status.clear();
            let alt = key.modifiers.contains(KeyModifiers::ALT);
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Up if alt => app.edit(editing::move_headline_up),
                KeyCode::Down if alt => app.edit(editing::move_headline_down),
                KeyCode::Left if alt => app.edit(editing::promote_headline),
                KeyCode::Right if alt => app.edit(editing::demote_headline),
                KeyCode::Up | KeyCode::Char('k') => app.move_caret(false),
                KeyCode::Down | KeyCode::Char('j') => app.move_caret(true),
                KeyCode::PageUp => app.jump_headline(false),
                KeyCode::PageDown => app.jump_headline(true),
                KeyCode::Tab => app.cycle(),
                KeyCode::BackTab => app.toggle_all(),
                KeyCode::Char('t') => app.cycle_todo(),
                KeyCode::Char('p') => app.cycle_priority(),
                KeyCode::Char('w') => {
                    if let Err(e) = app.write() {
                        app.status = format!("Write failed: {e}");
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(rows[0]);

    let caret = app.renderer.caret_line();

    // Outline panel
    let entries = app.outline_entries();
    let selected = entries.iter().rposition(|entry| entry.line <= caret);
    app.outline_state.select(selected);
    let outline_items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let marker = if app.renderer.is_collapsed(entry.line) {
                "▸"
            } else {
                "▾"
            };
            let indent = "  ".repeat(entry.depth);
            ListItem::new(Line::from(format!("{indent}{marker} {}", entry.title)))
        })
        .collect();
    let outline = List::new(outline_items)
        .block(Block::default().borders(Borders::ALL).title("Outline"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(outline, chunks[0], &mut app.outline_state);

    // Document panel, hidden lines elided
    let visible = app.renderer.visible_lines();
    let height = chunks[1].height.saturating_sub(2).max(1) as usize;
    let caret_row = visible.iter().position(|&line| line == caret).unwrap_or(0);
    if caret_row < app.scroll {
        app.scroll = caret_row;
    } else if caret_row >= app.scroll + height {
        app.scroll = caret_row + 1 - height;
    }

    let lines: Vec<Line> = visible
        .iter()
        .map(|&line| {
            let text = app.renderer.line_text(line).unwrap_or_default();
            let fold = if app.renderer.is_collapsed(line) { " …" } else { "" };
            let style = if line == caret {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:>4} ", line + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{text}{fold}"), style),
            ])
        })
        .collect();
    let title = if app.dirty {
        format!("{} [+]", app.path.display())
    } else {
        app.path.display().to_string()
    };
    let document = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((app.scroll as u16, 0));
    f.render_widget(document, chunks[1]);

    // Instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | ↑/↓: Move | Tab: Cycle | S-Tab: Fold all | "),
        Span::raw("Alt-↑/↓: Move headline | Alt-←/→: Promote/Demote | "),
        Span::raw("t: TODO | p: Priority | w: Write"),
    ]);
    let status = Line::from(Span::styled(
        app.status.clone(),
        Style::default().fg(Color::Yellow),
    ));
    f.render_widget(Paragraph::new(vec![help_text, status]), rows[1]);
}
