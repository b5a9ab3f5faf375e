use std::borrow::Cow;
use std::io;

use coa_accounts::{AccountId, AccountRecord, AccountSource, AccountType, ChartOfAccounts};
use coa_tree::Forest;
use coa_view::{TreeFilter, TreeRow, TreeViewState, apply_filter};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    CompletedFrame, DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::debug;

#[derive(Error, Debug)]
pub enum TuiError {
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub async fn browse<Source>(source: &Source, chart: ChartOfAccounts) -> Result<(), TuiError>
where
    Source: AccountSource + ?Sized,
{
    let mut terminal = TerminalSession::init();
    let mut app = BrowseApp::new(chart);
    let mut events = read_events();

    loop {
        terminal.draw(|frame| draw_ui(frame, &mut app))?;

        let Some(event) = events.recv().await else {
            break;
        };

        match app.handle_event(event) {
            Action::None => {}
            Action::Quit => break,
            Action::Reload => {
                let reloaded = ChartOfAccounts::load(source, app.chart.company_id()).await;
                match reloaded {
                    Ok(chart) => app.replace_chart(chart),
                    Err(error) => app.status = Some(format!("reload failed: {error}")),
                }
            }
        }
    }

    Ok(())
}

struct TerminalSession {
    terminal: DefaultTerminal,
}

impl TerminalSession {
    fn init() -> Self {
        let terminal = ratatui::init();
        Self { terminal }
    }

    pub fn draw<F>(&mut self, render_callback: F) -> Result<CompletedFrame<'_>, TuiError>
    where
        F: FnOnce(&mut Frame),
    {
        Ok(self.terminal.draw(render_callback)?)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

fn read_events() -> UnboundedReceiver<Event> {
    let (event_tx, event_rx) = unbounded_channel();

    std::thread::spawn(move || {
        loop {
            if let Ok(event) = crossterm::event::read() {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        }
    });

    event_rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

#[derive(Debug, Clone)]
struct BrowseApp {
    chart: ChartOfAccounts,
    view: TreeViewState<AccountId>,
    filter: TreeFilter<AccountType>,
    /// `chart` narrowed by `filter`; `None` while the filter lets everything
    /// through.
    filtered: Option<Forest<AccountRecord>>,
    mode: InputMode,
    selected: Option<AccountId>,
    list_offset: usize,
    status: Option<String>,
}

impl BrowseApp {
    fn new(chart: ChartOfAccounts) -> Self {
        let mut view = TreeViewState::new();
        view.load(chart.company_id(), chart.forest());

        let mut app = Self {
            chart,
            view,
            filter: TreeFilter::default(),
            filtered: None,
            mode: InputMode::Normal,
            selected: None,
            list_offset: 0,
            status: None,
        };
        app.clamp_selection();
        app
    }

    fn visible_forest(&self) -> &Forest<AccountRecord> {
        self.filtered.as_ref().unwrap_or(self.chart.forest())
    }

    fn rows(&self) -> Vec<TreeRow<AccountId>> {
        self.view.visible_rows(self.visible_forest())
    }

    /// Recompute `filtered` after the filter or the chart changed.
    fn refilter(&mut self) {
        self.filtered = match apply_filter(self.chart.forest(), &self.filter) {
            Cow::Borrowed(_) => None,
            Cow::Owned(forest) => Some(forest),
        };
        self.clamp_selection();
    }

    fn selected_row(&self, rows: &[TreeRow<AccountId>]) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        rows.iter().position(|row| &row.id == selected)
    }

    fn replace_chart(&mut self, chart: ChartOfAccounts) {
        self.view.load(chart.company_id(), chart.forest());
        self.status = Some(format!("reloaded {} accounts", chart.forest().len()));
        self.chart = chart;
        self.refilter();
    }

    fn handle_event(&mut self, event: Event) -> Action {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event
        else {
            return Action::None;
        };
        if kind != KeyEventKind::Press {
            return Action::None;
        }

        match self.mode {
            InputMode::Normal if modifiers == KeyModifiers::NONE => self.handle_key_normal(code),
            InputMode::Search if modifiers.difference(KeyModifiers::SHIFT).is_empty() => {
                self.handle_key_search(code);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_key_normal(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Char('r') => return Action::Reload,

            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Home | KeyCode::Char('g') => self.move_selection(i32::MIN),
            KeyCode::End => self.move_selection(i32::MAX),

            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),

            KeyCode::Char('e') => {
                self.view.expand_all(self.chart.forest());
            }
            KeyCode::Char('c') => {
                self.view.collapse_all();
                self.clamp_selection();
            }

            KeyCode::Char('/') => self.mode = InputMode::Search,
            KeyCode::Char('t') => self.cycle_type_filter(),

            _ => {}
        }

        Action::None
    }

    fn handle_key_search(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.filter.query.push(c),
            KeyCode::Backspace => {
                self.filter.query.pop();
            }
            KeyCode::Enter => {
                self.mode = InputMode::Normal;
                return;
            }
            KeyCode::Esc => {
                self.filter.query.clear();
                self.mode = InputMode::Normal;
            }
            _ => return,
        }
        self.refilter();
    }

    fn cycle_type_filter(&mut self) {
        let next = match self.filter.kind {
            None => AccountType::ALL.first().copied(),
            Some(current) => AccountType::ALL
                .iter()
                .position(|typ| *typ == current)
                .and_then(|index| AccountType::ALL.get(index + 1))
                .copied(),
        };
        debug!(?next, "type filter");
        self.filter.kind = next;
        self.refilter();
    }

    fn move_selection(&mut self, delta: i32) {
        let rows = self.rows();

        if rows.is_empty() {
            self.selected = None;
            self.list_offset = 0;
            return;
        }

        let current_row = self.selected_row(&rows).unwrap_or(0);
        let next_row = if delta >= 0 {
            current_row.saturating_add(delta as usize).min(rows.len() - 1)
        } else {
            current_row.saturating_sub(delta.unsigned_abs() as usize)
        };

        self.selected = Some(rows[next_row].id.clone());
    }

    fn toggle_selected(&mut self) {
        let rows = self.rows();
        let Some(row) = self.selected_row(&rows).map(|index| &rows[index]) else {
            return;
        };
        if row.is_branch {
            self.view.toggle(&row.id);
        }
    }

    /// Keep the selection on a visible row: the selected account itself, else
    /// its nearest visible ancestor, else the first row.
    fn clamp_selection(&mut self) {
        let rows = self.rows();
        if self.selected_row(&rows).is_some() {
            return;
        }

        let ancestor = self.selected.as_ref().and_then(|selected| {
            let path = self.visible_forest().path_to(selected)?;
            path.iter()
                .rev()
                .map(|node| &node.record.id)
                .find(|id| rows.iter().any(|row| &row.id == *id))
                .cloned()
        });

        self.selected = ancestor.or_else(|| rows.first().map(|row| row.id.clone()));
        if self.selected.is_none() {
            self.list_offset = 0;
        }
    }

    fn ensure_visible_row(&mut self, selected_row: usize, height: usize) {
        if height == 0 {
            return;
        }

        let bottom = self.list_offset + height.saturating_sub(1);

        if selected_row < self.list_offset {
            self.list_offset = selected_row;
        } else if selected_row > bottom {
            self.list_offset = selected_row.saturating_sub(height.saturating_sub(1));
        }
    }
}

fn draw_ui(frame: &mut Frame, app: &mut BrowseApp) {
    let outer = Block::bordered().title_top("coa");
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(outer.inner(frame.area()));

    frame.render_widget(outer, frame.area());
    draw_header(frame, layout[0], app);
    draw_tree(frame, layout[1], app);
    draw_help(frame, layout[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &BrowseApp) {
    let mut spans = vec![
        Span::styled("company: ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.chart.company_id().to_owned()),
        Span::styled("  search: ", Style::default().fg(Color::DarkGray)),
    ];

    let query = if app.mode == InputMode::Search {
        format!("{}▏", app.filter.query)
    } else {
        app.filter.query.clone()
    };
    spans.push(Span::styled(query, Style::default().fg(Color::Cyan)));

    spans.push(Span::styled("  type: ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw(
        app.filter
            .kind
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "all".into()),
    ));

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("  {status}"),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_tree(frame: &mut Frame, area: Rect, app: &mut BrowseApp) {
    let rows = app.rows();
    let selected_row = app.selected_row(&rows);

    let items = rows
        .iter()
        .map(|row| {
            let mut spans: Vec<Span> = Vec::new();
            spans.push(Span::raw("  ".repeat(row.depth)));

            if row.is_branch {
                spans.push(Span::styled(
                    format!("{} ", if row.is_expanded { "▼" } else { "▶" }),
                    Style::default().fg(Color::Yellow),
                ));
            } else {
                spans.push(Span::styled("• ", Style::default().fg(Color::DarkGray)));
            }

            spans.push(Span::raw(row.label.as_str()));

            ListItem::new(Line::from(spans))
        })
        .collect::<Vec<_>>();

    let inner_height = area.height.saturating_sub(2) as usize;
    if let Some(selected_row) = selected_row {
        app.ensure_visible_row(selected_row, inner_height);
    }

    let mut list_state = ListState::default();
    list_state.select(selected_row);
    *list_state.offset_mut() = app.list_offset;

    let title = format!("accounts ({} shown)", rows.len());
    let widget = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(widget, area, &mut list_state);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &BrowseApp) {
    let text = match app.mode {
        InputMode::Normal => {
            "↑/↓ move  enter toggle  e expand  c collapse  / search  t type  r reload  q quit"
        }
        InputMode::Search => "type to search  enter done  esc clear",
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> ChartOfAccounts {
        ChartOfAccounts::from_records(
            "acme",
            vec![
                AccountRecord::new("1", None, "1000", "Assets", AccountType::Asset),
                AccountRecord::new("2", Some("1".into()), "1010", "Cash", AccountType::Asset),
                AccountRecord::new(
                    "3",
                    Some("2".into()),
                    "1011",
                    "Petty cash",
                    AccountType::Asset,
                ),
                AccountRecord::new("4", None, "2000", "Liabilities", AccountType::Liability),
                AccountRecord::new(
                    "5",
                    Some("4".into()),
                    "2100",
                    "Payables",
                    AccountType::Liability,
                ),
            ],
        )
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn press(app: &mut BrowseApp, codes: &[KeyCode]) -> Action {
        codes
            .iter()
            .map(|code| app.handle_event(key(*code)))
            .last()
            .unwrap_or(Action::None)
    }

    fn labels(app: &BrowseApp) -> Vec<String> {
        app.rows().iter().map(ToString::to_string).collect()
    }

    fn selected(app: &BrowseApp) -> Option<&str> {
        app.selected.as_ref().map(AccountId::as_str)
    }

    #[test]
    fn starts_expanded_on_first_row() {
        let app = BrowseApp::new(chart());
        assert_eq!(app.rows().len(), 5);
        assert_eq!(selected(&app), Some("1"));
    }

    #[test]
    fn enter_toggles_selected_branch() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(
            labels(&app),
            vec!["▶ 1000 Assets", "▼ 2000 Liabilities", "  • 2100 Payables"]
        );

        press(&mut app, &[KeyCode::Char(' ')]);
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn toggling_a_leaf_does_nothing() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
        assert_eq!(selected(&app), Some("3"));
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn movement_stops_at_edges() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Up]);
        assert_eq!(selected(&app), Some("1"));

        press(&mut app, &[KeyCode::End]);
        assert_eq!(selected(&app), Some("5"));
        press(&mut app, &[KeyCode::Char('j')]);
        assert_eq!(selected(&app), Some("5"));

        press(&mut app, &[KeyCode::Home]);
        assert_eq!(selected(&app), Some("1"));
    }

    #[test]
    fn collapse_all_moves_selection_to_visible_ancestor() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Down, KeyCode::Down]);
        assert_eq!(selected(&app), Some("3"));

        press(&mut app, &[KeyCode::Char('c')]);
        assert_eq!(labels(&app), vec!["▶ 1000 Assets", "▶ 2000 Liabilities"]);
        assert_eq!(selected(&app), Some("1"));

        press(&mut app, &[KeyCode::Char('e')]);
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn search_narrows_and_escape_clears() {
        let mut app = BrowseApp::new(chart());
        press(
            &mut app,
            &[
                KeyCode::Char('/'),
                KeyCode::Char('p'),
                KeyCode::Char('e'),
                KeyCode::Char('t'),
                KeyCode::Char('t'),
                KeyCode::Char('y'),
            ],
        );
        assert_eq!(app.mode, InputMode::Search);
        assert_eq!(app.filter.query, "petty");
        assert_eq!(app.filtered.as_ref().map(Forest::len), Some(3));
        assert_eq!(
            labels(&app),
            vec!["▼ 1000 Assets", "  ▼ 1010 Cash", "    • 1011 Petty cash"]
        );

        press(&mut app, &[KeyCode::Backspace]);
        assert_eq!(app.filter.query, "pett");

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.filter.query.is_empty());
        assert!(app.filtered.is_none());
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn reload_refilters_new_chart() {
        let mut app = BrowseApp::new(chart());
        press(
            &mut app,
            &[
                KeyCode::Char('/'),
                KeyCode::Char('p'),
                KeyCode::Char('a'),
                KeyCode::Char('y'),
                KeyCode::Enter,
            ],
        );
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(labels(&app), vec!["▼ 2000 Liabilities", "  • 2100 Payables"]);
        assert_eq!(selected(&app), Some("4"));

        let fewer = ChartOfAccounts::from_records(
            "acme",
            vec![AccountRecord::new("4", None, "2000", "Liabilities", AccountType::Liability)],
        );
        app.replace_chart(fewer);
        assert_eq!(app.filtered.as_ref().map(Forest::len), Some(0));
        assert!(app.rows().is_empty());
        assert_eq!(selected(&app), None);
    }

    #[test]
    fn shifted_characters_are_typed_in_search() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Char('/')]);
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT)));
        assert_eq!(app.filter.query, "C");
        assert_eq!(app.rows().len(), 3);
    }

    #[test]
    fn type_filter_cycles_back_to_all() {
        let mut app = BrowseApp::new(chart());

        press(&mut app, &[KeyCode::Char('t')]);
        assert_eq!(app.filter.kind, Some(AccountType::Asset));
        assert_eq!(app.rows().len(), 3);

        press(&mut app, &[KeyCode::Char('t')]);
        assert_eq!(app.filter.kind, Some(AccountType::Liability));
        assert_eq!(labels(&app), vec!["▼ 2000 Liabilities", "  • 2100 Payables"]);
        assert_eq!(selected(&app), Some("4"));

        press(
            &mut app,
            &[KeyCode::Char('t'), KeyCode::Char('t'), KeyCode::Char('t')],
        );
        assert_eq!(app.filter.kind, Some(AccountType::Expense));
        assert!(app.rows().is_empty());

        press(&mut app, &[KeyCode::Char('t')]);
        assert_eq!(app.filter.kind, None);
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn quit_and_reload_actions() {
        let mut app = BrowseApp::new(chart());
        assert_eq!(press(&mut app, &[KeyCode::Char('r')]), Action::Reload);
        assert_eq!(press(&mut app, &[KeyCode::Char('q')]), Action::Quit);
        assert_eq!(press(&mut app, &[KeyCode::Esc]), Action::Quit);
    }

    #[test]
    fn reload_keeps_expansion() {
        let mut app = BrowseApp::new(chart());
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.rows().len(), 3);

        app.replace_chart(chart());
        assert_eq!(app.rows().len(), 3);
        assert_eq!(app.status.as_deref(), Some("reloaded 5 accounts"));
    }

    #[test]
    fn scroll_offset_follows_selection() {
        let mut app = BrowseApp::new(chart());
        app.ensure_visible_row(4, 2);
        assert_eq!(app.list_offset, 3);
        app.ensure_visible_row(0, 2);
        assert_eq!(app.list_offset, 0);
    }
}
