use chrono::Local;
use crate::api::{Hooks, Page, PageRequest, Record, RecordId};
use crate::mutation::Mutation;
use crate::query::{Query, QueryState};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, FormDialog, FormEvent, FormPayload, KeyResult, SearchEvent,
  SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::schema::{self, Schema};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::RecordDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

/// One page of a resource collection with create/edit/delete dialogs
pub struct ResourceListView<R: Schema> {
  hooks: Hooks,
  request: PageRequest,
  query: Query<Page<Record<R>>>,

  // UI state
  table_state: TableState,
  filter: String,

  // Components
  search: SearchInput,
  form: FormDialog<R>,
  confirm: ConfirmDialog,
  pending_delete: Option<RecordId>,

  // Writes
  save: Mutation<Record<R>>,
  remove: Mutation<()>,
}

impl<R: Schema> ResourceListView<R> {
  pub fn new(hooks: Hooks, request: PageRequest) -> Self {
    let mut query = hooks.use_list::<R>(request.clone());
    query.fetch();

    Self {
      hooks,
      request,
      query,
      table_state: TableState::default(),
      filter: String::new(),
      search: SearchInput::new(),
      form: FormDialog::new(),
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      save: Mutation::new(),
      remove: Mutation::new(),
    }
  }

  #[cfg(test)]
  pub fn request(&self) -> &PageRequest {
    &self.request
  }

  /// Switch to another page or ordering. Dropping the old handle evicts the
  /// old page from the cache; coming back refetches it.
  fn load(&mut self, request: PageRequest) {
    if request == self.request {
      return;
    }
    tracing::debug!(resource = %R::KIND, page = request.page_number, "changing page");
    self.request = request;
    self.query = self.hooks.use_list::<R>(self.request.clone());
    self.query.fetch();
    self.table_state.select(Some(0));
  }

  /// Records on the current page that match the filter
  fn visible(&self) -> Vec<Record<R>> {
    let Some(page) = self.query.data() else {
      return Vec::new();
    };
    let needle = self.filter.to_lowercase();
    page
      .content
      .iter()
      .filter(|record| {
        needle.is_empty()
          || schema::cells(*record)
            .iter()
            .any(|cell| cell.to_lowercase().contains(&needle))
      })
      .cloned()
      .collect()
  }

  fn selected_record(&self) -> Option<Record<R>> {
    let idx = self.table_state.selected().unwrap_or(0);
    self.visible().into_iter().nth(idx)
  }

  fn submit(&mut self, payload: FormPayload<R>) {
    let hooks = self.hooks.clone();
    match payload {
      FormPayload::Create(fields) => {
        self.save.mutate(async move { hooks.create(fields).await });
      }
      FormPayload::Update(id, patch) => {
        self.save.mutate(async move { hooks.update::<R>(id, patch).await });
      }
    }
  }

  fn delete(&mut self, id: RecordId) {
    let hooks = self.hooks.clone();
    self.remove.mutate(async move { hooks.delete::<R>(id).await });
  }

  fn page_label(&self) -> String {
    let label = match self.query.data() {
      Some(page) if page.total_pages > 0 => format!(
        "page {}/{} · {} total",
        page.number.saturating_add(1),
        page.total_pages,
        page.total_elements
      ),
      Some(_) => "empty".to_string(),
      None => format!("page {}", self.request.page_number.saturating_add(1)),
    };
    match self.query.fetched_at() {
      Some(at) => format!("{} · {}", label, at.with_timezone(&Local).format("%H:%M:%S")),
      None => label,
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let records = self.visible();
    ensure_valid_selection(&mut self.table_state, records.len());

    let label = R::KIND.label();
    let sort = format!("{} {}", self.request.sort_field, self.request.direction.as_str());
    let refreshing = if self.query.is_fetching() { " ↻" } else { "" };
    let title = match self.query.state() {
      QueryState::Loading | QueryState::Idle => format!(" {} (loading...) ", label),
      QueryState::Error(e) => format!(" {} (error: {}) ", label, e),
      QueryState::Success(_) if !self.filter.is_empty() => format!(
        " {} [{}] /{} ({} shown){} ",
        label,
        sort,
        self.filter,
        records.len(),
        refreshing
      ),
      QueryState::Success(_) => format!(" {} [{}] ({}){} ", label, sort, self.page_label(), refreshing),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if records.is_empty() {
      let content = if self.query.is_loading() {
        "Loading..."
      } else if self.query.is_error() {
        "Failed to load. Press 'r' to retry."
      } else if !self.filter.is_empty() {
        "Nothing on this page matches the filter."
      } else {
        "No records. Press 'c' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let status_column = R::COLUMNS.iter().position(|c| c.header == "Status");

    let header = Row::new(
      std::iter::once("ID").chain(R::COLUMNS.iter().map(|c| c.header)),
    )
    .style(Style::default().fg(Color::DarkGray).bold());

    let rows: Vec<Row> = records
      .iter()
      .map(|record| {
        let cells = schema::cells(record)
          .into_iter()
          .enumerate()
          .map(|(i, cell)| {
            let style = match i {
              0 => Style::default().fg(Color::Cyan),
              i if Some(i - 1) == status_column => Style::default().fg(status_color(&cell)),
              _ => Style::default(),
            };
            let width = if i == 0 { 6 } else { R::COLUMNS[i - 1].width as usize };
            Text::styled(truncate(&cell, width), style)
          });
        Row::new(cells)
      })
      .collect();

    let widths = std::iter::once(Constraint::Length(6))
      .chain(R::COLUMNS.iter().map(|c| Constraint::Length(c.width)));

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl<R: Schema> View for ResourceListView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Dialogs own the keyboard while open
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit(payload)) => {
        self.submit(payload);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Closed) => {
        self.save.reset();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        // The page may have been refreshed while the prompt was open
        let on_page = |id: RecordId| self.query.data().is_some_and(|page| page.contains(id));
        if let Some(id) = self.pending_delete.take().filter(|id| on_page(*id)) {
          self.delete(id);
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        self.filter = filter;
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.table_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.table_state.select_previous();
      }
      KeyCode::Char('n') | KeyCode::Right => {
        if self.query.data().is_some_and(|page| page.has_next()) {
          self.load(self.request.next());
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        self.load(self.request.previous());
      }
      KeyCode::Char('s') => {
        self.load(self.request.toggled());
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('c') => {
        self.save.reset();
        self.form.open_create();
      }
      KeyCode::Char('e') => {
        if let Some(record) = self.selected_record() {
          self.save.reset();
          self.form.open_edit(record);
        }
      }
      KeyCode::Char('d') => {
        if let Some(record) = self.selected_record() {
          self.confirm.ask(format!(
            "Delete {} {} '{}'?",
            R::KIND.singular(),
            record.id,
            record.fields.title()
          ));
          self.pending_delete = Some(record.id);
        }
      }
      KeyCode::Enter | KeyCode::Char('v') => {
        if let Some(record) = self.selected_record() {
          return ViewAction::Push(Box::new(RecordDetailView::<R>::new(
            self.hooks.clone(),
            record.id,
          )));
        }
      }
      KeyCode::Esc if !self.filter.is_empty() => {
        self.filter.clear();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
    self.form.render_overlay(frame, area, self.save.is_pending());
  }

  fn breadcrumb_label(&self) -> String {
    R::KIND.label().to_string()
  }

  fn context(&self) -> Option<String> {
    Some(self.page_label())
  }

  fn captures_input(&self) -> bool {
    self.form.is_open() || self.confirm.is_open() || self.search.is_active()
  }

  fn tick(&mut self) -> ViewAction {
    if self.save.poll() {
      if self.save.take_success().is_some() {
        self.form.close();
      } else if let Some(error) = self.save.error() {
        let error = error.to_string();
        self.form.fail(error);
      }
    }

    // Failures were already reported through the notifier
    if self.remove.poll() {
      self.remove.reset();
    }

    // A delete can leave us past the last page
    let past_end = self
      .query
      .data()
      .is_some_and(|page| page.is_empty() && page.number > 0 && page.number >= page.total_pages);
    if past_end {
      self.load(self.request.previous());
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("c", "create").with_priority(30),
      ShortcutInfo::new("e", "edit").with_priority(31),
      ShortcutInfo::new("d", "delete").with_priority(32),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("s", "sort").with_priority(41),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ]
  }
}
