use crate::api::{Hooks, Record, RecordId};
use crate::mutation::Mutation;
use crate::query::{Query, QueryState};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, FormDialog, FormEvent, FormPayload, KeyResult,
};
use crate::ui::renderfns::status_color;
use crate::ui::schema::{self, Schema};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for displaying a single record
pub struct RecordDetailView<R: Schema> {
  hooks: Hooks,
  id: RecordId,
  query: Query<Record<R>>,
  form: FormDialog<R>,
  confirm: ConfirmDialog,
  save: Mutation<Record<R>>,
  remove: Mutation<()>,
}

impl<R: Schema> RecordDetailView<R> {
  pub fn new(hooks: Hooks, id: RecordId) -> Self {
    let mut query = hooks.use_record::<R>(id);
    query.fetch();

    Self {
      hooks,
      id,
      query,
      form: FormDialog::new(),
      confirm: ConfirmDialog::new(),
      save: Mutation::new(),
      remove: Mutation::new(),
    }
  }

  fn is_gone(&self) -> bool {
    self
      .query
      .state()
      .error()
      .is_some_and(|e| e.is_not_found())
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let name = format!("{} {}", R::KIND.singular(), self.id);
    let title = match self.query.state() {
      QueryState::Loading | QueryState::Idle => format!(" {} (loading...) ", name),
      QueryState::Error(_) if self.is_gone() => format!(" {} (deleted) ", name),
      QueryState::Error(e) => format!(" {} (error: {}) ", name, e),
      QueryState::Success(record) => format!(" {} ", record.fields.title()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading record...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if self.is_gone() {
      let paragraph = Paragraph::new(format!(
        "This {} no longer exists.\n\nPress 'q' to go back.",
        R::KIND.singular()
      ))
      .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(record) = self.query.data() else {
      return;
    };

    let rows = schema::detail_rows(&record.fields);
    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0).max(7);
    let label = |text: &str| {
      Span::styled(
        format!("{:>width$}: ", text, width = label_width),
        Style::default().fg(Color::DarkGray),
      )
    };

    let mut lines = vec![Line::from(vec![
      label("ID"),
      Span::styled(record.id.to_string(), Style::default().fg(Color::Cyan)),
    ])];
    lines.extend(rows.into_iter().map(|(name, value)| {
      let style = if name.contains("Status") {
        Style::default().fg(status_color(&value))
      } else {
        Style::default()
      };
      Line::from(vec![label(name), Span::styled(value, style)])
    }));

    lines.push(Line::raw(""));
    let stamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
      t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
    };
    lines.push(Line::from(vec![
      label("Created"),
      Span::raw(stamp(record.created_at)),
    ]));
    lines.push(Line::from(vec![
      label("Updated"),
      Span::raw(stamp(record.updated_at)),
    ]));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
  }
}

impl<R: Schema> View for RecordDetailView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit(FormPayload::Update(id, patch))) => {
        let hooks = self.hooks.clone();
        self.save.mutate(async move { hooks.update::<R>(id, patch).await });
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Submit(FormPayload::Create(_))) => return ViewAction::None,
      KeyResult::Event(FormEvent::Closed) => {
        self.save.reset();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        let hooks = self.hooks.clone();
        let id = self.id;
        self.remove.mutate(async move { hooks.delete::<R>(id).await });
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('e') => {
        if let Some(record) = self.query.data() {
          self.save.reset();
          self.form.open_edit((*record).clone());
        }
      }
      KeyCode::Char('d') => {
        if !self.is_gone() {
          self.confirm.ask(format!(
            "Delete {} {}?",
            R::KIND.singular(),
            self.id
          ));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.confirm.render_overlay(frame, area);
    self.form.render_overlay(frame, area, self.save.is_pending());
  }

  fn breadcrumb_label(&self) -> String {
    format!("{} {}", R::KIND.singular(), self.id)
  }

  fn captures_input(&self) -> bool {
    self.form.is_open() || self.confirm.is_open()
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

    if self.remove.poll() {
      let deleted = self.remove.take_success().is_some();
      self.remove.reset();
      if deleted {
        return ViewAction::Pop;
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit").with_priority(30),
      ShortcutInfo::new("d", "delete").with_priority(31),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::resources::{ContactInfo, Lead};
  use crate::api::test_server::TestServer;
  use crate::cache::QueryCache;
  use crate::notify::Notifier;
  use crossterm::event::KeyModifiers;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn acme() -> Lead {
    Lead {
      lead_name: "Acme".to_string(),
      lead_source: "Web".to_string(),
      contact_info: ContactInfo::default(),
      lead_status: "New".to_string(),
      lead_owner: "Jane".to_string(),
      territory: "West".to_string(),
      lead_rating: 3,
    }
  }

  async fn settle(view: &mut RecordDetailView<Lead>) -> ViewAction {
    for _ in 0..200 {
      let action = view.tick();
      if !matches!(action, ViewAction::None) {
        return action;
      }
      if !view.query.is_fetching() && !view.save.is_pending() && !view.remove.is_pending() {
        return ViewAction::None;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("view never settled");
  }

  #[tokio::test]
  async fn test_edit_refreshes_detail() {
    let server = TestServer::start().await;
    let (notifier, _rx) = Notifier::channel();
    let hooks = Hooks::new(server.api(), QueryCache::new(), notifier);
    let created = hooks.create(acme()).await.unwrap();

    let mut view = RecordDetailView::<Lead>::new(hooks, created.id);
    settle(&mut view).await;
    assert_eq!(view.query.data().unwrap().fields.lead_status, "New");

    view.handle_key(key(KeyCode::Char('e')));
    // Status is the fifth field
    for _ in 0..4 {
      view.handle_key(key(KeyCode::Tab));
    }
    for _ in 0.."New".len() {
      view.handle_key(key(KeyCode::Backspace));
    }
    for c in "Qualified".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    settle(&mut view).await;

    assert!(!view.form.is_open());
    let record = view.query.data().unwrap();
    assert_eq!(record.fields.lead_status, "Qualified");
    assert_eq!(record.fields.lead_name, "Acme");
  }

  #[tokio::test]
  async fn test_delete_pops_view() {
    let server = TestServer::start().await;
    let (notifier, _rx) = Notifier::channel();
    let hooks = Hooks::new(server.api(), QueryCache::new(), notifier);
    let created = hooks.create(acme()).await.unwrap();

    let mut view = RecordDetailView::<Lead>::new(hooks, created.id);
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Char('y')));
    assert!(matches!(settle(&mut view).await, ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_missing_record_shows_as_gone() {
    let server = TestServer::start().await;
    let (notifier, _rx) = Notifier::channel();
    let hooks = Hooks::new(server.api(), QueryCache::new(), notifier);

    let mut view = RecordDetailView::<Lead>::new(hooks, 999);
    settle(&mut view).await;
    assert!(view.is_gone());

    // Nothing to delete
    view.handle_key(key(KeyCode::Char('d')));
    assert!(!view.confirm.is_open());
  }
}
