use super::input::{cursor_at, TextInput};
use super::KeyResult;
use crate::api::{Record, RecordId, Resource};
use crate::ui::renderfns::centered_rect;
use crate::ui::schema::{self, Schema};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// What a submitted form asks the parent to write
#[derive(Debug, Clone, PartialEq)]
pub enum FormPayload<R: Resource> {
  Create(R),
  Update(RecordId, R::Patch),
}

/// Events emitted by the form that the parent needs to handle
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent<R: Resource> {
  /// Valid input, ready to send
  Submit(FormPayload<R>),
  /// Dialog was closed without writing anything
  Closed,
}

/// Modal create/edit form.
///
/// Only the in-progress field values live here. The record being edited is
/// the one passed to [`FormDialog::open_edit`]; once the dialog closes nothing
/// survives until it is opened again.
pub struct FormDialog<R: Schema> {
  open: bool,
  selected: Option<Record<R>>,
  inputs: Vec<TextInput>,
  focus: usize,
  error: Option<String>,
}

impl<R: Schema> Default for FormDialog<R> {
  fn default() -> Self {
    Self {
      open: false,
      selected: None,
      inputs: Vec::new(),
      focus: 0,
      error: None,
    }
  }
}

impl<R: Schema> FormDialog<R> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  /// Record under edit, `None` when creating
  pub fn selected(&self) -> Option<&Record<R>> {
    self.selected.as_ref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Current field values in field order
  pub fn values(&self) -> Vec<String> {
    self.inputs.iter().map(|i| i.value().to_string()).collect()
  }

  pub fn open_create(&mut self) {
    self.open_with(None, vec![TextInput::new(); R::FIELDS.len()]);
  }

  pub fn open_edit(&mut self, record: Record<R>) {
    let inputs = schema::form_values(&record.fields)
      .into_iter()
      .map(TextInput::with_value)
      .collect();
    self.open_with(Some(record), inputs);
  }

  fn open_with(&mut self, selected: Option<Record<R>>, inputs: Vec<TextInput>) {
    self.open = true;
    self.selected = selected;
    self.inputs = inputs;
    self.focus = 0;
    self.error = None;
  }

  pub fn close(&mut self) {
    *self = Self::default();
  }

  /// Keep the dialog open and show why the write failed
  pub fn fail(&mut self, message: impl Into<String>) {
    self.error = Some(message.into());
  }

  fn focus_next(&mut self) {
    if !self.inputs.is_empty() {
      self.focus = (self.focus + 1) % self.inputs.len();
    }
  }

  fn focus_previous(&mut self) {
    if !self.inputs.is_empty() {
      self.focus = (self.focus + self.inputs.len() - 1) % self.inputs.len();
    }
  }

  fn submit(&mut self) -> KeyResult<FormEvent<R>> {
    let values = self.values();
    let payload = match &self.selected {
      None => schema::parse_form::<R>(&values).map(FormPayload::Create),
      Some(record) => {
        schema::patch_from_form::<R>(&record.fields, &values).map(|p| FormPayload::Update(record.id, p))
      }
    };

    match payload {
      Ok(FormPayload::Update(_, patch)) if is_empty_patch(&patch) => {
        self.close();
        KeyResult::Event(FormEvent::Closed)
      }
      Ok(payload) => {
        self.error = None;
        KeyResult::Event(FormEvent::Submit(payload))
      }
      Err(e) => {
        self.error = Some(e.to_string());
        KeyResult::Handled
      }
    }
  }

  /// Handle a key while open. Closed dialogs never consume keys.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent<R>> {
    if !self.open {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(FormEvent::Closed)
      }
      KeyCode::Enter => self.submit(),
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_previous();
        KeyResult::Handled
      }
      _ => {
        if let Some(input) = self.inputs.get_mut(self.focus) {
          input.handle_key(key);
        }
        KeyResult::Handled
      }
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect, saving: bool) {
    if !self.open {
      return;
    }

    let height = R::FIELDS.len() as u16 + 6;
    let dialog = centered_rect(60, height, area);
    frame.render_widget(Clear, dialog);

    let title = match &self.selected {
      Some(record) => format!(" Edit {} {} ", R::KIND.singular(), record.id),
      None => format!(" New {} ", R::KIND.singular()),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let label_width = R::FIELDS
      .iter()
      .map(|f| f.label.len())
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = R::FIELDS
      .iter()
      .zip(&self.inputs)
      .enumerate()
      .map(|(i, (field, input))| {
        let focused = i == self.focus;
        let marker = if field.required { "*" } else { " " };
        let label_style = if focused {
          Style::default().fg(Color::Cyan).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![
          Span::styled(
            format!("{:>width$}{} ", field.label, marker, width = label_width),
            label_style,
          ),
          Span::raw(input.value().to_string()),
        ];
        Line::from(spans)
      })
      .collect();

    lines.push(Line::raw(""));
    if saving {
      lines.push(Line::styled("Saving...", Style::default().fg(Color::Yellow)));
    } else if let Some(error) = &self.error {
      lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }
    lines.push(Line::styled(
      "Tab next  Shift-Tab previous  Enter save  Esc cancel",
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    let row = u16::try_from(self.focus).unwrap_or(u16::MAX);
    if let Some(input) = self.inputs.get(self.focus).filter(|_| row < inner.height) {
      let line = Rect::new(inner.x, inner.y + row, inner.width, 1);
      frame.set_cursor_position(cursor_at(line, label_width + 2 + input.cursor_position()));
    }
  }
}

fn is_empty_patch<P: serde::Serialize>(patch: &P) -> bool {
  matches!(serde_json::to_value(patch), Ok(serde_json::Value::Object(map)) if map.is_empty())
}
