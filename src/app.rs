use crate::api::{ApiClient, Hooks, PageRequest, ResourceKind};
use crate::cache::QueryCache;
use crate::commands::CommandAction;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::notify::{Notification, Notifier, Toast};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views;
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root list view is always at index 0
  views: Vec<Box<dyn View>>,

  command: CommandInput,

  /// Latest mutation outcome, shown in the footer
  toast: Toast,
  notifications: mpsc::UnboundedReceiver<Notification>,

  hooks: Hooks,
  config: Config,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = ApiClient::new(&config.api)?;
    let (notifier, notifications) = Notifier::channel();
    let hooks = Hooks::new(client, QueryCache::new(), notifier);
    Self::with_hooks(config, hooks, notifications)
  }

  fn with_hooks(
    config: Config,
    hooks: Hooks,
    notifications: mpsc::UnboundedReceiver<Notification>,
  ) -> Result<Self> {
    let mut app = Self {
      views: Vec::new(),
      command: CommandInput::new(),
      toast: Toast::default(),
      notifications,
      hooks,
      config,
      should_quit: false,
    };
    app.open_root(app.config.start_resource())?;
    Ok(app)
  }

  pub async fn run(&mut self) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = self.event_loop(&mut terminal).await;
    // Restore even when the loop failed
    restore_terminal()?;
    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE, self.hooks.cache().changes());

    while !self.should_quit() {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  /// Replace the whole stack with the list view of `kind`
  fn open_root(&mut self, kind: ResourceKind) -> Result<()> {
    let request = PageRequest::first(self.config.page_size, self.config.sort_field.as_str())
      .ok_or_else(|| eyre!("page_size must be greater than zero"))?;
    tracing::info!(resource = %kind, "opening list");
    self.views.clear();
    self
      .views
      .push(views::resource_list(kind, self.hooks.clone(), request));
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      // Redraw happens on every loop iteration
      Event::CacheChanged | Event::Resize => {}
    }
  }

  fn tick(&mut self) {
    while let Ok(notification) = self.notifications.try_recv() {
      self.toast.show(notification);
    }

    // Every view settles its writes; only the visible one may navigate
    let top = self.views.len().saturating_sub(1);
    let mut action = ViewAction::None;
    for (i, view) in self.views.iter_mut().enumerate() {
      let result = view.tick();
      if i == top {
        action = result;
      }
    }
    self.apply(action);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_owns_keys = self.current_view().is_some_and(|v| v.captures_input());
    if !view_owns_keys {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(action)) => {
          self.run_command(action);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(name)) => {
          self
            .toast
            .show(Notification::error(format!("Unknown command: {}", name)));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.views.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Quit,
    };
    self.apply(action);
  }

  fn run_command(&mut self, action: CommandAction) {
    match action {
      CommandAction::Open(kind) => {
        if let Err(e) = self.open_root(kind) {
          self.toast.show(Notification::error(e.to_string()));
        }
      }
      CommandAction::Quit => self.should_quit = true,
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.views.push(view),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Quit => self.should_quit = true,
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.views.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.views.last_mut().map(|v| v.as_mut())
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn title(&self) -> &str {
    self.config.title.as_deref().unwrap_or("bizdesk")
  }

  pub fn api_url(&self) -> &str {
    &self.config.api.base_url
  }

  pub fn notification(&self) -> Option<&Notification> {
    self.toast.current()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
  enable_raw_mode()?;
  stdout().execute(EnterAlternateScreen)?;
  Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() -> Result<()> {
  disable_raw_mode()?;
  stdout().execute(LeaveAlternateScreen)?;
  Ok(())
}
