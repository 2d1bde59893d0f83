use crate::annotator::{Selection, VolumeAnnotator};
use crate::config::Settings;
use crate::geometry::MeasureContext;
use crate::model::{Fragment, IfcModel, ModelEntry, ModelRegistry, PropertySetView};
use crate::panel::{DirectoryDownloads, ExportOutcome, ExportPanel, ImportOutcome};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{DefaultTerminal, Frame};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusPanel {
    Models,
    Fragments,
    Elements,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    /// Typing the path of a file to round-trip through the export panel.
    Import,
    /// Typing the path of a file to load into the registry.
    Open,
}

/// One row of the elements table.
#[derive(Debug, Clone)]
pub struct ElementRow {
    pub id: u64,
    pub name: String,
    pub entity_type: String,
    pub storey: String,
    pub volume: Option<f64>,
}

pub struct App {
    pub registry: ModelRegistry,
    pub annotator: VolumeAnnotator,
    pub panel: ExportPanel,
    pub downloads: DirectoryDownloads,
    pub context: MeasureContext,
    /// Live view of the registry, refreshed when its revision changes.
    pub models: Vec<ModelEntry>,
    pub focus_panel: FocusPanel,
    pub input_mode: InputMode,
    pub input: String,
    pub selected_model: usize,
    pub selected_fragment: usize,
    pub selected_element: usize,
    pub status: String,
    pub should_quit: bool,
    seen_revision: Option<u64>,
}

impl App {
    #[must_use]
    pub fn new(registry: ModelRegistry, settings: &Settings) -> Self {
        let mut app = Self {
            registry,
            annotator: VolumeAnnotator::new(settings.annotator.clone()),
            panel: ExportPanel::new(),
            downloads: DirectoryDownloads::new(&settings.output_dir),
            context: settings.measure.clone(),
            models: Vec::new(),
            focus_panel: FocusPanel::Models,
            input_mode: InputMode::Normal,
            input: String::new(),
            selected_model: 0,
            selected_fragment: 0,
            selected_element: 0,
            status: "Enter selects the export model, v computes volumes".to_string(),
            should_quit: false,
            seen_revision: None,
        };
        app.refresh_models();
        app
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            self.refresh_models();
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        super::dashboard::draw_dashboard(frame, self);
    }

    /// Re-reads the model list after the registry changed.
    pub fn refresh_models(&mut self) {
        let revision = self.registry.revision();
        if self.seen_revision == Some(revision) {
            return;
        }
        self.seen_revision = Some(revision);
        self.models = self.panel.list_models(&self.registry);

        if self.selected_model >= self.models.len() {
            self.selected_model = self.models.len().saturating_sub(1);
            self.selected_fragment = 0;
            self.selected_element = 0;
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(());
            }

            match self.input_mode {
                InputMode::Normal => self.handle_dashboard_keys(key.code),
                InputMode::Import | InputMode::Open => self.handle_input_keys(key.code),
            }
        }
        Ok(())
    }

    pub fn handle_dashboard_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Left | KeyCode::Char('h') => self.navigate_left(),
            KeyCode::Right | KeyCode::Char('l') => self.navigate_right(),
            KeyCode::Enter => self.select_for_export(),
            KeyCode::Char('v') => self.compute_volumes(false),
            KeyCode::Char('V') => self.compute_volumes(true),
            KeyCode::Char('e') => self.export_selected(),
            KeyCode::Char('x') => self.close_model(),
            KeyCode::Char('i') => self.start_input(InputMode::Import),
            KeyCode::Char('o') => self.start_input(InputMode::Open),
            _ => {}
        }
    }

    fn handle_input_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input.clear();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Enter => {
                let path = std::mem::take(&mut self.input);
                let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
                let path = path.trim();
                if path.is_empty() {
                    return;
                }
                match mode {
                    InputMode::Import => self.import_file(Path::new(path)),
                    InputMode::Open => self.open_file(Path::new(path)),
                    InputMode::Normal => {}
                }
            }
            _ => {}
        }
    }

    fn start_input(&mut self, mode: InputMode) {
        self.input_mode = mode;
        self.input.clear();
    }

    fn navigate_up(&mut self) {
        match self.focus_panel {
            FocusPanel::Models => {
                if self.selected_model > 0 {
                    self.selected_model -= 1;
                    self.selected_fragment = 0;
                    self.selected_element = 0;
                }
            }
            FocusPanel::Fragments => {
                if self.selected_fragment > 0 {
                    self.selected_fragment -= 1;
                    self.selected_element = 0;
                }
            }
            FocusPanel::Elements => {
                self.selected_element = self.selected_element.saturating_sub(1);
            }
        }
    }

    fn navigate_down(&mut self) {
        match self.focus_panel {
            FocusPanel::Models => {
                if self.selected_model + 1 < self.models.len() {
                    self.selected_model += 1;
                    self.selected_fragment = 0;
                    self.selected_element = 0;
                }
            }
            FocusPanel::Fragments => {
                let count = self.current_model().map_or(0, |m| m.fragments.len());
                if self.selected_fragment + 1 < count {
                    self.selected_fragment += 1;
                    self.selected_element = 0;
                }
            }
            FocusPanel::Elements => {
                let count = self.current_fragment().map_or(0, |f| f.element_ids.len());
                if self.selected_element + 1 < count {
                    self.selected_element += 1;
                }
            }
        }
    }

    fn navigate_left(&mut self) {
        match self.focus_panel {
            FocusPanel::Elements => self.focus_panel = FocusPanel::Fragments,
            FocusPanel::Fragments => self.focus_panel = FocusPanel::Models,
            FocusPanel::Models => {}
        }
    }

    fn navigate_right(&mut self) {
        match self.focus_panel {
            FocusPanel::Models => self.focus_panel = FocusPanel::Fragments,
            FocusPanel::Fragments => self.focus_panel = FocusPanel::Elements,
            FocusPanel::Elements => {}
        }
    }

    #[must_use]
    pub fn current_model(&self) -> Option<&IfcModel> {
        let entry = self.models.get(self.selected_model)?;
        self.registry.get(&entry.id)
    }

    #[must_use]
    pub fn current_fragment(&self) -> Option<&Fragment> {
        self.current_model()?.fragments.get(self.selected_fragment)
    }

    #[must_use]
    pub fn current_element_id(&self) -> Option<u64> {
        self.current_fragment()?
            .element_ids
            .get(self.selected_element)
            .copied()
    }

    #[must_use]
    pub fn element_rows(&self) -> Vec<ElementRow> {
        let (Some(model), Some(fragment)) = (self.current_model(), self.current_fragment()) else {
            return Vec::new();
        };
        let settings = self.annotator.settings();

        fragment
            .element_ids
            .iter()
            .filter_map(|id| model.elements.get(id))
            .map(|e| ElementRow {
                id: e.id,
                name: e.name.clone(),
                entity_type: e.entity_type.clone(),
                storey: e.storey.clone().unwrap_or_else(|| "-".to_string()),
                volume: model.numeric_property(e.id, &settings.pset_name, &settings.property_name),
            })
            .collect()
    }

    #[must_use]
    pub fn current_property_sets(&self) -> Vec<PropertySetView> {
        match (self.current_model(), self.current_element_id()) {
            (Some(model), Some(id)) => model.property_sets(id),
            _ => Vec::new(),
        }
    }

    /// Selection for `v`: the focused element, or the whole focused fragment.
    #[must_use]
    pub fn current_selection(&self) -> Selection {
        let mut selection = BTreeMap::new();
        let Some(fragment) = self.current_fragment() else {
            return selection;
        };

        if self.focus_panel == FocusPanel::Elements {
            if let Some(id) = self.current_element_id() {
                selection.insert(fragment.model_id.clone(), BTreeSet::from([id]));
            }
        } else {
            selection.insert(
                fragment.id.clone(),
                fragment.element_ids.iter().copied().collect(),
            );
        }
        selection
    }

    pub fn compute_volumes(&mut self, force: bool) {
        let selection = self.current_selection();
        if selection.is_empty() {
            self.status = "Nothing to measure".to_string();
            return;
        }

        match self
            .annotator
            .compute_batch(&mut self.registry, &self.context, &selection, force)
        {
            Ok(report) => {
                self.status = format!(
                    "Annotated {} element(s), {:.3} m³; {} already done",
                    report.attachments(),
                    report.total_volume(),
                    report.skipped
                );
                if let Some(first) = report.failed.first() {
                    let _ = write!(
                        self.status,
                        "; {} not measured ({})",
                        report.failed.len(),
                        first.reason
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "volume annotation failed");
                self.status = format!("Volume annotation stopped: {e}");
            }
        }
    }

    pub fn select_for_export(&mut self) {
        let Some(entry) = self.models.get(self.selected_model) else {
            return;
        };
        if self.panel.select(&self.registry, &entry.id) {
            self.status = format!("Export model: {}", entry.name);
        }
    }

    pub fn export_selected(&mut self) {
        let outcome = self.panel.export_selected(&self.registry, &mut self.downloads);
        self.status = match outcome {
            ExportOutcome::NoSelection => "Select a model with Enter first".to_string(),
            _ => self.panel.status().unwrap_or_default().to_string(),
        };
    }

    pub fn import_file(&mut self, path: &Path) {
        let outcome = self.panel.import_file(path, &mut self.downloads);
        self.status = match outcome {
            ImportOutcome::Downloaded(saved) => format!("Processed file saved to {}", saved.display()),
            ImportOutcome::Failed(message) => format!("Import failed: {message}"),
        };
    }

    pub fn open_file(&mut self, path: &Path) {
        match self.registry.load_file(path) {
            Ok(_) => {
                self.status = format!("Opened {}", path.display());
                self.refresh_models();
                self.selected_model = self.models.len().saturating_sub(1);
                self.selected_fragment = 0;
                self.selected_element = 0;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to open model");
                self.status = format!("Open failed: {e}");
            }
        }
    }

    /// Unloads the highlighted model and forgets what was computed for it.
    pub fn close_model(&mut self) {
        let Some(entry) = self.models.get(self.selected_model).cloned() else {
            return;
        };
        self.registry.remove(&entry.id);
        self.annotator.processed_mut().forget_model(&entry.id);
        if self.panel.selected() == Some(entry.id.as_str()) {
            self.panel.clear_selection();
        }
        self.status = format!("Closed {}", entry.name);
        self.refresh_models();
    }

    #[must_use]
    pub fn is_export_selection(&self, id: &str) -> bool {
        self.panel.selected() == Some(id)
    }
}
