//! Session: the single command handler
//!
//! Every gesture and structural command arrives as a [`Command`] and goes
//! through [`Session::dispatch`]. A committed mutation re-flattens the
//! forest into the layout and schedules a debounced save.
//!
//! ```text
//! Command ─► dispatch ─► Edit/Reparent ─► GraphStore::replace_forest
//!                                  │
//!                                  ├─► UndoLog::push
//!                                  ├─► LayoutEngine::sync
//!                                  └─► SaveScheduler::schedule ─► (poll) ─► ForestStore::save
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::save::{PersistenceStatus, SaveScheduler};
use crate::application::services::{EditService, GraphStore, ReparentService, UndoLog};
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{ColorAssigner, Forest, Link, Node, SearchEntry};
use crate::infrastructure::traits::ForestStore;
use crate::layout::{DropResolution, LayoutEngine, SimulationState};

/// Input to [`Session::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// New root; without a name one is drawn from the "Station N" sequence
    Add { name: Option<String> },
    Remove { id: String },
    Rename { id: String, name: String },
    Recolor { id: String, color: String },
    SetNotes { id: String, notes: String },
    ToggleChildren { id: String },
    Detach { id: String },
    Connect { source: String, target: String },
    Undo,
    Select { id: Option<String> },
    DragStart { id: String },
    DragMove { id: String, x: f64, y: f64 },
    DragEnd { id: String, x: f64, y: f64 },
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The forest was replaced
    Changed,
    /// Forest untouched (view-only commands, drops that stay put)
    Unchanged,
    Created { id: String },
    /// Drop on the removal zone; dispatch `Remove` once the user confirms
    ConfirmRemoval { id: String },
}

/// A visible station as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: String,
    pub name: String,
    pub color: String,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub children_hidden: bool,
    pub child_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub links: Vec<Link>,
    pub selected: Option<String>,
    pub status: PersistenceStatus,
    pub state: SimulationState,
}

pub struct Session {
    store: GraphStore,
    undo: UndoLog,
    colors: ColorAssigner,
    layout: LayoutEngine,
    saves: SaveScheduler,
    persistence: Arc<dyn ForestStore>,
    status: PersistenceStatus,
    selected: Option<String>,
    /// Counter behind generated "Station N" names; restarts with each session
    label_seq: usize,
}

impl Session {
    /// Load the forest once and prepare layout and palette state.
    ///
    /// An absent or empty document starts a fresh forest holding only `main`,
    /// which is scheduled for saving at `now`.
    pub fn open(
        persistence: Arc<dyn ForestStore>,
        settings: &Settings,
        now: Instant,
    ) -> ApplicationResult<Self> {
        let colors = ColorAssigner::new(settings.palette.clone());
        let layout = LayoutEngine::new(settings.layout.clone());
        Self::assemble(persistence, settings, colors, layout, now)
    }

    /// Like [`Session::open`] with deterministic colors and seeding.
    pub fn open_seeded(
        persistence: Arc<dyn ForestStore>,
        settings: &Settings,
        now: Instant,
        seed: u64,
    ) -> ApplicationResult<Self> {
        let colors = ColorAssigner::seeded(settings.palette.clone(), seed);
        let layout = LayoutEngine::seeded(settings.layout.clone(), seed);
        Self::assemble(persistence, settings, colors, layout, now)
    }

    #[instrument(level = "debug", skip_all)]
    fn assemble(
        persistence: Arc<dyn ForestStore>,
        settings: &Settings,
        mut colors: ColorAssigner,
        mut layout: LayoutEngine,
        now: Instant,
    ) -> ApplicationResult<Self> {
        let loaded = persistence
            .load()
            .with_persistence_context("load forest")?
            .filter(|f| !f.is_empty());
        let fresh = loaded.is_none();
        let forest = loaded.unwrap_or_else(Forest::with_main_root);
        forest.validate()?;

        colors.observe(&forest);
        layout.restore_positions(&forest);

        let mut session = Self {
            store: GraphStore::new(forest),
            undo: UndoLog::new(settings.undo_capacity),
            colors,
            layout,
            saves: SaveScheduler::new(settings.save_debounce()),
            persistence,
            status: PersistenceStatus::Idle,
            selected: None,
            label_seq: 0,
        };
        session.resync_layout();
        if fresh {
            session.schedule_save(now);
        }
        info!(nodes = session.store.len(), fresh, "session opened");
        Ok(session)
    }

    #[instrument(level = "debug", skip(self, now))]
    pub fn dispatch(&mut self, command: Command, now: Instant) -> ApplicationResult<Outcome> {
        let outcome = match command {
            Command::Add { name } => {
                let name = match name {
                    Some(name) => name,
                    None => {
                        self.label_seq += 1;
                        format!("Station {}", self.label_seq)
                    }
                };
                let id = self.edit().add_root(&name)?;
                Outcome::Created { id }
            }
            Command::Remove { id } => {
                self.edit().remove(&id)?;
                Outcome::Changed
            }
            Command::Rename { id, name } => {
                self.edit().rename(&id, &name)?;
                Outcome::Changed
            }
            Command::Recolor { id, color } => {
                self.edit().recolor(&id, &color)?;
                Outcome::Changed
            }
            Command::SetNotes { id, notes } => {
                self.edit().set_notes(&id, &notes)?;
                Outcome::Changed
            }
            Command::ToggleChildren { id } => {
                self.edit().toggle_children(&id)?;
                Outcome::Changed
            }
            Command::Detach { id } => {
                self.reparent().detach(&id)?;
                Outcome::Changed
            }
            Command::Connect { source, target } => {
                self.reparent().connect(&source, &target)?;
                Outcome::Changed
            }
            Command::Undo => {
                let entry = self.undo.pop()?;
                debug!(operation = %entry.operation, "undoing");
                self.store.replace_forest(entry.before);
                Outcome::Changed
            }
            Command::Select { id } => {
                if let Some(id) = &id {
                    self.store.require(id)?;
                }
                self.selected = id;
                return Ok(Outcome::Unchanged);
            }
            Command::DragStart { id } => {
                self.layout.drag_start(&id)?;
                return Ok(Outcome::Unchanged);
            }
            Command::DragMove { id, x, y } => {
                self.layout.drag_move(&id, x, y)?;
                return Ok(Outcome::Unchanged);
            }
            Command::DragEnd { id, x, y } => match self.layout.drag_end(&id, x, y)? {
                DropResolution::Connect { source, target } => {
                    if let Err(e) = self.reparent().connect(&source, &target) {
                        warn!(%source, %target, error = %e, "drop rejected");
                        return Err(e);
                    }
                    Outcome::Changed
                }
                DropResolution::RequestRemoval { id } => {
                    return Ok(Outcome::ConfirmRemoval { id });
                }
                DropResolution::Stay => {
                    // Only the position moved; persist it with the next write
                    self.schedule_save(now);
                    return Ok(Outcome::Unchanged);
                }
            },
        };

        self.after_mutation(now);
        Ok(outcome)
    }

    fn edit(&mut self) -> EditService<'_> {
        EditService::new(&mut self.store, &mut self.colors, &mut self.undo)
    }

    fn reparent(&mut self) -> ReparentService<'_> {
        ReparentService::new(&mut self.store, &mut self.colors, &mut self.undo)
    }

    fn after_mutation(&mut self, now: Instant) {
        if let Some(id) = &self.selected {
            if !self.store.contains(id) {
                self.selected = None;
            }
        }
        self.resync_layout();
        self.schedule_save(now);
    }

    fn resync_layout(&mut self) {
        let nodes = self.store.flatten(true);
        let links = self.store.links();
        self.layout.sync(&nodes, &links);
    }

    fn schedule_save(&mut self, now: Instant) {
        self.saves.schedule(self.store.forest().clone(), now);
        self.status = PersistenceStatus::Pending;
    }

    /// Schedule a save of the current forest and positions without mutating.
    pub fn checkpoint(&mut self, now: Instant) {
        self.schedule_save(now);
    }

    /// Advance the layout by one step and write a due save.
    pub fn tick(&mut self, now: Instant) -> SimulationState {
        let state = self.layout.tick();
        self.poll(now);
        state
    }

    /// Tick the layout until it settles or `max_ticks` pass.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        self.layout.settle(max_ticks)
    }

    /// Write the pending snapshot if its quiet window has elapsed.
    ///
    /// Failures only update the status; the next mutation schedules a new attempt.
    pub fn poll(&mut self, now: Instant) {
        if let Some(forest) = self.saves.take_due(now) {
            let _ = self.write(forest);
        }
    }

    /// Write the pending snapshot immediately.
    pub fn flush(&mut self) -> ApplicationResult<()> {
        match self.saves.take_pending() {
            Some(forest) => self.write(forest),
            None => Ok(()),
        }
    }

    fn write(&mut self, mut forest: Forest) -> ApplicationResult<()> {
        self.layout.annotate(&mut forest);
        match self.persistence.save(&forest) {
            Ok(()) => {
                let at = Utc::now();
                debug!(nodes = forest.len(), %at, "forest saved");
                self.status = PersistenceStatus::Saved { at };
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "saving forest failed");
                self.status = PersistenceStatus::Failed {
                    message: err.to_string(),
                };
                Err::<(), _>(err).with_persistence_context("save forest")
            }
        }
    }

    /// Visible nodes with live positions, for the renderer.
    pub fn scene(&self) -> Scene {
        let nodes = self
            .store
            .flatten(true)
            .into_iter()
            .map(|flat| {
                let pos = self.layout.position_of(&flat.id).unwrap_or_default();
                SceneNode {
                    x: pos.x,
                    y: pos.y,
                    id: flat.id,
                    name: flat.name,
                    color: flat.color,
                    depth: flat.depth,
                    children_hidden: flat.children_hidden,
                    child_count: flat.child_count,
                }
            })
            .collect();
        Scene {
            nodes,
            links: self.store.links(),
            selected: self.selected.clone(),
            status: self.status.clone(),
            state: self.layout.state(),
        }
    }

    pub fn forest(&self) -> &Forest {
        self.store.forest()
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.store.find_node(id)
    }

    pub fn search_corpus(&self) -> Vec<SearchEntry> {
        self.store.search_corpus()
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn status(&self) -> &PersistenceStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn is_save_pending(&self) -> bool {
        self.saves.is_pending()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nodes", &self.store.len())
            .field("undo", &self.undo.len())
            .field("status", &self.status)
            .field("selected", &self.selected)
            .finish()
    }
}

