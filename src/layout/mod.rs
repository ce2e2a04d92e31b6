//! Continuous force layout over the visible stations
//!
//! The engine owns a sticky position cache keyed by node id. Positions of
//! nodes that leave the visible set (hidden or removed) stay in the cache
//! and are reused when the node shows up again.

pub mod forces;

use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::config::LayoutSettings;
use crate::domain::{DomainError, DomainResult, FlatNode, Forest, Link, Position};
use forces::Body;

/// Half-width of the random offset given to newly seeded nodes.
const SEED_JITTER: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    Stable,
    Perturbed,
}

/// What a finished drag asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropResolution {
    /// Dropped on the removal zone; needs user confirmation
    RequestRemoval { id: String },
    /// Dropped near another node; reparent under it
    Connect { source: String, target: String },
    Stay,
}

#[derive(Debug)]
pub struct LayoutEngine {
    settings: LayoutSettings,
    cache: HashMap<String, Position>,
    ids: Vec<String>,
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    links: BTreeSet<Link>,
    edges: Vec<(usize, usize)>,
    alpha: f64,
    alpha_target: f64,
    pinned: Option<String>,
    rng: StdRng,
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    pub fn seeded(settings: LayoutSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: LayoutSettings, rng: StdRng) -> Self {
        Self {
            settings,
            cache: HashMap::new(),
            ids: Vec::new(),
            bodies: Vec::new(),
            index: HashMap::new(),
            links: BTreeSet::new(),
            edges: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            pinned: None,
            rng,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    pub fn state(&self) -> SimulationState {
        if self.alpha >= self.settings.alpha_min {
            SimulationState::Perturbed
        } else {
            SimulationState::Stable
        }
    }

    /// Cached position of `id`, visible or not.
    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.cache.get(id).copied()
    }

    /// Replace the active node and link set.
    ///
    /// Returns true when the change was structural and the simulation restarted.
    #[instrument(level = "debug", skip_all, fields(nodes = nodes.len(), links = links.len()))]
    pub fn sync(&mut self, nodes: &[FlatNode], links: &[Link]) -> bool {
        let (bx, by) = self.barycenter(nodes);

        let mut bodies = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());
        let mut ids = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let radius = self.settings.collide_radius(node.name.chars().count());
            let body = match self.index.get(&node.id).map(|&j| &self.bodies[j]) {
                Some(previous) => Body {
                    radius,
                    ..previous.clone()
                },
                None => {
                    let pos = match self.cache.get(&node.id) {
                        Some(p) => *p,
                        None => {
                            let p = Position::new(
                                bx + self.rng.random_range(-SEED_JITTER..SEED_JITTER),
                                by + self.rng.random_range(-SEED_JITTER..SEED_JITTER),
                            );
                            trace!(id = %node.id, x = p.x, y = p.y, "seeded new node");
                            self.cache.insert(node.id.clone(), p);
                            p
                        }
                    };
                    Body::at(pos.x, pos.y, radius)
                }
            };
            bodies.push(body);
            index.insert(node.id.clone(), i);
            ids.push(node.id.clone());
        }

        let link_set: BTreeSet<Link> = links.iter().cloned().collect();
        let edges = link_set
            .iter()
            .filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?)))
            .collect();

        let node_set_changed = ids.len() != self.ids.len()
            || ids.iter().any(|id| !self.index.contains_key(id));
        let structural = node_set_changed || link_set != self.links;

        self.bodies = bodies;
        self.index = index;
        self.ids = ids;
        self.links = link_set;
        self.edges = edges;

        if let Some(id) = self.pinned.clone() {
            if !self.index.contains_key(&id) {
                debug!(%id, "pinned node left the visible set");
                self.pinned = None;
                self.alpha_target = 0.0;
            }
        }

        if structural {
            self.alpha = 1.0;
            debug!("structure changed, simulation restarted");
        }
        structural
    }

    /// Mean of cached positions of currently visible nodes, else canvas center.
    fn barycenter(&self, nodes: &[FlatNode]) -> (f64, f64) {
        let known: Vec<Position> = nodes
            .iter()
            .filter_map(|n| self.cache.get(&n.id).copied())
            .collect();
        if known.is_empty() {
            return self.settings.center();
        }
        let n = known.len() as f64;
        (
            known.iter().map(|p| p.x).sum::<f64>() / n,
            known.iter().map(|p| p.y).sum::<f64>() / n,
        )
    }

    /// Advance the simulation by one step.
    pub fn tick(&mut self) -> SimulationState {
        let s = &self.settings;
        if self.alpha < s.alpha_min && self.alpha_target < s.alpha_min {
            return SimulationState::Stable;
        }
        self.alpha += (self.alpha_target - self.alpha) * s.alpha_decay;
        let alpha = self.alpha;
        let (cx, cy) = s.center();

        forces::apply_links(
            &mut self.bodies,
            &self.edges,
            s.link_distance,
            s.link_strength,
            alpha,
            &mut self.rng,
        );
        forces::apply_charge(&mut self.bodies, s.charge_strength, alpha, &mut self.rng);
        forces::apply_center(&mut self.bodies, cx, cy, s.center_strength, alpha);
        forces::apply_collide(&mut self.bodies, &mut self.rng);
        forces::integrate(&mut self.bodies, s.velocity_decay);

        for (id, body) in self.ids.iter().zip(&self.bodies) {
            self.cache.insert(id.clone(), Position::new(body.x, body.y));
        }
        self.state()
    }

    /// Tick until stable or `max_ticks` elapsed; returns ticks run.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() == SimulationState::Perturbed {
            ticks += 1;
        }
        ticks
    }

    /// Pin `id` under the pointer. Replaces any previous pin.
    pub fn drag_start(&mut self, id: &str) -> DomainResult<()> {
        let i = self.visible_index(id)?;
        if let Some(previous) = self.pinned.take() {
            if let Some(&j) = self.index.get(&previous) {
                self.bodies[j].fixed = None;
            }
            debug!(%previous, "previous pin released");
        }
        let body = &mut self.bodies[i];
        body.fixed = Some((body.x, body.y));
        self.pinned = Some(id.to_string());
        self.alpha_target = self.settings.drag_alpha_target;
        debug!(id, "drag started");
        Ok(())
    }

    pub fn drag_move(&mut self, id: &str, x: f64, y: f64) -> DomainResult<()> {
        let i = self.pinned_index(id)?;
        let body = &mut self.bodies[i];
        body.fixed = Some((x, y));
        body.x = x;
        body.y = y;
        self.cache.insert(id.to_string(), Position::new(x, y));
        Ok(())
    }

    /// Release the pin and decide what the drop means.
    pub fn drag_end(&mut self, id: &str, x: f64, y: f64) -> DomainResult<DropResolution> {
        let i = self.pinned_index(id)?;
        let body = &mut self.bodies[i];
        body.fixed = None;
        body.x = x;
        body.y = y;
        self.cache.insert(id.to_string(), Position::new(x, y));
        self.pinned = None;
        self.alpha_target = 0.0;

        let drop = Position::new(x, y);
        let zone = &self.settings.removal_zone;
        if drop.distance(&Position::new(zone.x, zone.y)) <= zone.radius {
            debug!(id, "dropped on removal zone");
            return Ok(DropResolution::RequestRemoval { id: id.to_string() });
        }

        let nearest = self
            .ids
            .iter()
            .zip(&self.bodies)
            .filter(|(other, _)| other.as_str() != id)
            .map(|(other, b)| (other, drop.distance(&Position::new(b.x, b.y))))
            .filter(|(_, d)| *d <= self.settings.drop_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        Ok(match nearest {
            Some((target, distance)) => {
                debug!(id, %target, distance, "dropped near node");
                DropResolution::Connect {
                    source: id.to_string(),
                    target: target.clone(),
                }
            }
            None => DropResolution::Stay,
        })
    }

    fn visible_index(&self, id: &str) -> DomainResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DomainError::NotFound(id.to_string()))
    }

    fn pinned_index(&self, id: &str) -> DomainResult<usize> {
        if self.pinned.as_deref() != Some(id) {
            warn!(id, pinned = ?self.pinned, "drag gesture for a node that is not pinned");
            return Err(DomainError::InvalidOperation(format!("{id} is not being dragged")));
        }
        self.visible_index(id)
    }

    /// Seed the cache from positions persisted in `forest`.
    pub fn restore_positions(&mut self, forest: &Forest) {
        forest.walk(|node| {
            if let Some(p) = node.position {
                self.cache.insert(node.id.clone(), p);
            }
        });
        debug!(cached = self.cache.len(), "positions restored");
    }

    /// Write cached positions into `forest` for persistence.
    pub fn annotate(&self, forest: &mut Forest) {
        forest.walk_mut(|node| {
            if let Some(p) = self.cache.get(&node.id) {
                node.position = Some(*p);
            }
        });
    }
}
