//! Optimierungslogik für die 3D-Beladung eines Containers.
//!
//! Dieses Modul implementiert eine deterministische Regal-Heuristik (Shelf Packing):
//! - Zeilen entlang der x-Achse
//! - Zeilen werden entlang der y-Achse zu Schichten zusammengesetzt
//! - Schichten stapeln sich entlang der z-Achse
//!
//! Zerbrechliche Artikel werden nach allen anderen geladen und landen dadurch
//! tendenziell in höheren Schichten. Nach dem Vorwärtsdurchlauf schiebt eine
//! Kompaktierung die Platzierungen Richtung Ursprung.

use std::cmp::Ordering;

use serde::Serialize;

use crate::compaction::compact;
use crate::geometry::{fits_within, overlaps};
use crate::metrics::SolutionMetrics;
use crate::model::{Container, ItemInstance, Placement, Sku, Solution};
use crate::orientation::allowed_orientations;
use crate::types::{Dimensional, Orientation, Vec3};

/// Anzahl äußerer Durchläufe pro Instanz, bevor sie als unplatziert gilt.
pub const MAX_PASSES: usize = 3;
/// Positionsversuche pro Orientierung: Cursor, neue Zeile, neue Schicht.
pub const MAX_TRIES: usize = 3;

/// Konfiguration für den Solver.
///
/// Enthält die Parameter der Kompaktierung nach dem Vorwärtsdurchlauf.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Schrittweite der Kandidaten-Positionen bei der Kompaktierung
    pub compaction_step: f64,
    /// Maximale Verschiebung nach links bei der Kompaktierung
    pub compaction_window: f64,
    /// Schaltet die Kompaktierung ein oder aus
    pub compaction_enabled: bool,
}

impl SolverConfig {
    pub const DEFAULT_COMPACTION_STEP: f64 = 5.0;
    pub const DEFAULT_COMPACTION_WINDOW: f64 = 50.0;
    pub const DEFAULT_COMPACTION_ENABLED: bool = true;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder::default()
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            compaction_step: Self::DEFAULT_COMPACTION_STEP,
            compaction_window: Self::DEFAULT_COMPACTION_WINDOW,
            compaction_enabled: Self::DEFAULT_COMPACTION_ENABLED,
        }
    }
}

/// Builder-Pattern für SolverConfig.
#[derive(Clone, Debug, Default)]
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl SolverConfigBuilder {
    /// Setzt die Schrittweite der Kompaktierung.
    pub fn compaction_step(mut self, step: f64) -> Self {
        self.config.compaction_step = step;
        self
    }

    /// Setzt das Suchfenster der Kompaktierung.
    pub fn compaction_window(mut self, window: f64) -> Self {
        self.config.compaction_window = window;
        self
    }

    /// Aktiviert oder deaktiviert die Kompaktierung.
    pub fn compaction_enabled(mut self, enabled: bool) -> Self {
        self.config.compaction_enabled = enabled;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> SolverConfig {
        self.config
    }
}

/// Ereignisse, die während des Planens auftreten, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SolveEvent {
    /// Eine Instanz wurde platziert.
    ItemPlaced {
        instance_id: String,
        sku_id: String,
        pos: Vec3,
        dims: Orientation,
        weight: f64,
    },
    /// Eine Instanz konnte nicht platziert werden.
    ItemRejected {
        instance_id: String,
        sku_id: String,
        dims: Orientation,
    },
    /// Eine Platzierung wurde bei der Kompaktierung auf `x` verschoben.
    ItemMoved { instance_id: String, x: f64 },
    /// Die Kompaktierung ist abgeschlossen.
    Compacted { moved: usize },
    /// Planung abgeschlossen, mit den Kennzahlen der endgültigen Lösung.
    Finished {
        placed: usize,
        unplaced: usize,
        #[serde(flatten)]
        metrics: SolutionMetrics,
    },
}

/// Cursor des Regal-Algorithmus: Spalte (x) in der Zeile (y) in der Schicht (z).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ShelfCursor {
    x: f64,
    y: f64,
    z: f64,
    /// Tiefste Ausdehnung (inkl. Abstand) in der aktuellen Zeile
    row_depth: f64,
    /// Höchste Ausdehnung (inkl. Abstand) in der aktuellen Schicht
    layer_height: f64,
}

impl ShelfCursor {
    fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Prüft, ob die aufgeblähte Box am Cursor in den Container passt.
    fn has_room(&self, padded: Orientation, container: &Container) -> bool {
        self.z + padded.2 <= container.height
            && self.y + padded.1 <= container.width
            && self.x + padded.0 <= container.length
    }

    fn advance(&mut self, padded: Orientation) {
        self.x += padded.0;
        self.row_depth = self.row_depth.max(padded.1);
        self.layer_height = self.layer_height.max(padded.2);
    }

    fn reset_row(&mut self) {
        self.x = 0.0;
        self.row_depth = 0.0;
    }

    fn new_row(&mut self, clearance: f64) {
        self.y += self.row_depth + clearance;
        self.reset_row();
    }

    fn new_layer(&mut self, clearance: f64) {
        self.z += self.layer_height + clearance;
        self.y = 0.0;
        self.layer_height = 0.0;
        self.reset_row();
    }
}

/// Hauptfunktion zur Planung einer Containerbeladung.
///
/// # Parameter
/// * `container` - Der zu beladende Container
/// * `skus` - Artikeltypen mit Stückzahlen
///
/// # Rückgabewert
/// `Solution` mit Platzierungen, unplatzierten Instanzen und Kennzahlen
///
/// # Beispiel
/// ```
/// use cubemaster::model::{Container, Sku};
/// use cubemaster::optimizer::solve;
///
/// let container = Container::new((30.0, 10.0, 10.0), 100.0);
/// let skus = vec![Sku::new("cube", "Cube", (10.0, 10.0, 10.0), 5.0, 3)];
/// let solution = solve(&container, &skus);
/// assert_eq!(solution.placements.len(), 3);
/// assert!(solution.unplaced.is_empty());
/// ```
pub fn solve(container: &Container, skus: &[Sku]) -> Solution {
    solve_with_config(container, skus, SolverConfig::default())
}

/// Planung mit benutzerdefinierter Konfiguration.
pub fn solve_with_config(container: &Container, skus: &[Sku], config: SolverConfig) -> Solution {
    solve_with_progress(container, skus, config, |_| {})
}

/// Planung mit benutzerdefinierter Konfiguration und Live-Progress Callback.
///
/// Ruft für jeden wichtigen Schritt ein Callback auf (geeignet für SSE).
pub fn solve_with_progress(
    container: &Container,
    skus: &[Sku],
    config: SolverConfig,
    mut on_event: impl FnMut(&SolveEvent),
) -> Solution {
    let mut items = expand_instances(skus);
    sort_instances(&mut items);

    let mut cursor = ShelfCursor::default();
    let mut placements: Vec<Placement> = Vec::with_capacity(items.len());
    let mut unplaced: Vec<ItemInstance> = Vec::new();

    for item in items {
        match place_instance(&item, container, &mut cursor, &placements) {
            Some(placement) => {
                on_event(&SolveEvent::ItemPlaced {
                    instance_id: placement.instance_id.clone(),
                    sku_id: placement.sku_id.clone(),
                    pos: placement.pos,
                    dims: placement.dims,
                    weight: placement.weight,
                });
                placements.push(placement);
            }
            None => {
                log::debug!(
                    "Keine Position für {} ({:?}) gefunden",
                    item.instance_id,
                    item.sku.dims()
                );
                on_event(&SolveEvent::ItemRejected {
                    instance_id: item.instance_id.clone(),
                    sku_id: item.sku.id.clone(),
                    dims: item.sku.dims(),
                });
                unplaced.push(item);
            }
        }
    }

    if config.compaction_enabled {
        let before: Vec<f64> = placements.iter().map(|p| p.pos.x).collect();
        let moved = compact(
            &mut placements,
            config.compaction_window,
            config.compaction_step,
        );
        for (placement, old_x) in placements.iter().zip(before) {
            if placement.pos.x != old_x {
                on_event(&SolveEvent::ItemMoved {
                    instance_id: placement.instance_id.clone(),
                    x: placement.pos.x,
                });
            }
        }
        on_event(&SolveEvent::Compacted { moved });
    }

    let solution = Solution::assemble(container, placements, unplaced);
    on_event(&SolveEvent::Finished {
        placed: solution.placements.len(),
        unplaced: solution.unplaced.len(),
        metrics: solution.metrics(),
    });
    solution
}

/// Erzeugt eine Instanz pro Stück jeder SKU.
fn expand_instances(skus: &[Sku]) -> Vec<ItemInstance> {
    skus.iter().flat_map(ItemInstance::expand).collect()
}

/// Sortierung: nicht zerbrechliche vor zerbrechlichen, innerhalb davon große zuerst.
///
/// Die Sortierung ist stabil, gleich große Instanzen behalten ihre Eingabereihenfolge.
fn sort_instances(items: &mut [ItemInstance]) {
    items.sort_by(|a, b| {
        a.sku.fragile.cmp(&b.sku.fragile).then_with(|| {
            b.volume()
                .partial_cmp(&a.volume())
                .unwrap_or(Ordering::Equal)
        })
    });
}

/// Versucht eine Instanz am Cursor zu platzieren.
///
/// Pro Orientierung wird am Cursor, in einer neuen Zeile und in einer neuen
/// Schicht probiert. Zwischen den äußeren Durchläufen wird eine neue Schicht
/// erzwungen. Der Cursor wird bei Misserfolg nicht zurückgesetzt.
///
/// # Rückgabewert
/// `Some(Placement)` bei Erfolg, sonst `None`
fn place_instance(
    item: &ItemInstance,
    container: &Container,
    cursor: &mut ShelfCursor,
    placements: &[Placement],
) -> Option<Placement> {
    let clearance = container.clearance;
    let orientations = allowed_orientations(item.sku.dims(), item.sku.upright_only);

    for pass in 0..MAX_PASSES {
        for &dims in &orientations {
            // Passt die Box nicht einmal allein in den Container, wird sie nie versucht
            if !fits_within(dims, container.dims()) {
                continue;
            }
            let padded = (dims.0 + clearance, dims.1 + clearance, dims.2 + clearance);

            for attempt in 0..MAX_TRIES {
                if cursor.has_room(padded, container) {
                    let candidate = Placement::new(item, cursor.position(), dims);
                    if !placements.iter().any(|p| overlaps(p, &candidate)) {
                        cursor.advance(padded);
                        log::trace!(
                            "{} platziert bei {:?} mit {:?}",
                            candidate.instance_id,
                            candidate.pos,
                            dims
                        );
                        return Some(candidate);
                    }
                }
                match attempt {
                    0 => cursor.new_row(clearance),
                    1 => cursor.new_layer(clearance),
                    _ => {}
                }
            }
        }

        if pass + 1 < MAX_PASSES {
            cursor.new_layer(clearance);
        }
    }

    None
}
