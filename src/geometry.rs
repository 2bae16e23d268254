//! Geometrische Hilfsfunktionen für 3D-Kollisionserkennung und Raumplanung.
//!
//! Dieses Modul bietet Funktionen zur Überprüfung von Überschneidungen zwischen
//! platzierten Objekten sowie Passungs- und Begrenzungstests gegen den Container.

use crate::model::{Container, Placement};
use crate::types::{Orientation, Vec3};

/// Prüft, ob zwei platzierte Objekte sich räumlich überschneiden.
///
/// Verwendet Axis-Aligned Bounding Box (AABB) Kollisionserkennung.
/// Zwei Boxen überschneiden sich NICHT, wenn sie in mindestens einer Achse getrennt sind;
/// sich berührende Flächen zählen nicht als Überschneidung.
///
/// # Parameter
/// * `a` - Erstes platziertes Objekt
/// * `b` - Zweites platziertes Objekt
///
/// # Rückgabewert
/// `true` wenn sich die Objekte überschneiden, sonst `false`
pub fn overlaps(a: &Placement, b: &Placement) -> bool {
    a.bounding_box().intersects(&b.bounding_box())
}

/// Prüft komponentenweise, ob `dims` in `space` passt.
///
/// Es wird keine Rotation gesucht, der Aufrufer übergibt bereits orientierte Maße.
pub fn fits_within(dims: Orientation, space: Orientation) -> bool {
    Vec3::from_tuple(dims).fits_within(&Vec3::from_tuple(space), 0.0)
}

/// Prüft, ob ein platziertes Objekt vollständig in `[0, L] x [0, W] x [0, H]` liegt.
pub fn inside_container(placement: &Placement, container: &Container) -> bool {
    placement.bounding_box().is_within(&container.bounds())
}
