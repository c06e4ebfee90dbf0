//! Placement of new notes near the canvas center.
//!
//! Candidates are visited in rings of growing Chebyshev radius around the
//! centered origin, nearest (Euclidean) first. The first candidate that fits
//! inside the canvas and keeps the minimum gap to every existing note wins.
//! When the capped ring search finds nothing the whole canvas is scanned in
//! row-major order, and as a last resort the top-left corner is returned.

use std::{cmp::Reverse, collections::BinaryHeap};

use rand::Rng;

use super::entity::{Note, Position};

/// Geometry used by the placement search, in grid units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub canvas_width: i32,
    pub canvas_height: i32,
    /// Minimum distance kept between two notes that line up on an axis
    pub gap: i32,
    /// Largest ring radius searched before the fallback scan
    pub max_search_radius: i32,
    /// Amplitude of the random offset applied to the chosen position
    pub jitter: f64,
}

/// Canvas of 3000px at a 20px grid.
pub const DEFAULT_CANVAS_SIZE: i32 = 150;
pub const DEFAULT_NOTE_WIDTH: i32 = 20;
pub const DEFAULT_NOTE_HEIGHT: i32 = 20;

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_SIZE,
            canvas_height: DEFAULT_CANVAS_SIZE,
            gap: 1,
            max_search_radius: DEFAULT_CANVAS_SIZE / 2,
            jitter: 0.5,
        }
    }
}

impl PlacementConfig {
    /// Top-left corner that centers a `width` x `height` footprint.
    fn centered_origin(&self, width: i32, height: i32) -> (i32, i32) {
        (
            self.canvas_width / 2 - width.div_euclid(2),
            self.canvas_height / 2 - height.div_euclid(2),
        )
    }

    fn within_bounds(&self, rect: &Rect) -> bool {
        rect.x >= 0
            && rect.y >= 0
            && rect.right() <= self.canvas_width
            && rect.bottom() <= self.canvas_height
    }
}

/// Axis-aligned footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Rect {
    fn of(note: &Note) -> Self {
        Self {
            x: note.position.x,
            y: note.position.y,
            width: note.size.width,
            height: note.size.height,
        }
    }

    fn right(&self) -> i32 {
        self.x + self.width
    }

    fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Overlap, or sitting closer than `gap` to `other` while aligned with it
    /// on the perpendicular axis.
    fn conflicts_with(&self, other: &Rect, gap: i32) -> bool {
        let horizontal_overlap = self.x < other.right() && self.right() > other.x;
        let vertical_overlap = self.y < other.bottom() && self.bottom() > other.y;

        if horizontal_overlap && vertical_overlap {
            return true;
        }

        let horizontal_gap = (self.right() - other.x)
            .abs()
            .min((other.right() - self.x).abs());
        let vertical_gap = (self.bottom() - other.y)
            .abs()
            .min((other.bottom() - self.y).abs());

        (horizontal_overlap && vertical_gap < gap) || (vertical_overlap && horizontal_gap < gap)
    }
}

/// Candidate origins ordered by distance to a center point.
///
/// Rings are generated lazily. Ring `r` only yields its perimeter, and a
/// buffered candidate is released once no later ring can hold a closer one
/// (every cell of ring `r + 1` is at least `r + 1` away). The sequence is
/// finite, ending after ring `max_radius`.
pub struct RingCandidates {
    center: (i32, i32),
    max_radius: i32,
    next_radius: i32,
    seq: u64,
    heap: BinaryHeap<Reverse<(i64, u64, i32, i32)>>,
}

impl RingCandidates {
    pub fn new(center: (i32, i32), max_radius: i32) -> Self {
        Self {
            center,
            max_radius: max_radius.max(0),
            next_radius: 0,
            seq: 0,
            heap: BinaryHeap::new(),
        }
    }

    fn push(&mut self, dx: i32, dy: i32) {
        let dist_sq = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
        self.heap.push(Reverse((
            dist_sq,
            self.seq,
            self.center.0 + dx,
            self.center.1 + dy,
        )));
        self.seq += 1;
    }

    fn push_ring(&mut self, r: i32) {
        if r == 0 {
            self.push(0, 0);
            return;
        }
        for dx in -r..=r {
            self.push(dx, -r);
            self.push(dx, r);
        }
        for dy in (-r + 1)..r {
            self.push(-r, dy);
            self.push(r, dy);
        }
    }
}

impl Iterator for RingCandidates {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rings_done = self.next_radius > self.max_radius;
            if let Some(Reverse((dist_sq, _, x, y))) = self.heap.peek().copied() {
                let bound = i64::from(self.next_radius) * i64::from(self.next_radius);
                if rings_done || dist_sq <= bound {
                    self.heap.pop();
                    return Some((x, y));
                }
            } else if rings_done {
                return None;
            }
            self.push_ring(self.next_radius);
            self.next_radius += 1;
        }
    }
}

/// Find a position for a new `width` x `height` note on the default canvas.
pub fn place(existing: &[Note], width: i32, height: i32) -> Position {
    place_with(
        existing,
        width,
        height,
        &PlacementConfig::default(),
        &mut rand::rng(),
    )
}

/// Find a position for a new note with explicit geometry and jitter source.
pub fn place_with<R: Rng>(
    existing: &[Note],
    width: i32,
    height: i32,
    config: &PlacementConfig,
    rng: &mut R,
) -> Position {
    let (origin_x, origin_y) = config.centered_origin(width, height);

    if existing.is_empty() {
        return Position::new(origin_x.max(0), origin_y.max(0));
    }

    let obstacles: Vec<Rect> = existing.iter().map(Rect::of).collect();
    let fits = |x: i32, y: i32| {
        let candidate = Rect {
            x,
            y,
            width,
            height,
        };
        config.within_bounds(&candidate)
            && !obstacles
                .iter()
                .any(|other| candidate.conflicts_with(other, config.gap))
    };

    for (x, y) in RingCandidates::new((origin_x, origin_y), config.max_search_radius) {
        if !fits(x, y) {
            continue;
        }

        let offset_x = (rng.random::<f64>() - 0.5) * config.jitter;
        let offset_y = (rng.random::<f64>() - 0.5) * config.jitter;
        let jittered_x = (f64::from(x) + offset_x).round() as i32;
        let jittered_y = (f64::from(y) + offset_y).round() as i32;

        if fits(jittered_x, jittered_y) {
            return Position::new(jittered_x, jittered_y);
        }
        return Position::new(x, y);
    }

    tracing::debug!(
        "Ring search exhausted (radius {}), scanning canvas",
        config.max_search_radius
    );
    for y in 0..=(config.canvas_height - height) {
        for x in 0..=(config.canvas_width - width) {
            if fits(x, y) {
                return Position::new(x, y);
            }
        }
    }

    tracing::warn!("Canvas is full, placing note at the origin corner");
    Position::new(0, 0)
}
