//! Velocity-integrated particle simulator for free-form drags.
//!
//! Single-threaded and cooperative: callers tick it explicitly and read
//! positions back between ticks. Forces are additive per tick and scaled by
//! a decaying alpha, so a released layout cools into a rest state instead of
//! oscillating.

use log::error;

use crate::config::SimConfig;
use crate::spec::{NodeKind, Point};

/// One simulated node. `fx`/`fy` pin it; `column_x`/`row_y` are hard domain
/// constraints re-applied every tick.
#[derive(Debug, Clone)]
pub struct Particle {
    pub node_id: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    /// Rest position the target force pulls toward; ignored while pinned.
    pub target: Option<Point>,
    pub column_x: Option<f32>,
    pub row_y: Option<f32>,
}

impl Particle {
    pub fn new(node_id: impl Into<String>, kind: NodeKind, x: f32, y: f32, radius: f32) -> Self {
        Self {
            node_id: node_id.into(),
            kind,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            fx: None,
            fy: None,
            target: Some(Point { x, y }),
            column_x: None,
            row_y: None,
        }
    }

    pub fn pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }
}

/// Annulus confining circle/bubble-map peripherals around the topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingBounds {
    pub cx: f32,
    pub cy: f32,
    pub inner_r: f32,
    pub outer_r: f32,
}

impl RingBounds {
    /// Radially project a point into the annulus. Points at the exact
    /// center map to the top of the inner ring.
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.cx;
        let dy = y - self.cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < f32::EPSILON {
            return (self.cx, self.cy - self.inner_r);
        }
        let clamped = dist.clamp(self.inner_r, self.outer_r);
        (
            self.cx + dx / dist * clamped,
            self.cy + dy / dist * clamped,
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.cx;
        let dy = y - self.cy;
        let dist = (dx * dx + dy * dy).sqrt();
        dist >= self.inner_r - 1e-3 && dist <= self.outer_r + 1e-3
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    particles: Vec<Particle>,
    config: SimConfig,
    center: Point,
    ring: Option<RingBounds>,
    alpha: f32,
    alpha_target: f32,
}

impl Simulation {
    pub fn new(
        particles: Vec<Particle>,
        center: Point,
        ring: Option<RingBounds>,
        config: SimConfig,
    ) -> Self {
        Self {
            particles,
            config,
            center,
            ring,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Hold alpha near a value; `alpha_target(1.0)` keeps the simulation hot
    /// for the duration of a drag, `alpha_target(0.0)` lets it cool.
    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn restart(&mut self) {
        self.alpha = 1.0;
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, node_id: &str) -> Option<&Particle> {
        self.particles.iter().find(|p| p.node_id == node_id)
    }

    /// Pin a particle to a point, projected through the ring when present.
    /// A missing particle is logged and ignored; the drag recovers to idle.
    pub fn pin(&mut self, node_id: &str, x: f32, y: f32) -> bool {
        let (px, py) = match self.ring {
            Some(ring) => ring.project(x, y),
            None => (x, y),
        };
        match self.particles.iter_mut().find(|p| p.node_id == node_id) {
            Some(p) => {
                let (px, py) = (p.column_x.unwrap_or(px), p.row_y.unwrap_or(py));
                p.fx = Some(px);
                p.fy = Some(py);
                true
            }
            None => {
                error!("simulation has no particle for node {node_id}");
                false
            }
        }
    }

    pub fn unpin(&mut self, node_id: &str) {
        if let Some(p) = self.particles.iter_mut().find(|p| p.node_id == node_id) {
            p.fx = None;
            p.fy = None;
        }
    }

    pub fn tick(&mut self) {
        let alpha = self.alpha;
        let n = self.particles.len();

        for p in &mut self.particles {
            if let (Some(fx), Some(fy)) = (p.fx, p.fy) {
                p.x = fx;
                p.y = fy;
                p.vx = 0.0;
                p.vy = 0.0;
            }
        }

        // Charge: pairwise, inverse-distance falloff. Negative repels.
        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy) = {
                    let (a, b) = (&self.particles[i], &self.particles[j]);
                    (b.x - a.x, b.y - a.y)
                };
                let dist_sq = (dx * dx + dy * dy).max(1.0);
                let dist = dist_sq.sqrt();
                let f = self.config.charge_strength * alpha / dist_sq;
                let (fx, fy) = (dx / dist * f, dy / dist * f);
                if !self.particles[i].pinned() {
                    self.particles[i].vx -= fx;
                    self.particles[i].vy -= fy;
                }
                if !self.particles[j].pinned() {
                    self.particles[j].vx += fx;
                    self.particles[j].vy += fy;
                }
            }
        }

        // Collide: separate overlapping pairs along the center line.
        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy, overlap) = {
                    let (a, b) = (&self.particles[i], &self.particles[j]);
                    let (dx, dy) = (b.x - a.x, b.y - a.y);
                    let dist = (dx * dx + dy * dy).sqrt().max(1e-3);
                    let min_dist = a.radius + b.radius + self.config.collide_padding;
                    (dx / dist, dy / dist, min_dist - dist)
                };
                if overlap <= 0.0 {
                    continue;
                }
                let i_pinned = self.particles[i].pinned();
                let j_pinned = self.particles[j].pinned();
                let (wi, wj) = match (i_pinned, j_pinned) {
                    (true, true) => (0.0, 0.0),
                    (true, false) => (0.0, 1.0),
                    (false, true) => (1.0, 0.0),
                    (false, false) => (0.5, 0.5),
                };
                self.particles[i].x -= dx * overlap * wi;
                self.particles[i].y -= dy * overlap * wi;
                self.particles[j].x += dx * overlap * wj;
                self.particles[j].y += dy * overlap * wj;
            }
        }

        // Center, target, domain constraints, integration.
        let config = self.config.clone();
        let center = self.center;
        let ring = self.ring;
        for p in &mut self.particles {
            if p.pinned() {
                continue;
            }
            p.vx += (center.x - p.x) * config.center_strength * alpha;
            p.vy += (center.y - p.y) * config.center_strength * alpha;
            if let Some(target) = p.target {
                p.vx += (target.x - p.x) * config.target_strength * alpha;
                p.vy += (target.y - p.y) * config.target_strength * alpha;
            }

            p.x += p.vx;
            p.y += p.vy;
            p.vx *= 1.0 - config.velocity_decay;
            p.vy *= 1.0 - config.velocity_decay;

            if let Some(ring) = ring {
                let dx = p.x - ring.cx;
                let dy = p.y - ring.cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > ring.outer_r {
                    let scale = ring.outer_r / dist;
                    p.x = ring.cx + dx * scale;
                    p.y = ring.cy + dy * scale;
                    p.vx *= 0.5;
                    p.vy *= 0.5;
                } else if dist < ring.inner_r {
                    let (nx, ny) = ring.project(p.x, p.y);
                    let push = (ring.inner_r - dist) * 0.1;
                    p.x = nx;
                    p.y = ny;
                    if dist > f32::EPSILON {
                        p.vx += dx / dist * push;
                        p.vy += dy / dist * push;
                    }
                }
            }
            if let Some(col_x) = p.column_x {
                p.x = col_x;
                p.vx = 0.0;
            }
            if let Some(row_y) = p.row_y {
                p.y = row_y;
                p.vy = 0.0;
            }
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
    }

    /// Run ticks synchronously until alpha cools below the stop threshold
    /// or the tick cap is hit. Returns the number of ticks run.
    pub fn settle(&mut self) -> usize {
        self.set_alpha_target(0.0);
        let mut ticks = 0;
        while self.alpha >= self.config.alpha_stop && ticks < self.config.max_settle_ticks {
            self.tick();
            ticks += 1;
        }
        ticks
    }
}
