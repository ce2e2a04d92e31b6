//! Per-tick forces of the station simulation
//!
//! Each force reads positions and accumulates into velocities; integration
//! happens once per tick after all forces ran.

use rand::Rng;

/// One simulated station.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    /// Pinned coordinates; a fixed body ignores forces
    pub fixed: Option<(f64, f64)>,
}

impl Body {
    pub fn at(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            fixed: None,
        }
    }
}

/// Tiny random offset to separate coincident bodies.
fn jiggle(rng: &mut impl Rng) -> f64 {
    (rng.random::<f64>() - 0.5) * 1e-6
}

/// Springs pulling each linked pair toward `distance`.
///
/// Strength is divided by the smaller endpoint degree so hubs are not
/// yanked around, and the correction is split by relative degree.
pub fn apply_links(
    bodies: &mut [Body],
    edges: &[(usize, usize)],
    distance: f64,
    strength: f64,
    alpha: f64,
    rng: &mut impl Rng,
) {
    let mut degree = vec![0usize; bodies.len()];
    for &(s, t) in edges {
        degree[s] += 1;
        degree[t] += 1;
    }

    for &(s, t) in edges {
        let (src, tgt) = (&bodies[s], &bodies[t]);
        let mut dx = tgt.x + tgt.vx - src.x - src.vx;
        let mut dy = tgt.y + tgt.vy - src.y - src.vy;
        if dx == 0.0 {
            dx = jiggle(rng);
        }
        if dy == 0.0 {
            dy = jiggle(rng);
        }
        let len = (dx * dx + dy * dy).sqrt();
        let k = strength / degree[s].min(degree[t]) as f64;
        let l = (len - distance) / len * alpha * k;
        let (fx, fy) = (dx * l, dy * l);
        let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;

        bodies[t].vx -= fx * bias;
        bodies[t].vy -= fy * bias;
        bodies[s].vx += fx * (1.0 - bias);
        bodies[s].vy += fy * (1.0 - bias);
    }
}

/// All-pairs inverse-square charge; negative `strength` repels.
pub fn apply_charge(bodies: &mut [Body], strength: f64, alpha: f64, rng: &mut impl Rng) {
    let n = bodies.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let mut dx = bodies[j].x - bodies[i].x;
            let mut dy = bodies[j].y - bodies[i].y;
            if dx == 0.0 {
                dx = jiggle(rng);
            }
            if dy == 0.0 {
                dy = jiggle(rng);
            }
            // Clamp to avoid blow-ups for nearly coincident bodies
            let l2 = (dx * dx + dy * dy).max(1.0);
            let w = strength * alpha / l2;
            bodies[i].vx += dx * w;
            bodies[i].vy += dy * w;
            bodies[j].vx -= dx * w;
            bodies[j].vy -= dy * w;
        }
    }
}

/// Independent pull toward `cx` and `cy`.
pub fn apply_center(bodies: &mut [Body], cx: f64, cy: f64, strength: f64, alpha: f64) {
    for body in bodies.iter_mut() {
        body.vx += (cx - body.x) * strength * alpha;
        body.vy += (cy - body.y) * strength * alpha;
    }
}

/// Push overlapping bodies apart, weighted by the other body's area.
pub fn apply_collide(bodies: &mut [Body], rng: &mut impl Rng) {
    let n = bodies.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let ri = bodies[i].radius;
            let rj = bodies[j].radius;
            let r = ri + rj;
            let mut dx = (bodies[i].x + bodies[i].vx) - (bodies[j].x + bodies[j].vx);
            let mut dy = (bodies[i].y + bodies[i].vy) - (bodies[j].y + bodies[j].vy);
            let mut l2 = dx * dx + dy * dy;
            if l2 >= r * r {
                continue;
            }
            if dx == 0.0 {
                dx = jiggle(rng);
                l2 += dx * dx;
            }
            if dy == 0.0 {
                dy = jiggle(rng);
                l2 += dy * dy;
            }
            let len = l2.sqrt();
            let l = (r - len) / len;
            let (fx, fy) = (dx * l, dy * l);
            let wi = rj * rj / (ri * ri + rj * rj);

            bodies[i].vx += fx * wi;
            bodies[i].vy += fy * wi;
            bodies[j].vx -= fx * (1.0 - wi);
            bodies[j].vy -= fy * (1.0 - wi);
        }
    }
}

/// Apply velocity decay and move every free body; fixed bodies snap to their pin.
pub fn integrate(bodies: &mut [Body], velocity_decay: f64) {
    for body in bodies.iter_mut() {
        match body.fixed {
            Some((fx, fy)) => {
                body.x = fx;
                body.y = fy;
                body.vx = 0.0;
                body.vy = 0.0;
            }
            None => {
                body.vx *= 1.0 - velocity_decay;
                body.vy *= 1.0 - velocity_decay;
                body.x += body.vx;
                body.y += body.vy;
            }
        }
    }
}
