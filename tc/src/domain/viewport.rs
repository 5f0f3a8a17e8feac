//! Fractal viewport and its coordinate bounds

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Half-width of the window at zoom 1.0
const BASE_SCALE: f64 = 1.5;

/// Centre and zoom of the rendered window in the complex plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub max_iter: u32,
}

/// Rectangular coordinate window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    pub fn new(center_x: f64, center_y: f64, zoom: f64, max_iter: u32) -> Self {
        Self {
            center_x,
            center_y,
            zoom,
            max_iter,
        }
    }

    /// Pick a random window around the interesting part of the Mandelbrot set
    pub fn random(max_iter: u32) -> Self {
        let mut rng = rand::rng();
        let viewport = Self {
            center_x: rng.random_range(-0.7..0.3),
            center_y: rng.random_range(-0.5..0.5),
            zoom: rng.random_range(0.5..2.0),
            max_iter,
        };
        debug!(?viewport, "Viewport::random: picked");
        viewport
    }

    /// Half-width of the square window
    pub fn scale(&self) -> f64 {
        BASE_SCALE / self.zoom
    }

    pub fn bounds(&self) -> Bounds {
        let scale = self.scale();
        Bounds {
            x_min: self.center_x - scale,
            x_max: self.center_x + scale,
            y_min: self.center_y - scale,
            y_max: self.center_y + scale,
        }
    }
}
