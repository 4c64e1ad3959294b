//! Common test utilities and harness
//!
//! Provides reusable utilities for functional testing including:
//! - Test environment setup (temp directories, scene and config files)
//! - Small atlas fixtures for the CPU kernel
//! - Pixel assertion helpers

#![allow(dead_code)]

use std::path::PathBuf;

use sheen_core::{Color, ColorAtlas, Framebuffer, MaskAtlas};
use tempfile::TempDir;

/// Test environment with an isolated scratch directory
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self { temp_dir, dir }
    }

    /// Write a scene file and return its path
    pub fn write_scene(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, content).expect("Failed to write test scene");
        path
    }

    /// Write a config file and return its path
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.dir.join("config.toml");
        std::fs::write(&path, content).expect("Failed to write test config");
        path
    }

    /// Save an image next to the scenes and return its path
    pub fn write_image(&self, name: &str, image: &image::DynamicImage) -> PathBuf {
        let path = self.dir.join(name);
        image.save(&path).expect("Failed to write test image");
        path
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// 32x32 mask with a filled disc of radius 2 around texel (16, 16)
pub fn glyph_mask() -> MaskAtlas {
    let mut mask = MaskAtlas::new(32, 32).expect("mask");
    mask.fill_disc([16.5, 16.5], 2.0, 1.0);
    mask
}

/// 4x4 color atlas, left half red and right half blue
pub fn split_color_atlas() -> ColorAtlas {
    let mut atlas = ColorAtlas::solid(4, 4, Color::rgba(1.0, 0.0, 0.0, 1.0)).expect("atlas");
    atlas.fill_rect(2, 0, 2, 4, Color::rgba(0.0, 0.0, 1.0, 1.0));
    atlas
}

/// Transparent framebuffer of the given size
pub fn transparent_framebuffer(width: u32, height: u32) -> Framebuffer {
    let mut fb = Framebuffer::new(width, height).expect("framebuffer");
    fb.clear(Color::TRANSPARENT, 1.0);
    fb
}

pub fn assert_color_eq(actual: Color, expected: Color, tolerance: f32) {
    let a = actual.to_array();
    let e = expected.to_array();
    for i in 0..4 {
        assert!(
            (a[i] - e[i]).abs() <= tolerance,
            "channel {i}: {actual:?} != {expected:?}"
        );
    }
}
