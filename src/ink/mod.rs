//! Red ink removal kernels.
//!
//! - [`detect`] - HSV thresholding into a [`DetectionMask`]
//! - [`dilate`] - square dilation of the mask
//! - [`inpaint`] - masked neighbour-mean reconstruction
//!
//! All three are pure functions of their inputs and process rows in parallel.

pub mod detect;
pub mod dilate;
pub mod inpaint;

pub use detect::{ALPHA_THRESHOLD, detect, rgb_to_hsv};
pub use dilate::dilate;
pub use inpaint::reconstruct;

/// One flag per pixel, row-major, same dimensions as its source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl DetectionMask {
    /// An all-clear mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub(crate) fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.bits[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// マスクされたピクセル数。
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|b| *b)
    }

    pub fn same_size_as(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}
