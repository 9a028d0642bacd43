use crate::InputShapeError;
use serde::{Deserialize, Serialize};

/// Stack of `n_images` square real images, each `side x side`, row-major.
///
/// Pixel `(x, y)` of image `i` lives at `data[i * side * side + y * side + x]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageStack {
    side: usize,
    n_images: usize,
    data: Vec<f64>,
}

impl ImageStack {
    pub fn new(side: usize, n_images: usize, data: Vec<f64>) -> Result<Self, InputShapeError> {
        if side == 0 {
            return Err(InputShapeError::EmptyImage);
        }
        let expected = side * side * n_images;
        if data.len() != expected {
            return Err(InputShapeError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            side,
            n_images,
            data,
        })
    }

    /// Build a stack from a per-pixel function `f(image, x, y)`.
    pub fn from_fn(side: usize, n_images: usize, mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(side * side * n_images);
        for i in 0..n_images {
            for y in 0..side {
                for x in 0..side {
                    data.push(f(i, x, y));
                }
            }
        }
        Self {
            side,
            n_images,
            data,
        }
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn n_images(&self) -> usize {
        self.n_images
    }

    /// Pixels of image `i`, row-major.
    #[inline]
    pub fn image(&self, i: usize) -> &[f64] {
        let n = self.side * self.side;
        &self.data[i * n..(i + 1) * n]
    }

    /// Copy of the stack with every image shifted to zero mean.
    ///
    /// The common-line detector rejects stacks whose DC term is not zero, so
    /// raw images usually pass through here first.
    pub fn mean_subtracted(&self) -> Self {
        let n = self.side * self.side;
        if n == 0 {
            return self.clone();
        }
        let mut data = self.data.clone();
        for img in data.chunks_mut(n) {
            let mean = img.iter().sum::<f64>() / n as f64;
            img.iter_mut().for_each(|v| *v -= mean);
        }
        Self {
            side: self.side,
            n_images: self.n_images,
            data,
        }
    }
}
