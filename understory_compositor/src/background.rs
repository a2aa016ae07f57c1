// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use peniko::Color;
use understory_damage::PixelSize;

use crate::raster::Raster;

/// What dirty regions are reset to before nodes are redrawn.
///
/// A background is an optional solid color with an optional image stretched
/// over it to the target size. Without either, cleared regions stay fully
/// transparent.
///
/// The compositor renders the background once per target size and keeps the
/// result in a bounded cache.
#[derive(Clone, Debug, Default)]
pub struct Background {
    color: Option<Color>,
    image: Option<Arc<Raster>>,
}

impl Background {
    /// A solid color.
    #[must_use]
    pub fn solid(color: Color) -> Self {
        Self {
            color: Some(color),
            image: None,
        }
    }

    /// An image stretched to the target size.
    #[must_use]
    pub fn image(image: Arc<Raster>) -> Self {
        Self {
            color: None,
            image: Some(image),
        }
    }

    /// Sets the color drawn under the image.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the image drawn over the color.
    #[must_use]
    pub fn with_image(mut self, image: Arc<Raster>) -> Self {
        self.image = Some(image);
        self
    }

    /// The solid color, if any.
    #[must_use]
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// The image, if any.
    #[must_use]
    pub fn image_ref(&self) -> Option<&Raster> {
        self.image.as_deref()
    }

    /// Returns `true` if neither a color nor an image is set.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.color.is_none() && self.image.is_none()
    }

    /// Renders the background at `size`.
    #[must_use]
    pub fn render(&self, size: PixelSize) -> Raster {
        let mut out = match self.color {
            Some(color) => Raster::filled(size, color),
            None => Raster::new(size),
        };
        if let Some(image) = &self.image {
            let scaled;
            let image = if image.size() == size {
                image.as_ref()
            } else {
                scaled = image.scaled(size);
                &scaled
            };
            out.blend_from(image, image.bounds(), 0, 0);
        }
        out
    }
}
