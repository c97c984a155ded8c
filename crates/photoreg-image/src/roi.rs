use crate::{error::ImageError, image::ImageSize};

/// An axis aligned rectangle in pixel coordinates of the uncropped image.
///
/// # Examples
///
/// ```
/// use photoreg_image::{ImageSize, Rect};
///
/// let roi = Rect::new(10, 20, 30, 40);
/// assert!(roi.validate(ImageSize { width: 40, height: 60 }).is_ok());
/// assert!(roi.validate(ImageSize { width: 39, height: 60 }).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left edge of the rectangle.
    pub x: usize,
    /// Top edge of the rectangle.
    pub y: usize,
    /// Width of the rectangle.
    pub width: usize,
    /// Height of the rectangle.
    pub height: usize,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle covering a whole image of the given size.
    pub fn full(size: ImageSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// The size of the rectangle.
    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether the rectangle has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check that the rectangle is non-empty and lies inside an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::EmptyRect`] for a zero sized rectangle and
    /// [`ImageError::RectOutOfBounds`] when it exceeds the image.
    pub fn validate(&self, image_size: ImageSize) -> Result<(), ImageError> {
        if self.is_empty() {
            return Err(ImageError::EmptyRect(self.width, self.height));
        }

        let fits_x = self
            .x
            .checked_add(self.width)
            .is_some_and(|right| right <= image_size.width);
        let fits_y = self
            .y
            .checked_add(self.height)
            .is_some_and(|bottom| bottom <= image_size.height);

        if !fits_x || !fits_y {
            return Err(ImageError::RectOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width: image_size.width,
                image_height: image_size.height,
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rect {{ x: {}, y: {}, width: {}, height: {} }}",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Rect;
    use crate::{ImageError, ImageSize};

    #[test]
    fn full_image_rect_is_valid() {
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        assert_eq!(Rect::full(size).validate(size), Ok(()));
    }

    #[test]
    fn empty_rect_is_rejected() {
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        assert_eq!(
            Rect::new(3, 3, 0, 10).validate(size),
            Err(ImageError::EmptyRect(0, 10))
        );
    }

    #[test]
    fn rect_out_of_bounds() {
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        assert!(matches!(
            Rect::new(60, 0, 5, 5).validate(size),
            Err(ImageError::RectOutOfBounds { x: 60, .. })
        ));
        assert!(matches!(
            Rect::new(0, 44, 5, 5).validate(size),
            Err(ImageError::RectOutOfBounds { y: 44, .. })
        ));
        assert!(matches!(
            Rect::new(usize::MAX, 0, 5, 5).validate(size),
            Err(ImageError::RectOutOfBounds { .. })
        ));
    }
}
