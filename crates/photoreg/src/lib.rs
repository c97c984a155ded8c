#![deny(missing_docs)]
//! Feature-based registration of two photographs of the same planar scene.
//!
//! [`register`] detects and matches features inside a region of interest of a
//! source and a destination image, fits a homography mapping destination
//! coordinates onto source coordinates and optionally renders the destination
//! warped onto the source. When too few correspondences are found or no
//! consistent model exists, the result falls back to the identity.
//!
//! ```no_run
//! use photoreg::image::{Image, Rect};
//! use photoreg::{register, RegistrationConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Image::<u8, 3>::from_size_val([640, 480].into(), 0)?;
//! let destination = Image::<u8, 3>::from_size_val([640, 480].into(), 0)?;
//! let roi = Rect::full(source.size());
//!
//! let registration = register(&source, &destination, roi, &RegistrationConfig::default())?;
//! println!("{:?}", registration.homography);
//! # Ok(())
//! # }
//! ```

#[doc(inline)]
pub use photoreg_image as image;

#[doc(inline)]
pub use photoreg_imgproc as imgproc;

#[doc(inline)]
pub use photoreg_geometry as geometry;

/// Registration configuration.
pub mod config;

/// Outcome reporting of a registration.
pub mod diagnostics;

/// Error types of the registration pipeline.
pub mod error;

/// The registration pipeline.
pub mod pipeline;

/// Visual check of the correspondences.
pub mod visualize;

pub use crate::config::{RegistrationConfig, MIN_MATCHES};
pub use crate::diagnostics::{Diagnostics, FallbackReason, Status};
pub use crate::error::RegistrationError;
pub use crate::pipeline::{register, render_preview, Registration};
pub use crate::visualize::draw_matches;
