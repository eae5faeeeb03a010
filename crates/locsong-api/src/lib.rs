//! Typed access to the OPhim v1 movie catalog.
//!
//! [`ophim::OphimClient`] is the transport, [`traits::CatalogService`] the
//! seam the rest of the workspace programs against, and [`image`] turns the
//! catalog's image paths into absolute URLs.

pub mod image;
pub mod ophim;
pub mod traits;

pub use ophim::{OphimClient, OphimError};
pub use traits::CatalogService;
