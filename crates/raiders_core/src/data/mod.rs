//! Data-driven unit catalog.
//!
//! [`UnitCatalogData`] is the serde shape of a catalog document (RON).
//! [`UnitCatalog`] is the immutable registry built from it and handed to
//! the synchronizer, spawner and scene runtime.

mod catalog;
mod unit_data;

pub use catalog::UnitCatalog;
pub use unit_data::{
    infer_kind, infer_radius, team_for_kind, ExtraUnit, FamilyData, KindDefaults, StatOverrides,
    UnitCatalogData, UnitOverride, DEFAULT_RADIUS,
};
