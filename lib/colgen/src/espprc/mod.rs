pub mod label;
pub mod resource;
pub mod model;
pub mod espptwc;
pub mod preprocessing;
pub mod solver;

pub use label::{Label, LabelArena, LabelId, NodeSet};
pub use model::{EspprcModel, Extension, PricingData};
pub use resource::{ResourceDef, ResourceKind, ScalarRef, Window};
pub use solver::{CancelToken, LabelSelection, LabelingSolver, PricingSolution};
