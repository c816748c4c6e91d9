//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, VoxelSpacing};

pub use crate::config::{EvalConfig, OrganLabelTable};
pub use crate::consts::{AUC_POINTS, EPSILON, LIVER_DOME_EXCLUSION_CM, OUTLIER_THRESHOLDS};
pub use crate::data::{NiftiHeaderAttr, OpenVolumeError, PetVolume, SegLabel};
pub use crate::error::{MetricError, MetricResult};
pub use crate::suv::{to_suv, PetUnit, SubjectMetadata};

pub use crate::metrics::{
    brain_outlier_score, organ_bias, tac_bias, whole_body_mae, BrainCase, RegionBias,
};
