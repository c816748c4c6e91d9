//! 器官 SUV 均值偏差 (MARE).

use ndarray::ArrayView3;

use super::{mean_bias, RegionBias};
use crate::config::OrganLabelTable;
use crate::consts::EPSILON;
use crate::error::{ensure_shape, MetricResult};
use crate::region::{label_mask, region_mean, relative_bias};
use crate::suv::{to_suv, PetUnit, SubjectMetadata};

/// 逐器官计算 SUV 均值的相对偏差, 按器官表顺序返回.
///
/// 分割中不存在的器官会被跳过. 结果可能为空.
pub fn organ_bias_breakdown(
    pred: ArrayView3<f32>,
    gt: ArrayView3<f32>,
    seg: ArrayView3<i32>,
    organs: &OrganLabelTable,
    meta: &SubjectMetadata,
    unit: PetUnit,
) -> MetricResult<Vec<RegionBias>> {
    ensure_shape(gt.shape(), pred.shape())?;
    ensure_shape(gt.shape(), seg.shape())?;

    let pred = to_suv(pred, meta, unit);
    let gt = to_suv(gt, meta, unit);

    let ans = organs
        .iter()
        .filter_map(|(name, label)| {
            let mask = label_mask(seg, label);
            let pred_mean = region_mean(pred.view(), mask.view())?;
            let gt_mean = region_mean(gt.view(), mask.view())?;
            let bias = relative_bias(pred_mean, gt_mean, EPSILON);
            log::debug!("organ `{name}` ({label}): pred {pred_mean:.4}, gt {gt_mean:.4}, mare {bias:.6}");
            Some(RegionBias {
                name: name.to_string(),
                bias,
            })
        })
        .collect();
    Ok(ans)
}

/// 器官偏差评分: 各器官 SUV 均值 MARE 的算术平均.
///
/// 若器官表中的所有器官都不在分割中出现, 则返回
/// [`MetricError::NoValidRegions`](crate::MetricError::NoValidRegions).
pub fn organ_bias(
    pred: ArrayView3<f32>,
    gt: ArrayView3<f32>,
    seg: ArrayView3<i32>,
    organs: &OrganLabelTable,
    meta: &SubjectMetadata,
    unit: PetUnit,
) -> MetricResult<f64> {
    mean_bias(&organ_bias_breakdown(pred, gt, seg, organs, meta, unit)?)
}
