//! 全身 SUV MAE.
//!
//! 肺底/肝顶交界处的衰减差异是预期内的, 不应计入误差. 因此以肝脏最上方切片为中心,
//! 上下各排除 `exclusion_cm` 厘米厚的水平切片.

use ndarray::{s, Array3, ArrayView3, Axis, Zip};
use num::ToPrimitive;

use crate::error::{ensure_shape, MetricError, MetricResult};
use crate::region::count_true;
use crate::suv::{suv_sanity_check, to_suv, PetUnit, SubjectMetadata};
use crate::VoxelSpacing;

/// 获取肝脏最上方 (z 索引最大) 的切片索引. 若掩膜为空则返回 `None`.
pub fn superior_slice(liver_mask: ArrayView3<bool>) -> Option<usize> {
    liver_mask
        .axis_iter(Axis(0))
        .rposition(|sli| sli.iter().any(|p| *p))
}

/// 将排除带半宽 (厘米) 换算为切片数: `round(cm * 10 / z_mm)`.
///
/// `z_mm` 必须为正数. 结果无法用 `usize` 表示时 (如 NaN) 视为 0.
#[inline]
pub fn exclusion_slices(exclusion_cm: f64, z_mm: f64) -> usize {
    (exclusion_cm * 10.0 / z_mm).round().to_usize().unwrap_or(0)
}

/// 计算评估掩膜 `body AND NOT exclusion`.
///
/// 排除带为闭区间 `[sup - n, sup + n]` 上的全部水平切片, 并裁剪到数据范围内.
///
/// # 错误
///
/// - 肝脏掩膜为空: [`MetricError::EmptyMask`];
/// - `spacing[0]` 不是有限正数: [`MetricError::InvalidSpacing`].
pub fn evaluation_mask(
    body_mask: ArrayView3<bool>,
    liver_mask: ArrayView3<bool>,
    spacing: VoxelSpacing,
    exclusion_cm: f64,
) -> MetricResult<Array3<bool>> {
    ensure_shape(body_mask.shape(), liver_mask.shape())?;
    let z_mm = spacing[0];
    if !(z_mm.is_finite() && z_mm > 0.0) {
        return Err(MetricError::InvalidSpacing(z_mm));
    }
    let sup = superior_slice(liver_mask).ok_or(MetricError::EmptyMask("liver"))?;
    let n = exclusion_slices(exclusion_cm, z_mm);

    let len_z = body_mask.len_of(Axis(0));
    let z_min = sup.saturating_sub(n);
    let z_max = sup.saturating_add(n).min(len_z - 1);
    log::debug!("liver dome at slice {sup}, excluding slices {z_min}..={z_max}");

    let mut mask = body_mask.to_owned();
    mask.slice_mut(s![z_min..=z_max, .., ..]).fill(false);
    Ok(mask)
}

/// 在 `mask` 上求 `|pred - gt|` 的平均值. 掩膜为空时返回 `None`.
fn masked_mae(pred: ArrayView3<f32>, gt: ArrayView3<f32>, mask: ArrayView3<bool>) -> Option<f64> {
    let mut count = 0u64;
    let mut sum = 0.0;
    Zip::from(&pred)
        .and(&gt)
        .and(&mask)
        .for_each(|&p, &g, &m| {
            if m {
                count += 1;
                sum += (p as f64 - g as f64).abs();
            }
        });
    (count != 0).then(|| sum / count as f64)
}

/// 全身 SUV MAE.
///
/// 两个体数据先换算为 SUV, 再在评估掩膜 (见 [`evaluation_mask`]) 上求体素级平均绝对误差.
/// 所有输入都是 `(z, h, w)` 的 3D 数据; 动态扫描应由调用方预先取第一帧.
///
/// 排除带覆盖了整个体部时没有体素参与评估, 此时误差为 `0.0`.
/// 开启 `debug` 日志时, 会对换算后的 SUV 做一次 [`suv_sanity_check`].
///
/// # 错误
///
/// - 任意两个数组形状不一致: [`MetricError::ShapeMismatch`];
/// - 肝脏掩膜为空: [`MetricError::EmptyMask`]`("liver")`;
/// - 层间距非法: [`MetricError::InvalidSpacing`].
#[allow(clippy::too_many_arguments)]
pub fn whole_body_mae(
    pred: ArrayView3<f32>,
    gt: ArrayView3<f32>,
    body_mask: ArrayView3<bool>,
    liver_mask: ArrayView3<bool>,
    spacing: VoxelSpacing,
    meta: &SubjectMetadata,
    unit: PetUnit,
    exclusion_cm: f64,
) -> MetricResult<f64> {
    ensure_shape(gt.shape(), pred.shape())?;
    ensure_shape(gt.shape(), body_mask.shape())?;

    let mask = evaluation_mask(body_mask, liver_mask, spacing, exclusion_cm)?;
    let pred = to_suv(pred, meta, unit);
    let gt = to_suv(gt, meta, unit);
    if log::log_enabled!(log::Level::Debug) {
        suv_sanity_check(pred.view(), body_mask, "Prediction");
        suv_sanity_check(gt.view(), body_mask, "Ground Truth");
    }
    log::debug!("whole-body evaluation voxels: {}", count_true(mask.view()));

    Ok(masked_mae(pred.view(), gt.view(), mask.view()).unwrap_or_else(|| {
        log::warn!("exclusion band covers the whole body mask, no voxel evaluated");
        0.0
    }))
}

/// 不做 SUV 换算的体部 MAE, 适用于 CT (HU) 或已归一化的 PET.
///
/// `body_mask` 为空时返回 [`MetricError::EmptyMask`]`("body")`.
pub fn body_mae(
    pred: ArrayView3<f32>,
    gt: ArrayView3<f32>,
    body_mask: ArrayView3<bool>,
) -> MetricResult<f64> {
    ensure_shape(gt.shape(), pred.shape())?;
    ensure_shape(gt.shape(), body_mask.shape())?;
    masked_mae(pred, gt, body_mask).ok_or(MetricError::EmptyMask("body"))
}
