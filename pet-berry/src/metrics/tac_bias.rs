//! 动态扫描的 TAC 积分偏差.
//!
//! 主动脉区域作为血池输入函数的代理, 另加若干脑分区. 每个区域先求积分 TAC,
//! 再计算预测相对真值的偏差. 该评分直接使用活度浓度, 不做 SUV 换算.

use ndarray::{ArrayView3, ArrayView4, Axis};

use super::{mean_bias, RegionBias};
use crate::consts::EPSILON;
use crate::error::{ensure_len, ensure_shape, MetricResult};
use crate::region::{count_true, label_mask, region_tac, relative_bias};

/// 计算单个区域的积分 TAC 偏差. 区域为空时返回 `Ok(None)`.
fn region_bias(
    pred: ArrayView4<f32>,
    gt: ArrayView4<f32>,
    mask: ArrayView3<bool>,
    durations: &[f64],
    name: String,
) -> MetricResult<Option<RegionBias>> {
    if count_true(mask) == 0 {
        return Ok(None);
    }
    let auc_pred = region_tac(pred, mask, durations)?;
    let auc_gt = region_tac(gt, mask, durations)?;
    let bias = relative_bias(auc_pred, auc_gt, EPSILON);
    log::debug!("tac region `{name}`: auc pred {auc_pred:.4}, gt {auc_gt:.4}, bias {bias:.6}");
    Ok(Some(RegionBias { name, bias }))
}

/// 逐区域计算积分 TAC 偏差. 顺序为主动脉 (`"aorta"`), 然后按 `brain_labels`
/// 顺序的脑分区 (`"brain-<label>"`). 空区域会被跳过, 结果可能为空.
///
/// `pred` 与 `gt` 按 `(t, z, h, w)` 组织, 两个分割按 `(z, h, w)` 组织.
///
/// # 错误
///
/// 体数据形状不一致, 帧数与 `durations` 长度不一致, 或空间形状与分割不一致时,
/// 返回 [`MetricError::ShapeMismatch`](crate::MetricError::ShapeMismatch).
#[allow(clippy::too_many_arguments)]
pub fn tac_bias_breakdown(
    pred: ArrayView4<f32>,
    gt: ArrayView4<f32>,
    total_seg: ArrayView3<i32>,
    brain_seg: ArrayView3<i32>,
    durations: &[f64],
    aorta_label: i32,
    brain_labels: &[i32],
) -> MetricResult<Vec<RegionBias>> {
    ensure_shape(gt.shape(), pred.shape())?;
    ensure_len(durations.len(), gt.len_of(Axis(0)))?;
    let spatial = &gt.shape()[1..];
    ensure_shape(spatial, total_seg.shape())?;
    ensure_shape(spatial, brain_seg.shape())?;

    let mut ans = Vec::with_capacity(brain_labels.len() + 1);

    let aorta = label_mask(total_seg, aorta_label);
    ans.extend(region_bias(pred, gt, aorta.view(), durations, "aorta".to_string())?);

    for &label in brain_labels {
        let mask = label_mask(brain_seg, label);
        ans.extend(region_bias(
            pred,
            gt,
            mask.view(),
            durations,
            format!("brain-{label}"),
        )?);
    }
    Ok(ans)
}

/// TAC 偏差评分: 各区域积分 TAC 相对偏差的算术平均.
///
/// 若主动脉与所有脑分区都不存在, 则返回
/// [`MetricError::NoValidRegions`](crate::MetricError::NoValidRegions).
pub fn tac_bias(
    pred: ArrayView4<f32>,
    gt: ArrayView4<f32>,
    total_seg: ArrayView3<i32>,
    brain_seg: ArrayView3<i32>,
    durations: &[f64],
    aorta_label: i32,
    brain_labels: &[i32],
) -> MetricResult<f64> {
    mean_bias(&tac_bias_breakdown(
        pred,
        gt,
        total_seg,
        brain_seg,
        durations,
        aorta_label,
        brain_labels,
    )?)
}
