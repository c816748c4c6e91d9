//! 脑部离群鲁棒性评分.
//!
//! 对队列中每个病例, 统计相对误差小于阈值 `τ` 的有效脑体素比例 `k`;
//! 再把整个队列的 `k` 值代入 `K(x)` 曲线并积分. 最终分数是各个阈值下 AUC 的平均值.

use ndarray::{ArrayView3, ArrayView4, Axis, Zip};

use crate::consts::EPSILON;
use crate::error::{ensure_shape, MetricError, MetricResult};
use crate::region::{relative_error, threshold_curve_auc};

/// 队列中的一个病例. 所有数组按 `(z, h, w)` 组织.
#[derive(Clone, Debug)]
pub struct BrainCase<'a> {
    /// 预测体数据.
    pub pred: ArrayView3<'a, f32>,

    /// 真值体数据.
    pub gt: ArrayView3<'a, f32>,

    /// 脑掩膜.
    pub mask: ArrayView3<'a, bool>,
}

impl<'a> BrainCase<'a> {
    /// 创建病例. 三者形状不一致时返回 [`MetricError::ShapeMismatch`].
    pub fn new(
        pred: ArrayView3<'a, f32>,
        gt: ArrayView3<'a, f32>,
        mask: ArrayView3<'a, bool>,
    ) -> MetricResult<Self> {
        ensure_shape(gt.shape(), pred.shape())?;
        ensure_shape(gt.shape(), mask.shape())?;
        Ok(Self { pred, gt, mask })
    }

    /// 从 `(t, z, h, w)` 动态数据创建病例. 该评分是静态的, 只使用第一个时间帧.
    pub fn from_dynamic(
        pred: ArrayView4<'a, f32>,
        gt: ArrayView4<'a, f32>,
        mask: ArrayView3<'a, bool>,
    ) -> MetricResult<Self> {
        ensure_shape(gt.shape(), pred.shape())?;
        if gt.len_of(Axis(0)) == 0 {
            return Err(MetricError::ShapeMismatch {
                expected: vec![1],
                found: vec![0],
            });
        }
        Self::new(
            pred.index_axis_move(Axis(0), 0),
            gt.index_axis_move(Axis(0), 0),
            mask,
        )
    }
}

/// 计算单个病例的 `k` 值: 有效脑体素中相对误差小于 `threshold` 的比例.
///
/// 有效体素为 `mask ∧ |gt| > ε`. 若不存在有效体素, 则 `k = 0.0`.
/// 这是刻意的语义选择 ("没有数据" 不等于 "全部准确"), 不是错误.
pub fn k_value(case: &BrainCase, threshold: f64) -> f64 {
    let mut valid = 0u64;
    let mut within = 0u64;
    Zip::from(&case.pred)
        .and(&case.gt)
        .and(&case.mask)
        .for_each(|&p, &g, &m| {
            let g = g as f64;
            if m && g.abs() > EPSILON {
                valid += 1;
                if relative_error(p as f64 - g, g, EPSILON) < threshold {
                    within += 1;
                }
            }
        });
    if valid == 0 {
        0.0
    } else {
        within as f64 / valid as f64
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        /// 借助 `rayon`, 并行地计算队列中每个病例的 `k` 值.
        fn cohort_k_values(cases: &[BrainCase], threshold: f64) -> Vec<f64> {
            cases.par_iter().map(|c| k_value(c, threshold)).collect()
        }
    } else {
        /// 计算队列中每个病例的 `k` 值.
        fn cohort_k_values(cases: &[BrainCase], threshold: f64) -> Vec<f64> {
            cases.iter().map(|c| k_value(c, threshold)).collect()
        }
    }
}

/// 脑部离群鲁棒性评分.
///
/// 对每个阈值 `τ ∈ thresholds`, 收集队列的 `k` 值并计算
/// [`threshold_curve_auc`]`(k, num_points)`; 返回各阈值 AUC 的算术平均.
/// 单病例队列同样合法.
///
/// # 错误
///
/// - `cases` 为空: [`MetricError::EmptyCohort`];
/// - `thresholds` 为空: [`MetricError::NoValidRegions`].
pub fn brain_outlier_score(
    cases: &[BrainCase],
    thresholds: &[f64],
    num_points: usize,
) -> MetricResult<f64> {
    if cases.is_empty() {
        return Err(MetricError::EmptyCohort);
    }
    if thresholds.is_empty() {
        return Err(MetricError::NoValidRegions);
    }

    let total: f64 = thresholds
        .iter()
        .map(|&tau| {
            let k = cohort_k_values(cases, tau);
            let auc = threshold_curve_auc(&k, num_points);
            log::debug!("brain outlier tau = {tau}: k = {k:?}, auc = {auc:.6}");
            auc
        })
        .sum();
    Ok(total / thresholds.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{AUC_POINTS, OUTLIER_THRESHOLDS};
    use ndarray::{s, Array3, Array4};

    /// 10x10x10 体数据, 脑掩膜恰好选中 100 个体素.
    fn brain_mask() -> Array3<bool> {
        let mut mask = Array3::from_elem((10, 10, 10), false);
        mask.slice_mut(s![2..6, 2..7, 2..7]).fill(true);
        assert_eq!(mask.iter().filter(|p| **p).count(), 100);
        mask
    }

    #[test]
    fn test_perfect_single_case() {
        let mask = brain_mask();
        let volume = Array3::from_shape_fn((10, 10, 10), |(z, h, w)| (z + h + w + 1) as f32);
        let case = BrainCase::new(volume.view(), volume.view(), mask.view()).unwrap();

        for tau in OUTLIER_THRESHOLDS {
            assert_eq!(k_value(&case, tau), 1.0);
        }
        let score = brain_outlier_score(&[case], &OUTLIER_THRESHOLDS, AUC_POINTS).unwrap();
        assert!((score - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_mask_gives_zero_k() {
        let mask = Array3::from_elem((4, 4, 4), false);
        let volume = Array3::<f32>::ones((4, 4, 4));
        let case = BrainCase::new(volume.view(), volume.view(), mask.view()).unwrap();
        assert_eq!(k_value(&case, 0.05), 0.0);
        let score = brain_outlier_score(&[case], &OUTLIER_THRESHOLDS, AUC_POINTS).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_zero_ground_truth_is_not_valid() {
        let mask = Array3::from_elem((2, 2, 2), true);
        let gt = Array3::<f32>::zeros((2, 2, 2));
        let pred = Array3::<f32>::ones((2, 2, 2));
        let case = BrainCase::new(pred.view(), gt.view(), mask.view()).unwrap();
        assert_eq!(k_value(&case, 0.15), 0.0);
    }

    #[test]
    fn test_k_value_fraction() {
        let mask = brain_mask();
        let gt = Array3::<f32>::from_elem((10, 10, 10), 10.0);
        let mut pred = gt.clone();
        // 20 个体素误差 8%, 20 个体素误差 12%, 其余精确.
        pred.slice_mut(s![2, 2..6, 2..7]).fill(10.8);
        pred.slice_mut(s![3, 2..6, 2..7]).fill(11.2);
        let case = BrainCase::new(pred.view(), gt.view(), mask.view()).unwrap();

        assert!((k_value(&case, 0.05) - 0.6).abs() < 1e-12);
        assert!((k_value(&case, 0.10) - 0.8).abs() < 1e-12);
        assert!((k_value(&case, 0.15) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_frame_only() {
        let mask = brain_mask();
        let gt = Array4::<f32>::from_elem((3, 10, 10, 10), 2.0);
        let mut pred = gt.clone();
        // 后续帧完全错误, 不应影响评分.
        pred.slice_mut(s![1.., .., .., ..]).fill(100.0);
        let case = BrainCase::from_dynamic(pred.view(), gt.view(), mask.view()).unwrap();
        assert_eq!(k_value(&case, 0.05), 1.0);
    }

    #[test]
    fn test_cohort_average() {
        let mask = brain_mask();
        let gt = Array3::<f32>::from_elem((10, 10, 10), 1.0);
        let bad = Array3::<f32>::from_elem((10, 10, 10), 3.0);
        let cases = [
            BrainCase::new(gt.view(), gt.view(), mask.view()).unwrap(),
            BrainCase::new(bad.view(), gt.view(), mask.view()).unwrap(),
        ];
        // k = [1, 0] 对所有阈值 => K(x) = 0.5 (x < 1).
        let score = brain_outlier_score(&cases, &OUTLIER_THRESHOLDS, AUC_POINTS).unwrap();
        assert!((score - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            brain_outlier_score(&[], &OUTLIER_THRESHOLDS, AUC_POINTS),
            Err(MetricError::EmptyCohort)
        );

        let mask = brain_mask();
        let volume = Array3::<f32>::ones((10, 10, 10));
        let case = BrainCase::new(volume.view(), volume.view(), mask.view()).unwrap();
        assert_eq!(
            brain_outlier_score(&[case], &[], AUC_POINTS),
            Err(MetricError::NoValidRegions)
        );

        let small = Array3::<bool>::from_elem((9, 10, 10), true);
        assert!(matches!(
            BrainCase::new(volume.view(), volume.view(), small.view()),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }
}
