//! 区域统计与曲线积分等共用数值原语.

use itertools::Itertools;
use ndarray::{Array3, ArrayView3, ArrayView4, Axis, Zip};

use crate::error::{ensure_len, ensure_shape, MetricResult};

/// 带 ε 保护的相对误差: `|numerator| / (|denominator| + eps)`.
///
/// 所有评分共享这一个实现, 以保证 ε 策略一致.
#[inline]
pub fn relative_error(numerator: f64, denominator: f64, eps: f64) -> f64 {
    numerator.abs() / (denominator.abs() + eps)
}

/// 相对偏差 `|pred - gt| / (|gt| + eps)`. 分母始终是第二个参数 (真值).
#[inline]
pub fn relative_bias(pred: f64, gt: f64, eps: f64) -> f64 {
    relative_error(pred - gt, gt, eps)
}

/// 获取 `seg` 中值为 `label` 的区域掩膜.
pub fn label_mask(seg: ArrayView3<i32>, label: i32) -> Array3<bool> {
    seg.mapv(|p| p == label)
}

/// 获取 `seg` 中所有正值体素构成的掩膜.
pub fn foreground_mask(seg: ArrayView3<i32>) -> Array3<bool> {
    seg.mapv(|p| p > 0)
}

/// 统计掩膜中为真的体素个数.
#[inline]
pub fn count_true(mask: ArrayView3<bool>) -> usize {
    mask.iter().filter(|p| **p).count()
}

/// 计算 `volume` 在 `mask` 为真的体素上的平均值. 若掩膜为空, 则返回 `None`.
///
/// 两者形状不一致时程序 panic.
pub fn region_mean(volume: ArrayView3<f32>, mask: ArrayView3<bool>) -> Option<f64> {
    let mut count = 0u64;
    let mut sum = 0.0;
    Zip::from(&volume).and(&mask).for_each(|&v, &m| {
        if m {
            count += 1;
            sum += v as f64;
        }
    });
    (count != 0).then(|| sum / count as f64)
}

/// 时间积分活度: `Σ tac[t] * durations[t]`.
///
/// 长度不一致时返回 [`MetricError::ShapeMismatch`](crate::MetricError::ShapeMismatch).
pub fn time_integrated_activity(tac: &[f64], durations: &[f64]) -> MetricResult<f64> {
    ensure_len(durations.len(), tac.len())?;
    Ok(tac.iter().zip(durations).map(|(a, d)| a * d).sum())
}

/// 计算单个区域的积分 TAC (即 TAC 曲线下面积).
///
/// `volume` 按 `(t, z, h, w)` 组织. 每一帧都在 `mask` 上求平均, 再按 `durations` 加权求和.
///
/// # 注意
///
/// 该函数不检查掩膜是否为空. 空掩膜时每帧均值为 NaN, 调用方应事先过滤空区域.
pub fn region_tac(
    volume: ArrayView4<f32>,
    mask: ArrayView3<bool>,
    durations: &[f64],
) -> MetricResult<f64> {
    let (_, z, h, w) = volume.dim();
    ensure_shape(&[z, h, w], mask.shape())?;
    ensure_len(durations.len(), volume.len_of(Axis(0)))?;

    let tac: Vec<f64> = volume
        .axis_iter(Axis(0))
        .map(|frame| region_mean(frame, mask).unwrap_or(f64::NAN))
        .collect();
    time_integrated_activity(&tac, durations)
}

/// 在 `[0, 1]` 上生成 `n` 个等距采样点, 包含两个端点. 最后一个点恰好为 `1.0`.
fn linspace01(n: usize) -> impl ExactSizeIterator<Item = f64> {
    let step = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if n > 1 && i == n - 1 { 1.0 } else { i as f64 * step })
}

/// 阈值扫描曲线下面积.
///
/// 构建非增阶梯函数 `K(x) = values 中大于 x 的比例`, 在 `[0, 1]` 上等距采样 `num_points`
/// 个点 (含端点), 并用梯形公式积分.
///
/// 若 `values` 为空或 `num_points < 2`, 则返回 `0.0`.
pub fn threshold_curve_auc(values: &[f64], num_points: usize) -> f64 {
    if values.is_empty() || num_points < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    linspace01(num_points)
        .map(|x| (x, values.iter().filter(|v| **v > x).count() as f64 / n))
        .tuple_windows()
        .map(|((x0, k0), (x1, k1))| (x1 - x0) * (k0 + k1) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{AUC_POINTS, EPSILON};
    use crate::MetricError;
    use ndarray::{Array3, Array4};

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_relative_error_denominator() {
        assert!(float_eq(relative_error(-3.0, 2.0, 0.0), 1.5));
        assert!(float_eq(relative_bias(2.0, 1.0, EPSILON), 1.0 / (1.0 + EPSILON)));
        // 分母总是第二个参数.
        assert!(float_eq(relative_bias(1.0, 2.0, EPSILON), 1.0 / (2.0 + EPSILON)));
        assert!(!float_eq(relative_bias(2.0, 1.0, 0.0), relative_bias(1.0, 2.0, 0.0)));
        // 真值为 0 时由 ε 兜底.
        assert!(relative_bias(1.0, 0.0, EPSILON).is_finite());
    }

    #[test]
    fn test_time_integrated_activity() {
        let tac = [1.0, 2.0, 3.0];
        let durations = [4.0, 4.0, 2.0];
        assert!(float_eq(
            time_integrated_activity(&tac, &durations).unwrap(),
            18.0
        ));
        assert_eq!(
            time_integrated_activity(&tac, &durations[..2]),
            Err(MetricError::ShapeMismatch {
                expected: vec![2],
                found: vec![3],
            })
        );
        assert!(float_eq(time_integrated_activity(&[], &[]).unwrap(), 0.0));
    }

    #[test]
    fn test_region_mean() {
        let volume = Array3::from_shape_fn((2, 2, 2), |(z, _, _)| z as f32 + 1.0);
        let mut mask = Array3::from_elem((2, 2, 2), false);
        assert_eq!(region_mean(volume.view(), mask.view()), None);

        mask[(0, 0, 0)] = true;
        mask[(1, 1, 1)] = true;
        assert!(float_eq(region_mean(volume.view(), mask.view()).unwrap(), 1.5));
    }

    #[test]
    fn test_region_tac() {
        // 每帧数值等于帧号 + 1.
        let volume = Array4::from_shape_fn((3, 2, 2, 2), |(t, _, _, _)| t as f32 + 1.0);
        let mut mask = Array3::from_elem((2, 2, 2), false);
        mask[(1, 0, 1)] = true;

        let auc = region_tac(volume.view(), mask.view(), &[1.0, 2.0, 3.0]).unwrap();
        assert!(float_eq(auc, 1.0 + 4.0 + 9.0));

        assert!(matches!(
            region_tac(volume.view(), mask.view(), &[1.0, 2.0]),
            Err(MetricError::ShapeMismatch { .. })
        ));
        let wrong = Array3::from_elem((2, 2, 3), true);
        assert!(matches!(
            region_tac(volume.view(), wrong.view(), &[1.0, 2.0, 3.0]),
            Err(MetricError::ShapeMismatch { .. })
        ));

        // 空掩膜不做保护, 结果为 NaN.
        let empty = Array3::from_elem((2, 2, 2), false);
        assert!(region_tac(volume.view(), empty.view(), &[1.0, 2.0, 3.0])
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_masks() {
        let seg = Array3::from_shape_fn((2, 3, 4), |(z, h, w)| (z + h + w) as i32 % 3 - 1);
        let fg = foreground_mask(seg.view());
        let ones = label_mask(seg.view(), 1);
        assert_eq!(fg, ones);
        assert_eq!(count_true(fg.view()), seg.iter().filter(|p| **p > 0).count());
        assert_eq!(count_true(label_mask(seg.view(), 7).view()), 0);
    }

    #[test]
    fn test_auc_constant_curves() {
        // K(x) = 1 on [0, 1), 0 at x = 1.
        let auc = threshold_curve_auc(&[1.0; 4], AUC_POINTS);
        assert!((auc - 1.0).abs() < 1e-3);
        assert!(auc <= 1.0);

        assert!(float_eq(threshold_curve_auc(&[0.0; 4], AUC_POINTS), 0.0));
        assert!(float_eq(threshold_curve_auc(&[], AUC_POINTS), 0.0));
        assert!(float_eq(threshold_curve_auc(&[1.0], 1), 0.0));
    }

    #[test]
    fn test_linspace_endpoints() {
        assert_eq!(linspace01(1).collect::<Vec<_>>(), vec![0.0]);
        assert_eq!(linspace01(0).count(), 0);
        for n in [2, 3, 50, 99, 104, AUC_POINTS] {
            let xs: Vec<f64> = linspace01(n).collect();
            assert_eq!(xs.len(), n);
            assert_eq!(xs[0], 0.0);
            assert_eq!(xs[n - 1], 1.0);
            assert!(xs.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_auc_value_at_one_excluded_at_endpoint() {
        // K(1) = 0: 最后一段梯形只有一半面积.
        assert!(float_eq(threshold_curve_auc(&[1.0], 50), 48.5 / 49.0));
        assert!(float_eq(threshold_curve_auc(&[1.0], AUC_POINTS), 998.5 / 999.0));
    }

    #[test]
    fn test_auc_bounds() {
        let values = [0.0, 0.13, 0.5, 0.77, 0.999, 1.0, 0.42];
        for n in [2, 3, 10, 101, AUC_POINTS] {
            let auc = threshold_curve_auc(&values, n);
            assert!((0.0..=1.0).contains(&auc), "auc {auc} out of range");
        }
    }

    #[test]
    fn test_auc_approximates_mean() {
        // 对 [0, 1] 内的值, K(x) 的积分约等于平均值.
        let values = [0.25, 0.5, 0.75];
        let auc = threshold_curve_auc(&values, AUC_POINTS);
        assert!((auc - 0.5).abs() < 2e-3);

        // 两个采样点: x = 0, 1.
        assert!(float_eq(threshold_curve_auc(&values, 2), 0.5));
    }
}
