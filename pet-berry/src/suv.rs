//! SUV (Standardized Uptake Value) 归一化.
//!
//! `SUV = 活度浓度 * 体重 (kg) / (注射剂量 (MBq) * 单位换算系数)`.

use std::str::FromStr;

use ndarray::{Array, ArrayView, ArrayView3, Dimension};

use crate::consts::SUV_SANE_RANGE;
use crate::error::MetricError;
use crate::region::region_mean;

/// PET 活度浓度的存储单位.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PetUnit {
    /// kBq/mL. 挑战赛最终数据使用该单位.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "kBq"))]
    KBq,

    /// Bq/mL. 训练数据使用该单位.
    #[cfg_attr(feature = "serde", serde(rename = "Bq"))]
    Bq,
}

impl PetUnit {
    /// 在体重/剂量归一化之前施加的固定换算系数.
    #[inline]
    pub const fn scale(&self) -> f64 {
        match self {
            Self::KBq => 1e3,
            Self::Bq => 1e6,
        }
    }
}

impl FromStr for PetUnit {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kBq" => Ok(Self::KBq),
            "Bq" => Ok(Self::Bq),
            other => Err(MetricError::InvalidUnit(other.to_string())),
        }
    }
}

/// 受试者元信息. 同一受试者的所有 SUV 换算共享同一份实例.
///
/// 该结构是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "RawMetadata")
)]
pub struct SubjectMetadata {
    weight_kg: f64,
    dose_mbq: f64,
}

/// 元信息 JSON 的原始字段.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawMetadata {
    #[serde(rename = "PatientWeight")]
    weight_kg: f64,

    #[serde(rename = "InjectedRadioactivity")]
    dose_mbq: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMetadata> for SubjectMetadata {
    type Error = MetricError;

    fn try_from(raw: RawMetadata) -> Result<Self, Self::Error> {
        Self::new(raw.weight_kg, raw.dose_mbq).ok_or(MetricError::InvalidMetadata)
    }
}

impl SubjectMetadata {
    /// 构建元信息. `weight_kg` 为患者体重 (千克), `dose_mbq` 为注射剂量 (MBq).
    ///
    /// 两者都必须是有限正数, 否则返回 `None`.
    pub fn new(weight_kg: f64, dose_mbq: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(weight_kg) && valid(dose_mbq)).then_some(Self {
            weight_kg,
            dose_mbq,
        })
    }

    /// 患者体重, 千克.
    #[inline]
    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    /// 注射剂量, MBq.
    #[inline]
    pub fn dose_mbq(&self) -> f64 {
        self.dose_mbq
    }
}

/// 活度浓度到 SUV 的乘法系数.
#[inline]
pub fn norm_factor(meta: &SubjectMetadata, unit: PetUnit) -> f64 {
    meta.weight_kg / (meta.dose_mbq * unit.scale())
}

/// 将活度浓度体数据逐元素换算为 SUV. 对 3D 和 4D 数据均适用.
pub fn to_suv<D: Dimension>(
    volume: ArrayView<f32, D>,
    meta: &SubjectMetadata,
    unit: PetUnit,
) -> Array<f32, D> {
    let factor = norm_factor(meta, unit);
    volume.mapv(|v| (v as f64 * factor) as f32)
}

/// 诊断用: 检查体内平均 SUV 的量级.
///
/// 平均值以 `debug` 级别记录; 若不在 `[0.01, 50]` 内, 则以 `warn` 级别提示单位或归一化可能有误.
/// 返回体内平均 SUV, 若 `body_mask` 为空则返回 `None`. 该函数不会修改任何数据.
pub fn suv_sanity_check(
    suv: ArrayView3<f32>,
    body_mask: ArrayView3<bool>,
    name: &str,
) -> Option<f64> {
    let mean = region_mean(suv, body_mask)?;
    log::debug!("{name} mean SUV (body): {mean:.4}");
    if !SUV_SANE_RANGE.contains(&mean) {
        log::warn!("{name} SUV mean {mean:.4} appears incorrect. Check PET units or normalization.");
    }
    Some(mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    fn meta() -> SubjectMetadata {
        SubjectMetadata::new(70.0, 350.0).unwrap()
    }

    #[test]
    fn test_metadata_invalid_input() {
        assert!(SubjectMetadata::new(0.0, 1.0).is_none());
        assert!(SubjectMetadata::new(70.0, -1.0).is_none());
        assert!(SubjectMetadata::new(f64::NAN, 1.0).is_none());
        assert!(SubjectMetadata::new(70.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("kBq".parse::<PetUnit>(), Ok(PetUnit::KBq));
        assert_eq!("Bq".parse::<PetUnit>(), Ok(PetUnit::Bq));
        assert_eq!(
            "MBq".parse::<PetUnit>(),
            Err(MetricError::InvalidUnit("MBq".to_string()))
        );
        assert_eq!(PetUnit::KBq.scale(), 1e3);
        assert_eq!(PetUnit::Bq.scale(), 1e6);
    }

    #[test]
    fn test_suv_round_trip() {
        let volume = Array3::from_shape_fn((3, 4, 5), |(z, h, w)| (z * 20 + h * 5 + w) as f32 * 7.5);
        for unit in [PetUnit::KBq, PetUnit::Bq] {
            let suv = to_suv(volume.view(), &meta(), unit);
            let factor = 70.0 / (350.0 * unit.scale());
            assert!(float_eq(norm_factor(&meta(), unit), factor));
            for (s, v) in suv.iter().zip(volume.iter()) {
                assert!(float_eq(*s as f64 / factor, *v as f64));
            }
        }
    }

    #[test]
    fn test_suv_keeps_dimensionality() {
        let volume = Array4::<f32>::from_elem((2, 2, 2, 2), 5000.0);
        let suv = to_suv(volume.view(), &meta(), PetUnit::KBq);
        assert_eq!(suv.shape(), &[2, 2, 2, 2]);
        assert!(suv.iter().all(|v| float_eq(*v as f64, 1.0)));
    }

    #[test]
    fn test_sanity_check() {
        let _ = simple_logger::SimpleLogger::new().init();

        let suv = Array3::<f32>::from_elem((2, 2, 2), 1.2);
        let mut body = Array3::from_elem((2, 2, 2), false);
        assert_eq!(suv_sanity_check(suv.view(), body.view(), "empty"), None);

        body[(0, 0, 0)] = true;
        let mean = suv_sanity_check(suv.view(), body.view(), "pred").unwrap();
        assert!(float_eq(mean, 1.2));

        // 超出合理区间也只是警告, 不改变返回值.
        let huge = suv.mapv(|v| v * 1000.0);
        let mean = suv_sanity_check(huge.view(), body.view(), "gt").unwrap();
        assert!(float_eq(mean, 1200.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_metadata_from_json() {
        let meta: SubjectMetadata =
            serde_json::from_str(r#"{"PatientWeight": 70.0, "InjectedRadioactivity": 350.0}"#)
                .unwrap();
        assert_eq!(meta, self::meta());

        let err = serde_json::from_str::<SubjectMetadata>(
            r#"{"PatientWeight": 0.0, "InjectedRadioactivity": 350.0}"#,
        );
        assert!(err.is_err());

        let missing = serde_json::from_str::<SubjectMetadata>(r#"{"PatientWeight": 70.0}"#);
        assert!(missing.is_err());

        let unit: PetUnit = serde_json::from_str(r#""Bq""#).unwrap();
        assert_eq!(unit, PetUnit::Bq);
    }
}
