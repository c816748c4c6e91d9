//! 对 `pet-berry` 数据读取的更一层封装. 统一错误类型, 并提供元信息与配置的加载.

use pet_berry::data::OpenVolumeError;
use pet_berry::{EvalConfig, MetricError, PetVolume, SegLabel, SubjectMetadata};
use std::env;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// 加载评估输入时的错误.
#[derive(Debug)]
pub enum LoadError {
    /// 底层 I/O 错误.
    Io(PathBuf, std::io::Error),

    /// 打开 nifti 文件错误.
    Volume(PathBuf, OpenVolumeError),

    /// JSON 解析错误 (包括缺少必需字段).
    Json(PathBuf, serde_json::Error),

    /// 输入本身合法, 但不满足评分要求.
    Metric(MetricError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(p, e) => write!(f, "failed to open {}: {e}", p.display()),
            Self::Volume(p, e) => write!(f, "failed to load {}: {e}", p.display()),
            Self::Json(p, e) => write!(f, "failed to parse {}: {e}", p.display()),
            Self::Metric(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<MetricError> for LoadError {
    fn from(value: MetricError) -> Self {
        Self::Metric(value)
    }
}

/// 加载结果.
pub type LoadResult<T> = Result<T, LoadError>;

/// 获取评估数据根目录.
///
/// 1. 若环境变量 `$PET_EVAL_ROOT` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/pet`. 若无法确定主目录则返回 `None`.
pub fn data_root_from_env_or_home() -> Option<PathBuf> {
    match env::var("PET_EVAL_ROOT") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => {
            let mut ans = dirs::home_dir()?;
            ans.extend(["dataset", "pet"]);
            Some(ans)
        }
    }
}

/// 将相对路径解析到数据根目录下. 绝对路径保持不变.
pub fn resolve<P: AsRef<Path>>(root: Option<&Path>, path: P) -> PathBuf {
    let path = path.as_ref();
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// 打开 3D/4D PET 扫描.
pub fn open_pet<P: AsRef<Path>>(path: P) -> LoadResult<PetVolume> {
    let path = path.as_ref();
    log::debug!("loading pet volume {}", path.display());
    PetVolume::open(path).map_err(|e| LoadError::Volume(path.to_path_buf(), e))
}

/// 打开 3D 分割.
pub fn open_seg<P: AsRef<Path>>(path: P) -> LoadResult<SegLabel> {
    let path = path.as_ref();
    let seg = SegLabel::open(path).map_err(|e| LoadError::Volume(path.to_path_buf(), e))?;
    log::debug!("loaded segmentation {} of shape {:?}", path.display(), seg.shape());
    Ok(seg)
}

/// 读取 JSON 文件并反序列化.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> LoadResult<T> {
    let file = File::open(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| LoadError::Json(path.to_path_buf(), e))
}

/// 读取受试者元信息 JSON. 文件需包含 `PatientWeight` (kg) 与 `InjectedRadioactivity` (MBq).
///
/// 缺少字段或数值非法都会在进入核心评分之前报错.
pub fn load_metadata<P: AsRef<Path>>(path: P) -> LoadResult<SubjectMetadata> {
    read_json(path.as_ref())
}

/// 读取评估配置 JSON. 未给出的字段使用默认值.
pub fn load_config<P: AsRef<Path>>(path: P) -> LoadResult<EvalConfig> {
    read_json(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_berry::PetUnit;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("pet-eval-{}-{name}", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_metadata() {
        let p = write_temp(
            "constants.json",
            r#"{"PatientWeight": 72.5, "InjectedRadioactivity": 250.0, "Other": 1}"#,
        );
        let meta = load_metadata(&p).unwrap();
        assert_eq!(meta.weight_kg(), 72.5);
        assert_eq!(meta.dose_mbq(), 250.0);
        std::fs::remove_file(p).unwrap();
    }

    #[test]
    fn test_load_metadata_missing_key() {
        let p = write_temp("missing.json", r#"{"PatientWeight": 72.5}"#);
        assert!(matches!(load_metadata(&p), Err(LoadError::Json(..))));
        std::fs::remove_file(p).unwrap();

        let nowhere = env::temp_dir().join("pet-eval-definitely-not-here.json");
        assert!(matches!(load_metadata(nowhere), Err(LoadError::Io(..))));
    }

    #[test]
    fn test_load_config() {
        let p = write_temp("config.json", r#"{"unit": "Bq", "brain_labels": [3]}"#);
        let cfg = load_config(&p).unwrap();
        assert_eq!(cfg.unit, PetUnit::Bq);
        assert_eq!(cfg.brain_labels, vec![3]);
        assert_eq!(cfg.organs, EvalConfig::default().organs);
        std::fs::remove_file(p).unwrap();
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/data");
        assert_eq!(resolve(Some(root), "a.nii.gz"), PathBuf::from("/data/a.nii.gz"));
        assert_eq!(resolve(Some(root), "/abs/a.nii.gz"), PathBuf::from("/abs/a.nii.gz"));
        assert_eq!(resolve(None, "a.nii.gz"), PathBuf::from("a.nii.gz"));
    }
}
