//! 命令行参数.

use std::path::PathBuf;
use std::process;

/// 可单独运行的评分.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Metric {
    /// 全身 SUV MAE.
    WholeBodyMae,

    /// 脑部离群评分.
    BrainOutlier,

    /// 器官偏差.
    OrganBias,

    /// TAC 偏差 (仅动态扫描).
    TacBias,

    /// 体部掩膜内的原始活度 MAE, 不做 SUV 换算. 只能单独指定.
    BodyMae,
}

impl Metric {
    /// `--all` 运行的评分, 按输出顺序排列.
    pub const ALL: [Metric; 4] = [
        Self::WholeBodyMae,
        Self::BrainOutlier,
        Self::OrganBias,
        Self::TacBias,
    ];

    /// 命令行中的名字.
    pub fn key(&self) -> &'static str {
        match self {
            Self::WholeBodyMae => "whole_body_mae",
            Self::BrainOutlier => "brain_outlier",
            Self::OrganBias => "organ_bias",
            Self::TacBias => "tac_bias",
            Self::BodyMae => "body_mae",
        }
    }

    /// 输出中的名字.
    pub fn title(&self) -> &'static str {
        match self {
            Self::WholeBodyMae => "Whole-body SUV MAE",
            Self::BrainOutlier => "Brain Outlier Score",
            Self::OrganBias => "Organ Bias",
            Self::TacBias => "TAC Bias",
            Self::BodyMae => "Body MAE",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .chain([Self::BodyMae])
            .find(|m| m.key() == key)
    }
}

/// 解析后的命令行参数.
#[derive(Debug, Default)]
pub struct Args {
    /// 受试者标识, 仅用于输出.
    pub subject: String,

    /// 相对路径的根目录.
    pub root: Option<PathBuf>,

    /// 预测 PET.
    pub pred: PathBuf,

    /// 真值 PET.
    pub gt: PathBuf,

    /// 体部分割.
    pub body: Option<PathBuf>,

    /// 全身器官分割.
    pub total: Option<PathBuf>,

    /// 脑分区分割.
    pub brain: Option<PathBuf>,

    /// 受试者元信息 JSON.
    pub meta: Option<PathBuf>,

    /// 评估配置 JSON.
    pub config: Option<PathBuf>,

    /// 单位, 覆盖配置文件.
    pub unit: Option<String>,

    /// 要运行的评分.
    pub metrics: Vec<Metric>,

    /// 将静态扫描重复若干帧以模拟动态扫描.
    pub test_4d: bool,

    /// 输出调试信息 (包括 SUV 合理性检查).
    pub debug: bool,
}

fn exit_with_help() -> ! {
    print!(
        "\
Usage: evaluate [options] --pred pred.nii.gz --gt gt.nii.gz
options:
--subject id : subject identifier shown in the report
--root dir : directory for relative paths (default $PET_EVAL_ROOT or $HOME/dataset/pet)
--body path : body segmentation (whole_body_mae, body_mae)
--total path : TotalSegmentator segmentation (whole_body_mae, organ_bias, tac_bias)
--brain path : SynthSeg parcellation (brain_outlier, tac_bias)
--meta path : JSON with PatientWeight and InjectedRadioactivity
--config path : evaluation config JSON
--pet-unit unit : kBq or Bq (default kBq)
--all : run all metrics (default)
--metric name : run one metric: whole_body_mae, brain_outlier, organ_bias, tac_bias, body_mae
--test-4d : simulate a dynamic scan by repeating the static volume
--debug : enable debug output
"
    );
    process::exit(1);
}

fn next_value(it: &mut impl Iterator<Item = String>, flag: &str) -> String {
    it.next().unwrap_or_else(|| {
        eprintln!("missing value for {flag}");
        exit_with_help();
    })
}

/// 解析命令行. 参数非法时打印帮助并退出.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut ans = Args::default();
    let mut pred = None;
    let mut gt = None;
    let mut it = args.into_iter();

    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--subject" => ans.subject = next_value(&mut it, &flag),
            "--root" => ans.root = Some(next_value(&mut it, &flag).into()),
            "--pred" => pred = Some(next_value(&mut it, &flag).into()),
            "--gt" => gt = Some(next_value(&mut it, &flag).into()),
            "--body" => ans.body = Some(next_value(&mut it, &flag).into()),
            "--total" => ans.total = Some(next_value(&mut it, &flag).into()),
            "--brain" => ans.brain = Some(next_value(&mut it, &flag).into()),
            "--meta" => ans.meta = Some(next_value(&mut it, &flag).into()),
            "--config" => ans.config = Some(next_value(&mut it, &flag).into()),
            "--pet-unit" => ans.unit = Some(next_value(&mut it, &flag)),
            "--all" | "-all" => ans.metrics = Metric::ALL.to_vec(),
            "--metric" | "-specific_metric" => {
                let key = next_value(&mut it, &flag);
                let Some(m) = Metric::from_key(&key) else {
                    eprintln!("unknown metric: {key}");
                    exit_with_help();
                };
                if !ans.metrics.contains(&m) {
                    ans.metrics.push(m);
                }
            }
            "--test-4d" => ans.test_4d = true,
            "--debug" => ans.debug = true,
            "-h" | "--help" => exit_with_help(),
            other => {
                eprintln!("unknown option: {other}");
                exit_with_help();
            }
        }
    }

    let (Some(pred), Some(gt)) = (pred, gt) else {
        eprintln!("--pred and --gt are required");
        exit_with_help();
    };
    ans.pred = pred;
    ans.gt = gt;
    if ans.metrics.is_empty() {
        ans.metrics = Metric::ALL.to_vec();
    }
    ans
}
