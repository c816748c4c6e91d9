//! 程序运行函数.

use std::path::{Path, PathBuf};

use pet_berry::consts::DEFAULT_SIMULATED_FRAMES;
use pet_berry::metrics::{self, BrainCase};
use pet_berry::prelude::*;
use utils::loader::{self, LoadError, LoadResult};

use crate::args::{Args, Metric};
use crate::result::EvalResult;

/// 一个受试者的全部已加载输入. 分割与元信息按需加载.
struct Subject<'a> {
    args: &'a Args,
    root: Option<PathBuf>,
    config: EvalConfig,
    pred: PetVolume,
    gt: PetVolume,
}

impl<'a> Subject<'a> {
    fn load(args: &'a Args) -> LoadResult<Self> {
        let root = args.root.clone().or_else(loader::data_root_from_env_or_home);
        let resolve = |p: &Path| loader::resolve(root.as_deref(), p);

        let mut config = match &args.config {
            Some(p) => loader::load_config(resolve(p))?,
            None => EvalConfig::default(),
        };
        if let Some(unit) = &args.unit {
            config.unit = unit.parse()?;
        }

        let mut pred = loader::open_pet(resolve(&args.pred))?;
        let mut gt = loader::open_pet(resolve(&args.gt))?;
        if args.test_4d {
            if !pred.is_dynamic() {
                pred = pred.repeat_frames(DEFAULT_SIMULATED_FRAMES);
            }
            if !gt.is_dynamic() {
                gt = gt.repeat_frames(DEFAULT_SIMULATED_FRAMES);
            }
        }

        Ok(Self {
            args,
            root,
            config,
            pred,
            gt,
        })
    }

    fn required(&self, path: &Option<PathBuf>, flag: &'static str) -> LoadResult<PathBuf> {
        match path {
            Some(p) => Ok(loader::resolve(self.root.as_deref(), p)),
            None => Err(LoadError::Io(
                PathBuf::from(flag),
                std::io::Error::new(std::io::ErrorKind::NotFound, "input not given"),
            )),
        }
    }

    fn body(&self) -> LoadResult<SegLabel> {
        loader::open_seg(self.required(&self.args.body, "--body")?)
    }

    fn total(&self) -> LoadResult<SegLabel> {
        loader::open_seg(self.required(&self.args.total, "--total")?)
    }

    fn brain(&self) -> LoadResult<SegLabel> {
        loader::open_seg(self.required(&self.args.brain, "--brain")?)
    }

    fn meta(&self) -> LoadResult<SubjectMetadata> {
        loader::load_metadata(self.required(&self.args.meta, "--meta")?)
    }

    fn whole_body_mae(&self) -> LoadResult<f64> {
        let body = self.body()?.foreground();
        let liver = self.total()?.mask(self.config.liver_label);
        let meta = self.meta()?;
        Ok(whole_body_mae(
            self.pred.static_view(),
            self.gt.static_view(),
            body.view(),
            liver.view(),
            self.pred.pix_dim(),
            &meta,
            self.config.unit,
            self.config.exclusion_cm,
        )?)
    }

    fn body_mae(&self) -> LoadResult<f64> {
        let body = self.body()?.foreground();
        Ok(metrics::body_mae(
            self.pred.static_view(),
            self.gt.static_view(),
            body.view(),
        )?)
    }

    fn brain_outlier(&self) -> LoadResult<f64> {
        let mask = self.brain()?.foreground();
        let case = BrainCase::from_dynamic(self.pred.data(), self.gt.data(), mask.view())?;
        Ok(brain_outlier_score(
            &[case],
            &self.config.outlier_thresholds,
            self.config.auc_points,
        )?)
    }

    fn organ_bias(&self) -> LoadResult<f64> {
        let total = self.total()?;
        let meta = self.meta()?;
        let breakdown = metrics::organ_bias_breakdown(
            self.pred.static_view(),
            self.gt.static_view(),
            total.data(),
            &self.config.organs,
            &meta,
            self.config.unit,
        )?;
        log_breakdown("organ", &breakdown);
        Ok(metrics::mean_bias(&breakdown)?)
    }

    /// 预测不是动态扫描时返回 `Ok(None)`.
    fn tac_bias(&self) -> LoadResult<Option<f64>> {
        if !self.pred.is_dynamic() {
            log::info!("TAC Bias skipped: PET is not dynamic (4D).");
            return Ok(None);
        }
        let total = self.total()?;
        let brain = self.brain()?;
        let durations = self.config.frame_durations(self.pred.frames());
        let breakdown = metrics::tac_bias_breakdown(
            self.pred.dynamic()?,
            self.gt.dynamic()?,
            total.data(),
            brain.data(),
            &durations,
            self.config.aorta_label,
            &self.config.brain_labels,
        )?;
        log_breakdown("tac", &breakdown);
        let score = metrics::mean_bias(&breakdown)?;
        Ok(Some(score))
    }
}

fn log_breakdown(kind: &str, breakdown: &[RegionBias]) {
    if breakdown.is_empty() {
        log::warn!("no {kind} region present in both volumes");
    }
    for r in breakdown {
        log::debug!("{kind} bias `{}`: {:.6}", r.name, r.bias);
    }
}

/// 实际运行.
///
/// 输入无法加载时直接返回 `Err`; 单个评分失败会被记录在结果中, 不影响其它评分.
pub fn run(args: &Args) -> LoadResult<EvalResult> {
    let subject = Subject::load(args)?;
    let mut result = EvalResult::new(&args.subject);

    for metric in args.metrics.iter().copied() {
        let value = match metric {
            Metric::WholeBodyMae => subject.whole_body_mae().map(Some),
            Metric::BrainOutlier => subject.brain_outlier().map(Some),
            Metric::OrganBias => subject.organ_bias().map(Some),
            Metric::TacBias => subject.tac_bias(),
            Metric::BodyMae => subject.body_mae().map(Some),
        };
        match value {
            Ok(Some(v)) => result.push(metric.title(), Ok(v)),
            Ok(None) => {}
            Err(e) => {
                log::error!("{} failed for subject `{}`: {e}", metric.title(), args.subject);
                result.push(metric.title(), Err(e));
            }
        }
    }
    Ok(result)
}

/// 进程退出码: 输入全部加载成功且所有评分都成功时为 0, 否则为 1.
pub fn exit_code(outcome: &LoadResult<EvalResult>) -> u8 {
    match outcome {
        Ok(result) if !result.has_failure() => 0,
        _ => 1,
    }
}
