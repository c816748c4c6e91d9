//! 评估结果.

use std::io::{self, Write};
use utils::loader::LoadError;

/// 单个受试者的评估结果. 按评分运行顺序保存.
pub struct EvalResult {
    subject: String,
    data: Vec<(&'static str, Result<f64, LoadError>)>,
}

impl EvalResult {
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            data: Vec::with_capacity(4),
        }
    }

    pub fn push(&mut self, title: &'static str, value: Result<f64, LoadError>) {
        self.data.push((title, value));
    }

    /// 是否有评分失败.
    pub fn has_failure(&self) -> bool {
        self.data.iter().any(|(_, r)| r.is_err())
    }

    /// 评分结果, 失败的评分为 `None`.
    #[cfg(test)]
    pub fn get(&self, title: &str) -> Option<Option<f64>> {
        self.data
            .iter()
            .find(|(t, _)| *t == title)
            .map(|(_, r)| r.as_ref().ok().copied())
    }

    /// 将结果写进 `w` 中.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        utils::sep_to(&mut *w)?;
        if self.subject.is_empty() {
            writeln!(w, "Evaluation results:")?;
        } else {
            writeln!(w, "Evaluation results for `{}`:", self.subject)?;
        }
        for (title, value) in self.data.iter() {
            match value {
                Ok(v) => writeln!(w, "{S4}{title:<25}: {v:.6}")?,
                Err(e) => writeln!(w, "{S4}{title:<25}: failed ({e})")?,
            }
        }
        utils::sep_to(&mut *w)
    }

    /// 打印结果.
    pub fn analyze(&self) {
        let stdout = io::stdout();
        if let Err(e) = self.describe_into(&mut stdout.lock()) {
            log::error!("failed to print results: {e}");
        }
    }
}
