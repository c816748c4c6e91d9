//! 单个受试者的评估程序.
//!
//! 读取预测与真值 PET, 以及所需的分割和元信息, 运行选定的评分并打印结果.
//! 任一评分失败时以非零状态退出.

mod args;
mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = args::parse(std::env::args().skip(1));

    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logger: {e}");
    }

    let outcome = runner::run(&args);
    match &outcome {
        Ok(result) => result.analyze(),
        Err(e) => log::error!("subject `{}`: {e}", args.subject),
    }
    ExitCode::from(runner::exit_code(&outcome))
}
