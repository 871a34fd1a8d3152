use chrono::Local;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m\x1b[1m", // 红色
        Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
        Level::Info => "\x1b[32m\x1b[1m",  // 绿色
        Level::Debug => "\x1b[36m\x1b[1m", // 青色
        Level::Trace => "\x1b[90m\x1b[1m", // 灰色
    }
}

/// 初始化日志，级别由 RUST_LOG 控制，默认 info
pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        // HTTP 栈的连接日志太多，默认只看警告
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("eframe", LevelFilter::Warn)
        .parse_env(env_logger::Env::default())
        .format(|buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(
                buf,
                "{}{} {}\x1b[0m [{}:{}] {}",
                time,
                level_color(record.level()),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .init();
}
