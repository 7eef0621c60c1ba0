//! ScanBridge Application
//!
//! 回放录制的扫码器片段，经归一化引擎输出规范扫码事件（JSON行）

mod logging;
mod wire;

use clap::Parser;
use scanbridge_core::CanonicalScanEvent;
use scanbridge_engine::{EngineConfig, NormalizationEngine};
use scanbridge_profiles::{builtin_profiles, ProfileSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use logging::LogLevel;
use wire::WireFragment;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 厂商配置文件（缺省使用内置配置表）
    #[arg(short, long)]
    profiles: Option<PathBuf>,

    /// 回放文件（缺省读取标准输入）
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 配置未声明上限时的流式缓冲上限（字节）
    #[arg(long)]
    max_buffer: Option<usize>,

    /// 日志级别
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// 列出已加载的厂商配置后退出
    #[arg(long)]
    list_profiles: bool,
}

/// 回放统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ReplaySummary {
    lines: usize,
    fragments: usize,
    rejected: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(args.log_level)?;

    let profiles = match &args.profiles {
        Some(path) => ProfileSet::from_file(path)?,
        None => builtin_profiles()?,
    };

    if args.list_profiles {
        for profile in profiles.profiles() {
            println!(
                "{}\t{:?}\t{}",
                profile.name,
                profile.framing_mode,
                profile.actions.join(",")
            );
        }
        return Ok(());
    }

    let mut config = EngineConfig::default();
    if let Some(max_buffer) = args.max_buffer {
        config.default_max_buffer = Some(max_buffer);
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let engine = NormalizationEngine::new(&profiles, config)?.with_event_sink(Arc::new(tx));
    let printer = tokio::spawn(print_events(rx));

    let summary = match &args.input {
        Some(path) => replay(&engine, BufReader::new(File::open(path).await?)).await?,
        None => replay(&engine, BufReader::new(tokio::io::stdin())).await?,
    };

    log_device_stats(&engine);

    // 释放引擎即关闭事件通道
    drop(engine);
    let events = printer.await??;

    info!(
        lines = summary.lines,
        fragments = summary.fragments,
        rejected = summary.rejected,
        events,
        "replay finished"
    );
    Ok(())
}

/// 逐行回放片段；解析失败的行记录后跳过
async fn replay<R>(engine: &NormalizationEngine, reader: R) -> io::Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        summary.lines += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = WireFragment::parse(line).and_then(WireFragment::into_fragment);
        let (seq, fragment) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(line = summary.lines, "{e}");
                summary.rejected += 1;
                continue;
            }
        };

        let device_id = fragment.device_id.clone();
        match seq {
            Some(seq) => {
                engine.submit_sequenced(seq, fragment);
            }
            None => {
                engine.submit(fragment);
            }
        }
        summary.fragments += 1;

        // 同一数据块中的后续扫码
        while engine.poll(&device_id).is_some() {}
    }

    Ok(summary)
}

/// 回放结束时记录各设备的统计
fn log_device_stats(engine: &NormalizationEngine) {
    for device_id in engine.active_devices() {
        if let Some(stats) = engine.device_stats(&device_id) {
            info!(
                device = %device_id,
                received = stats.fragments_received,
                emitted = stats.events_emitted,
                dropped = stats.fragments_dropped,
                drop_rate = stats.get_drop_rate(),
                overflows = stats.overflow_count,
                skipped = stats.sequences_skipped,
                "device statistics"
            );
        }
    }
}

/// 把规范事件逐行写到标准输出
async fn print_events(mut rx: mpsc::UnboundedReceiver<CanonicalScanEvent>) -> io::Result<usize> {
    let mut stdout = tokio::io::stdout();
    let mut count = 0;

    while let Some(event) = rx.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        count += 1;
    }

    stdout.flush().await?;
    Ok(count)
}
