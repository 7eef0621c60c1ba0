//! 事件输出与诊断输出
//!
//! 引擎不关心事件如何显示或持久化，只交给外部协作者

use scanbridge_core::{CanonicalScanEvent, ScanError};
use tokio::sync::mpsc;
use tracing::warn;

/// 规范事件输出接口
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &CanonicalScanEvent);
}

/// 诊断输出接口：接收每个被丢弃片段的错误
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, device_id: &str, error: &ScanError);
}

/// 回调形式的事件输出
pub struct CallbackSink<F>(pub F);

impl<F> EventSink for CallbackSink<F>
where
    F: Fn(&CanonicalScanEvent) + Send + Sync,
{
    fn deliver(&self, event: &CanonicalScanEvent) {
        (self.0)(event)
    }
}

impl EventSink for mpsc::UnboundedSender<CanonicalScanEvent> {
    fn deliver(&self, event: &CanonicalScanEvent) {
        if self.send(event.clone()).is_err() {
            warn!(device = %event.device_id, "event receiver closed, scan event dropped");
        }
    }
}

/// 默认诊断输出：写入tracing日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, device_id: &str, error: &ScanError) {
        warn!(device = %device_id, kind = error.kind(), "fragment dropped: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanbridge_core::Symbology;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> CanonicalScanEvent {
        CanonicalScanEvent {
            device_id: "d".to_string(),
            profile: "p".to_string(),
            text: "ABC".to_string(),
            symbology: Symbology::Unknown,
        }
    }

    #[test]
    fn test_callback_sink() {
        let count = AtomicUsize::new(0);
        let sink = CallbackSink(|e: &CanonicalScanEvent| {
            assert_eq!(e.text, "ABC");
            count.fetch_add(1, Ordering::SeqCst);
        });
        sink.deliver(&event());
        sink.deliver(&event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.deliver(&event());
    }
}
