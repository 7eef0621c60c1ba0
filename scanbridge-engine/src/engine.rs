//! 归一化引擎实现
//!
//! 选择认领片段的适配器，驱动设备的帧组装器，分类后输出规范事件

use scanbridge_core::utils::{is_blank_payload, split_aim_prefix, strip_control};
use scanbridge_core::{
    apply_gs1_separator, CanonicalScanEvent, Payload, RawFragment, ScanError, VendorAdapter,
    VendorProfile,
};
use scanbridge_lsk::{
    AssemblyState, CompletedScan, DeviceSlot, DeviceState, DeviceTable, FrameAssembler,
};
use scanbridge_profiles::{builtin_profiles, ProfileSet};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::sink::{DiagnosticSink, EventSink, TracingDiagnostics};

/// 归一化引擎
///
/// 同一设备的片段在设备锁内串行处理，不同设备可完全并行
pub struct NormalizationEngine {
    /// 按配置顺序排列的适配器，先认领者胜出
    adapters: Vec<Arc<dyn VendorAdapter>>,
    devices: DeviceTable,
    config: EngineConfig,
    event_sink: Option<Arc<dyn EventSink>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl NormalizationEngine {
    /// 从已校验的配置集合创建引擎
    pub fn new(profiles: &ProfileSet, config: EngineConfig) -> Result<Self, ScanError> {
        Self::with_adapters(profiles.adapters(), config)
    }

    /// 使用内置厂商配置表创建引擎
    pub fn builtin(config: EngineConfig) -> Result<Self, ScanError> {
        Self::new(&builtin_profiles()?, config)
    }

    /// 从适配器列表创建引擎
    ///
    /// 两个适配器声明同一动作标识时拒绝启动
    pub fn with_adapters(
        adapters: Vec<Arc<dyn VendorAdapter>>,
        config: EngineConfig,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        check_action_conflicts(&adapters)?;

        Ok(Self {
            adapters,
            devices: DeviceTable::new(),
            config,
            event_sink: None,
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    /// 设置事件输出
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// 设置诊断输出
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 提交一个片段
    ///
    /// 片段使一次扫码完整时返回规范事件；任何片段级错误都只导致
    /// 不产生事件，并交给诊断输出
    pub fn submit(&self, fragment: RawFragment) -> Option<CanonicalScanEvent> {
        let device_id = fragment.device_id.clone();
        match self.try_submit(fragment) {
            Ok(event) => event,
            Err(error) => {
                self.diagnostics.report(&device_id, &error);
                None
            }
        }
    }

    /// 提交一个片段，并把片段级错误返回给调用方
    pub fn try_submit(
        &self,
        fragment: RawFragment,
    ) -> Result<Option<CanonicalScanEvent>, ScanError> {
        // 未被认领的片段不触碰任何设备状态
        let adapter = self.claim(&fragment)?;

        let slot = self.device_slot(&fragment.device_id, adapter.profile());
        let result = {
            let mut slot = slot.lock();
            self.process(&mut slot, adapter.as_ref(), &fragment)
        };

        if let Ok(Some(event)) = &result {
            self.dispatch(event);
        }
        result
    }

    /// 携带序列号提交片段
    ///
    /// 同一设备的片段先经重排缓冲恢复顺序再进入组装器，因此可能一次
    /// 输出多个事件，也可能暂不输出。缺失的序列号在窗口填满或后续序列号
    /// 远超窗口时判定丢失并跳过
    pub fn submit_sequenced(
        &self,
        sequence: u32,
        fragment: RawFragment,
    ) -> Vec<CanonicalScanEvent> {
        let device_id = fragment.device_id.clone();
        let adapter = match self.claim(&fragment) {
            Ok(adapter) => adapter,
            Err(error) => {
                self.diagnostics.report(&device_id, &error);
                return Vec::new();
            }
        };

        let slot = self.device_slot(&device_id, adapter.profile());
        let mut events = Vec::new();
        let mut errors = Vec::new();
        {
            let mut slot = slot.lock();
            let before = slot.reorder.get_statistics().clone();
            let ready = slot.reorder.insert(sequence, fragment);
            let after = slot.reorder.get_statistics().clone();

            if after.discarded > before.discarded {
                warn!(device = %device_id, sequence, "stale sequenced fragment dropped");
                slot.state.update_receive();
                slot.state.fragments_dropped += 1;
            }
            if after.skipped > before.skipped {
                let skipped = after.skipped - before.skipped;
                warn!(device = %device_id, sequence, skipped, "lost sequence numbers skipped");
                slot.state.sequences_skipped += skipped;
            }

            for fragment in ready {
                let outcome = self
                    .claim(&fragment)
                    .and_then(|adapter| self.process(&mut slot, adapter.as_ref(), &fragment));
                match outcome {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => {}
                    Err(error) => errors.push(error),
                }
            }
        }

        for error in &errors {
            self.diagnostics.report(&device_id, error);
        }
        for event in &events {
            self.dispatch(event);
        }
        events
    }

    /// 重新检查流式设备的缓冲区
    ///
    /// 一个数据块中包含多次扫码时，第一次之后的扫码由此取出
    pub fn poll(&self, device_id: &str) -> Option<CanonicalScanEvent> {
        let slot = self.devices.get(device_id)?;
        let result = {
            let mut slot = slot.lock();
            let profile = self.adapter_by_name(slot.assembler.profile())?.profile();
            let result = match slot.assembler.poll() {
                Ok(scan) => self.settle(&mut slot.assembler, device_id, profile, scan),
                Err(error) => Err(error),
            };
            Self::record(&mut slot.state, &result, false);
            result
        };

        match result {
            Ok(Some(event)) => {
                self.dispatch(&event);
                Some(event)
            }
            Ok(None) => None,
            Err(error) => {
                self.diagnostics.report(device_id, &error);
                None
            }
        }
    }

    /// 复位设备：丢弃挂起的组装（如设备断开）
    pub fn reset_device(&self, device_id: &str) -> bool {
        match self.devices.get(device_id) {
            Some(slot) => {
                slot.lock().reset();
                debug!(device = %device_id, "device reset");
                true
            }
            None => false,
        }
    }

    /// 获取设备统计
    pub fn device_stats(&self, device_id: &str) -> Option<DeviceState> {
        self.devices.get_device_state(device_id)
    }

    /// 获取设备组装状态
    pub fn assembly_state(&self, device_id: &str) -> Option<AssemblyState> {
        self.devices
            .get(device_id)
            .map(|slot| slot.lock().assembly_state())
    }

    /// 获取所有活跃设备
    pub fn active_devices(&self) -> Vec<String> {
        self.devices.get_active_devices()
    }

    /// 已知设备数
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// 按配置顺序选择认领片段的适配器
    fn claim(&self, fragment: &RawFragment) -> Result<&Arc<dyn VendorAdapter>, ScanError> {
        self.adapters
            .iter()
            .find(|adapter| adapter.claim(fragment))
            .ok_or_else(|| ScanError::NoMatchingProfile {
                source_id: fragment.source_id.clone(),
            })
    }

    fn adapter_by_name(&self, name: &str) -> Option<&Arc<dyn VendorAdapter>> {
        self.adapters.iter().find(|adapter| adapter.name() == name)
    }

    fn device_slot(
        &self,
        device_id: &str,
        profile: &VendorProfile,
    ) -> Arc<parking_lot::Mutex<DeviceSlot>> {
        self.devices.get_or_insert_with(device_id, || {
            DeviceSlot::new(
                device_id,
                profile,
                self.config.default_max_buffer,
                self.config.reorder_window,
                self.config.sequence_modulo,
            )
        })
    }

    /// 在设备锁内处理一个片段：拆解、组装、分类
    fn process(
        &self,
        slot: &mut DeviceSlot,
        adapter: &dyn VendorAdapter,
        fragment: &RawFragment,
    ) -> Result<Option<CanonicalScanEvent>, ScanError> {
        slot.rebind(adapter.profile(), self.config.default_max_buffer);

        let result = match adapter
            .extract(fragment)
            .and_then(|parts| slot.assembler.push(parts))
        {
            Ok(scan) => self.settle(
                &mut slot.assembler,
                &fragment.device_id,
                adapter.profile(),
                scan,
            ),
            Err(error) => Err(error),
        };

        Self::record(&mut slot.state, &result, true);
        result
    }

    /// 从完成的扫码得到事件；空白扫码被跳过，继续取出缓冲中的下一次扫码
    fn settle(
        &self,
        assembler: &mut FrameAssembler,
        device_id: &str,
        profile: &VendorProfile,
        mut scan: Option<CompletedScan>,
    ) -> Result<Option<CanonicalScanEvent>, ScanError> {
        while let Some(completed) = scan {
            if let Some(event) = self.finish(device_id, profile, completed) {
                return Ok(Some(event));
            }
            scan = assembler.poll()?;
        }
        Ok(None)
    }

    /// 分类并生成规范事件；空白文本不产生事件
    fn finish(
        &self,
        device_id: &str,
        profile: &VendorProfile,
        scan: CompletedScan,
    ) -> Option<CanonicalScanEvent> {
        let CompletedScan {
            mut text,
            mut type_token,
        } = scan;

        if profile.aim_prefix && type_token.is_none() {
            let split = split_aim_prefix(&text).map(|(p, r)| (p.to_string(), r.to_string()));
            if let Some((prefix, rest)) = split {
                type_token = Some(Payload::Text(prefix));
                text = rest;
            }
        }

        let symbology = profile.type_table.classify(type_token.as_ref());
        let mut text = apply_gs1_separator(&text, symbology, profile.gs1_placeholder);
        if profile.strip_control {
            text = strip_control(&text);
        }

        if is_blank_payload(&text) {
            debug!(device = %device_id, profile = %profile.name, "blank scan payload dropped");
            return None;
        }

        debug!(device = %device_id, profile = %profile.name, %symbology, "scan normalized");
        Some(CanonicalScanEvent {
            device_id: device_id.to_string(),
            profile: profile.name.clone(),
            text,
            symbology,
        })
    }

    fn record(
        state: &mut DeviceState,
        result: &Result<Option<CanonicalScanEvent>, ScanError>,
        received: bool,
    ) {
        if received {
            state.update_receive();
        }
        match result {
            Ok(Some(_)) => state.events_emitted += 1,
            Ok(None) => {}
            Err(error) => {
                state.fragments_dropped += 1;
                if matches!(error, ScanError::AssemblyOverflow { .. }) {
                    state.overflow_count += 1;
                }
            }
        }
    }

    fn dispatch(&self, event: &CanonicalScanEvent) {
        if let Some(sink) = &self.event_sink {
            sink.deliver(event);
        }
    }
}

/// 两个适配器声明同一动作标识时返回 `ConfigurationConflict`
fn check_action_conflicts(adapters: &[Arc<dyn VendorAdapter>]) -> Result<(), ScanError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for adapter in adapters {
        for action in &adapter.profile().actions {
            if let Some(first) = owners.insert(action.as_str(), adapter.name()) {
                if first != adapter.name() {
                    return Err(ScanError::ConfigurationConflict {
                        action: action.clone(),
                        first: first.to_string(),
                        second: adapter.name().to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
