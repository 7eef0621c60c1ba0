//! 设备表实现
//!
//! 按设备标识分离组装状态：同一设备串行处理，不同设备互不共享可变状态

use parking_lot::{Mutex, RwLock};
use scanbridge_core::{RawFragment, VendorProfile};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use super::reorder_buffer::ReorderBuffer;
use crate::assembler::{AssemblyState, FrameAssembler};

/// 设备状态统计
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// 设备标识
    pub device_id: String,
    /// 接收的片段总数
    pub fragments_received: u64,
    /// 产生的事件总数
    pub events_emitted: u64,
    /// 丢弃的片段总数
    pub fragments_dropped: u64,
    /// 缓冲超限次数
    pub overflow_count: u64,
    /// 判定丢失而跳过的序列号数
    pub sequences_skipped: u64,
    /// 设备是否激活
    pub is_active: bool,
    /// 最后接收时间戳
    pub last_received_time: Option<SystemTime>,
}

impl DeviceState {
    /// 创建新的设备状态
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            fragments_received: 0,
            events_emitted: 0,
            fragments_dropped: 0,
            overflow_count: 0,
            sequences_skipped: 0,
            is_active: false,
            last_received_time: None,
        }
    }

    /// 更新接收统计
    pub fn update_receive(&mut self) {
        self.fragments_received += 1;
        self.is_active = true;
        self.last_received_time = Some(SystemTime::now());
    }

    /// 获取丢弃率
    pub fn get_drop_rate(&self) -> f64 {
        if self.fragments_received == 0 {
            0.0
        } else {
            self.fragments_dropped as f64 / self.fragments_received as f64
        }
    }
}

/// 单个设备的全部可变状态
#[derive(Debug, Clone)]
pub struct DeviceSlot {
    pub state: DeviceState,
    pub assembler: FrameAssembler,
    pub reorder: ReorderBuffer<RawFragment>,
}

impl DeviceSlot {
    pub fn new(
        device_id: &str,
        profile: &VendorProfile,
        default_max_buffer: Option<usize>,
        reorder_window: usize,
        sequence_modulo: u32,
    ) -> Self {
        Self {
            state: DeviceState::new(device_id),
            assembler: FrameAssembler::new(device_id, profile, default_max_buffer),
            reorder: ReorderBuffer::new(reorder_window, sequence_modulo),
        }
    }

    /// 设备改用另一厂商配置时重建组装器
    pub fn rebind(&mut self, profile: &VendorProfile, default_max_buffer: Option<usize>) {
        if self.assembler.profile() != profile.name {
            self.assembler =
                FrameAssembler::new(&self.state.device_id, profile, default_max_buffer);
        }
    }

    /// 丢弃挂起的组装和重排状态
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.reorder.reset();
    }

    pub fn assembly_state(&self) -> AssemblyState {
        self.assembler.state()
    }
}

/// 设备表
///
/// 每个设备一把互斥锁；表本身只在新增或移除设备时写锁定
#[derive(Debug, Default)]
pub struct DeviceTable {
    slots: RwLock<HashMap<String, Arc<Mutex<DeviceSlot>>>>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取设备槽，不存在时创建
    pub fn get_or_insert_with<F>(&self, device_id: &str, create: F) -> Arc<Mutex<DeviceSlot>>
    where
        F: FnOnce() -> DeviceSlot,
    {
        if let Some(slot) = self.slots.read().get(device_id) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write();
        Arc::clone(
            slots
                .entry(device_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(create()))),
        )
    }

    /// 获取设备槽
    pub fn get(&self, device_id: &str) -> Option<Arc<Mutex<DeviceSlot>>> {
        self.slots.read().get(device_id).cloned()
    }

    /// 获取设备状态快照
    pub fn get_device_state(&self, device_id: &str) -> Option<DeviceState> {
        self.get(device_id).map(|slot| slot.lock().state.clone())
    }

    /// 获取所有活跃设备的标识列表
    pub fn get_active_devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.lock().state.is_active)
            .map(|(id, _)| id.clone())
            .collect();
        devices.sort();
        devices
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}
