//! 设备分离模块
//!
//! 提供按设备的状态隔离、统计和乱序重排功能

pub mod device_table;
pub mod reorder_buffer;

pub use device_table::{DeviceSlot, DeviceState, DeviceTable};
pub use reorder_buffer::{ReorderBuffer, ReorderStatistics};
