//! 乱序重排缓冲区
//!
//! 基于调用方给出的序列号恢复同一设备的片段顺序

use std::collections::BTreeMap;

/// 乱序重排缓冲区
///
/// 使用BTreeMap自动按序列号排序，提供滑动窗口管理
#[derive(Debug, Clone)]
pub struct ReorderBuffer<T> {
    /// 缓冲区（sequence -> item）
    buffer: BTreeMap<u32, T>,
    /// 下一个期望的序列号
    next_expected: u32,
    /// 滑动窗口大小
    window_size: usize,
    /// 序列号模数
    modulo: u32,
    /// 接收统计
    stats: ReorderStatistics,
}

/// 重排统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderStatistics {
    /// 接收的总数
    pub total_received: u64,
    /// 按序输出数
    pub in_order_output: u64,
    /// 重排后输出数
    pub reordered_output: u64,
    /// 丢弃数（已交付过的旧序列号）
    pub discarded: u64,
    /// 判定丢失而跳过的序列号数
    pub skipped: u64,
    /// 当前缓冲区大小
    pub buffer_size: usize,
}

impl<T> ReorderBuffer<T> {
    /// 创建新的乱序重排缓冲区
    ///
    /// # 参数
    /// - `window_size`: 滑动窗口大小（允许的最大乱序范围）
    /// - `modulo`: 序列号模数
    ///
    /// # 示例
    /// ```
    /// use scanbridge_lsk::demultiplex::ReorderBuffer;
    ///
    /// let mut buffer = ReorderBuffer::new(16, 1 << 16);
    ///
    /// // 按序接收
    /// assert_eq!(buffer.insert(0, "a"), vec!["a"]);
    ///
    /// // 乱序接收（收到序列号2，但还没收到1）
    /// assert!(buffer.insert(2, "c").is_empty());
    ///
    /// // 收到序列号1，触发批量输出
    /// assert_eq!(buffer.insert(1, "b"), vec!["b", "c"]);
    /// ```
    pub fn new(window_size: usize, modulo: u32) -> Self {
        Self {
            buffer: BTreeMap::new(),
            next_expected: 0,
            window_size,
            modulo: modulo.max(1),
            stats: ReorderStatistics::default(),
        }
    }

    /// 插入条目并输出可连续交付的部分
    pub fn insert(&mut self, sequence: u32, item: T) -> Vec<T> {
        self.stats.total_received += 1;
        let sequence = sequence % self.modulo;

        if sequence == self.next_expected {
            self.stats.in_order_output += 1;
            self.next_expected = self.increment_sequence(self.next_expected);

            let mut result = vec![item];
            result.extend(self.drain_ordered());
            result
        } else if self.is_in_window(sequence) {
            // 重复序列号以最新到达的为准
            self.buffer.insert(sequence, item);
            self.stats.buffer_size = self.buffer.len();

            // 窗口内除期望序列号外都已到达：期望的序列号判定丢失
            if self.buffer.len() + 1 >= self.window_size {
                self.skip_gap()
            } else {
                Vec::new()
            }
        } else if self.is_ahead(sequence) {
            // 远超窗口：中间序列号判定丢失，交付已缓冲内容后重新同步
            let mut result = Vec::new();
            while !self.buffer.is_empty() {
                result.extend(self.skip_gap());
            }
            self.stats.skipped += self.calculate_distance(self.next_expected, sequence) as u64;
            self.stats.in_order_output += 1;
            self.next_expected = self.increment_sequence(sequence);
            result.push(item);
            result
        } else {
            // 已交付过的旧序列号
            self.stats.discarded += 1;
            Vec::new()
        }
    }

    /// 跳到缓冲中最近的序列号并输出其后连续的条目
    fn skip_gap(&mut self) -> Vec<T> {
        let next_expected = self.next_expected;
        let Some(lowest) = self
            .buffer
            .keys()
            .copied()
            .min_by_key(|&seq| self.calculate_distance(next_expected, seq))
        else {
            return Vec::new();
        };

        self.stats.skipped += self.calculate_distance(next_expected, lowest) as u64;
        self.next_expected = lowest;
        self.drain_ordered()
    }

    /// 提取所有连续的条目
    fn drain_ordered(&mut self) -> Vec<T> {
        let mut result = Vec::new();

        while let Some(item) = self.buffer.remove(&self.next_expected) {
            result.push(item);
            self.stats.reordered_output += 1;
            self.next_expected = self.increment_sequence(self.next_expected);
        }

        self.stats.buffer_size = self.buffer.len();
        result
    }

    /// 检查序列号是否在窗口范围内
    fn is_in_window(&self, sequence: u32) -> bool {
        let distance = self.calculate_distance(self.next_expected, sequence);
        distance < self.window_size
    }

    /// 超出窗口但位于期望序列号之后（半个序列号空间以内）
    fn is_ahead(&self, sequence: u32) -> bool {
        let distance = self.calculate_distance(self.next_expected, sequence);
        distance < (self.modulo / 2) as usize
    }

    /// 计算两个序列号之间的距离（考虑回绕）
    fn calculate_distance(&self, from: u32, to: u32) -> usize {
        if to >= from {
            (to - from) as usize
        } else {
            ((self.modulo - from) + to) as usize
        }
    }

    /// 递增序列号（处理回绕）
    fn increment_sequence(&self, seq: u32) -> u32 {
        ((u64::from(seq) + 1) % u64::from(self.modulo)) as u32
    }

    /// 重置缓冲区，序列号从0重新开始
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.next_expected = 0;
        self.stats = ReorderStatistics::default();
    }

    /// 获取当前缓冲区大小
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// 获取统计信息
    pub fn get_statistics(&self) -> &ReorderStatistics {
        &self.stats
    }
}
