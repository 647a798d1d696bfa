//! 多帧投票
//!
//! 每个字段维护一个容量为 K 的滑动历史；六个历史全部填满时逐列格式化，
//! 再按字段取众数（票数相同取先出现者），生成唯一的 `FinalRecord`。

use super::formatter::format_final;
use super::record::{Field, FieldCandidates, FinalRecord, ScanProgress, FIELD_COUNT};
use log::{debug, info};
use std::collections::VecDeque;

/// 定长滑动历史，满了丢最旧的
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: String) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ConsensusState {
    Collecting,
    Finalized(FinalRecord),
}

/// 一次 `ingest` 之后的对外状态
#[derive(Debug, Clone, PartialEq)]
pub enum ConsensusStatus {
    Collecting(ScanProgress),
    Finalized(FinalRecord),
}

impl ConsensusStatus {
    pub fn is_finalized(&self) -> bool {
        matches!(self, ConsensusStatus::Finalized(_))
    }
}

/// 众数，票数相同取先出现者
pub fn majority_vote<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    for value in values {
        match tally.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((value, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

pub struct ConsensusAggregator {
    histories: [HistoryBuffer; FIELD_COUNT],
    limit: usize,
    state: ConsensusState,
}

impl ConsensusAggregator {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            histories: std::array::from_fn(|_| HistoryBuffer::new(limit)),
            limit,
            state: ConsensusState::Collecting,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 追加一帧候选；定稿后直接返回既有结果，直到 `reset`
    pub fn ingest(&mut self, candidates: &FieldCandidates) -> ConsensusStatus {
        if let ConsensusState::Finalized(record) = &self.state {
            return ConsensusStatus::Finalized(record.clone());
        }

        for field in Field::ALL {
            if let Some(value) = candidates.get(field) {
                self.histories[field.index()].push(value.to_string());
            }
        }

        if !self.histories.iter().all(HistoryBuffer::is_full) {
            return ConsensusStatus::Collecting(self.progress());
        }

        let record = self.finalize();
        info!("✅ Consensus reached after {} samples per field", self.limit);
        debug!("📋 History at finalization:\n{}", self.history_dump());
        self.state = ConsensusState::Finalized(record.clone());
        ConsensusStatus::Finalized(record)
    }

    fn finalize(&self) -> FinalRecord {
        let columns: Vec<[String; FIELD_COUNT]> = (0..self.limit)
            .map(|i| {
                let sample: [&str; FIELD_COUNT] =
                    std::array::from_fn(|f| self.histories[f].get(i).unwrap_or(""));
                format_final(&sample)
            })
            .collect();

        FinalRecord::from_columns(std::array::from_fn(|f| {
            majority_vote(columns.iter().map(|column| column[f].as_str())).unwrap_or_default()
        }))
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            counts: std::array::from_fn(|f| self.histories[f].len()),
            limit: self.limit,
        }
    }

    /// 各字段历史原文，调试用
    pub fn history_dump(&self) -> String {
        let mut lines = Vec::new();
        for field in Field::ALL {
            lines.push(format!("[{}]", field.label()));
            for (i, entry) in self.histories[field.index()].iter().enumerate() {
                lines.push(format!("  {}: {}", i, entry));
            }
        }
        lines.join("\n")
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, ConsensusState::Finalized(_))
    }

    pub fn final_record(&self) -> Option<&FinalRecord> {
        match &self.state {
            ConsensusState::Finalized(record) => Some(record),
            ConsensusState::Collecting => None,
        }
    }

    pub fn reset(&mut self) {
        for history in &mut self.histories {
            history.clear();
        }
        self.state = ConsensusState::Collecting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_candidates(name_birth: &str, number: &str) -> FieldCandidates {
        FieldCandidates {
            name_birth: Some(name_birth.to_string()),
            address: Some("住所 東京都千代田区霞が関2-1-2".to_string()),
            issue: Some("交付 令和03年04月01日 12345".to_string()),
            expiry: Some("2026年(令和08年)02月01日まで有効".to_string()),
            number: Some(number.to_string()),
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = HistoryBuffer::new(2);
        history.push("a".into());
        history.push("b".into());
        history.push("c".into());
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(history.is_full());
    }

    #[test]
    fn test_majority_vote() {
        assert_eq!(majority_vote(["A", "A", "B", "A", "C"]).as_deref(), Some("A"));
        assert_eq!(majority_vote(["B", "A", "A", "B"]).as_deref(), Some("B"));
        assert_eq!(majority_vote(["X", "Y", "Z"]).as_deref(), Some("X"));
        assert_eq!(majority_vote(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_collects_until_every_history_full() {
        let mut agg = ConsensusAggregator::new(3);
        let partial = FieldCandidates {
            name_birth: Some("氏名 山田太郎 昭和50年1月1日生".to_string()),
            ..Default::default()
        };
        for _ in 0..5 {
            assert!(!agg.ingest(&partial).is_finalized());
        }
        let progress = agg.progress();
        assert_eq!(progress.counts, [3, 3, 0, 0, 0, 0]);
        assert!(!agg.is_finalized());
    }

    #[test]
    fn test_empty_candidates_change_nothing() {
        let mut agg = ConsensusAggregator::new(2);
        let status = agg.ingest(&FieldCandidates::default());
        match status {
            ConsensusStatus::Collecting(p) => assert_eq!(p.counts, [0; 6]),
            ConsensusStatus::Finalized(_) => panic!("不应定稿"),
        }
    }

    #[test]
    fn test_finalizes_with_majority() {
        let mut agg = ConsensusAggregator::new(5);
        let good = full_candidates("氏名 山田太郎 昭和50年1月1日生", "第 123456789012 号");
        let noisy = full_candidates("氏名 山田大郎 昭和50年1月1日生", "第 123456789013 号");

        let frames = [&good, &good, &noisy, &good, &noisy];
        let mut last = None;
        for (i, frame) in frames.iter().enumerate() {
            let status = agg.ingest(frame);
            assert_eq!(status.is_finalized(), i == frames.len() - 1);
            last = Some(status);
        }

        let record = match last {
            Some(ConsensusStatus::Finalized(record)) => record,
            other => panic!("应已定稿: {:?}", other),
        };
        assert_eq!(record.name, "山田太郎");
        assert_eq!(record.birth_date, "昭和50年1月1日");
        assert_eq!(record.issue_date, "令和03年04月01日(12345)");
        assert_eq!(record.number, "123456789012");
        assert_eq!(agg.final_record(), Some(&record));
    }

    #[test]
    fn test_ignores_ingest_after_finalize() {
        let mut agg = ConsensusAggregator::new(1);
        let first = full_candidates("氏名 山田太郎 昭和50年1月1日生", "第 123456789012 号");
        let second = full_candidates("氏名 鈴木花子 平成2年3月4日生", "第 999999999999 号");

        let record = match agg.ingest(&first) {
            ConsensusStatus::Finalized(record) => record,
            other => panic!("应已定稿: {:?}", other),
        };
        assert_eq!(agg.ingest(&second), ConsensusStatus::Finalized(record));
        assert_eq!(agg.progress().counts, [1; 6]);
    }

    #[test]
    fn test_reset_returns_to_collecting() {
        let mut agg = ConsensusAggregator::new(1);
        agg.ingest(&full_candidates("氏名 山田太郎 昭和50年1月1日生", "第 123456789012 号"));
        assert!(agg.is_finalized());

        agg.reset();
        assert!(!agg.is_finalized());
        assert!(agg.final_record().is_none());
        assert_eq!(agg.progress().counts, [0; 6]);

        let status = agg.ingest(&full_candidates("氏名 鈴木花子 平成2年3月4日生", "第 999999999999 号"));
        match status {
            ConsensusStatus::Finalized(record) => assert_eq!(record.name, "鈴木花子"),
            other => panic!("应已定稿: {:?}", other),
        }
    }

    #[test]
    fn test_history_dump_lists_entries() {
        let mut agg = ConsensusAggregator::new(2);
        agg.ingest(&FieldCandidates {
            number: Some("第 123456789012 号".to_string()),
            ..Default::default()
        });
        let dump = agg.history_dump();
        assert!(dump.contains("[番号]\n  0: 第 123456789012 号"));
        assert!(dump.starts_with("[氏名]"));
    }
}
