use serde::{Deserialize, Serialize};
use std::fmt;

pub const FIELD_COUNT: usize = 6;

/// 最终输出的六个字段，顺序固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    BirthDate,
    Address,
    IssueDate,
    ExpiryDate,
    Number,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Name,
        Field::BirthDate,
        Field::Address,
        Field::IssueDate,
        Field::ExpiryDate,
        Field::Number,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 进度显示用的短标签
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "氏名",
            Field::BirthDate => "生年月日",
            Field::Address => "住所",
            Field::IssueDate => "交付日",
            Field::ExpiryDate => "有効期限",
            Field::Number => "番号",
        }
    }

    /// 最终报告用的对齐标签
    fn report_label(self) -> &'static str {
        match self {
            Field::Name => "氏\u{3000}\u{3000}名",
            Field::BirthDate => "生年月日",
            Field::Address => "住\u{3000}\u{3000}所",
            Field::IssueDate => "交  付  日",
            Field::ExpiryDate => "有効期限",
            Field::Number => "番\u{3000}\u{3000}号",
        }
    }
}

/// 单帧抽取结果：每个槽位要么未命中（None），要么是原始匹配子串
///
/// 氏名与生年月日在证件上同行，抽取阶段合为一个 `name_birth` 槽位，
/// 历史中 `Field::Name` 与 `Field::BirthDate` 都取自它。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCandidates {
    pub name_birth: Option<String>,
    pub address: Option<String>,
    pub issue: Option<String>,
    pub expiry: Option<String>,
    pub number: Option<String>,
}

impl FieldCandidates {
    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Name | Field::BirthDate => &self.name_birth,
            Field::Address => &self.address,
            Field::IssueDate => &self.issue,
            Field::ExpiryDate => &self.expiry,
            Field::Number => &self.number,
        };
        slot.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&f| self.get(f).is_none())
    }

    pub fn matched_count(&self) -> usize {
        [
            &self.name_birth,
            &self.address,
            &self.issue,
            &self.expiry,
            &self.number,
        ]
        .iter()
        .filter(|slot| slot.as_deref().is_some_and(|s| !s.is_empty()))
        .count()
    }
}

/// 多帧投票后的最终结果，一个扫描会话只生成一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecord {
    pub name: String,
    pub birth_date: String,
    pub address: String,
    /// 交付日，带有 5 位代码时为 `"日期(代码)"`
    pub issue_date: String,
    pub expiry_date: String,
    pub number: String,
}

impl FinalRecord {
    pub fn from_columns(columns: [String; FIELD_COUNT]) -> Self {
        let [name, birth_date, address, issue_date, expiry_date, number] = columns;
        Self {
            name,
            birth_date,
            address,
            issue_date,
            expiry_date,
            number,
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::BirthDate => &self.birth_date,
            Field::Address => &self.address,
            Field::IssueDate => &self.issue_date,
            Field::ExpiryDate => &self.expiry_date,
            Field::Number => &self.number,
        }
    }

    /// 固定格式的六行报告
    pub fn report(&self) -> String {
        Field::ALL
            .iter()
            .map(|&f| format!("{}：{}", f.report_label(), self.get(f)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for FinalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

/// 各字段历史的填充进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub counts: [usize; FIELD_COUNT],
    pub limit: usize,
}

impl ScanProgress {
    pub fn is_complete(&self) -> bool {
        self.counts.iter().all(|&c| c >= self.limit)
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "履歴進捗（各グループ 件数/目標{}）", self.limit)?;
        for field in Field::ALL {
            write!(
                f,
                "\n{}：{}/{}",
                field.label(),
                self.counts[field.index()],
                self.limit
            )?;
        }
        Ok(())
    }
}
