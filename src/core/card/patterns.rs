//! 各字段的有序正则级联
//!
//! 每个字段一组预编译模式，按顺序尝试，第一个命中的胜出。单个模式编译失败只会
//! 让该模式缺席（记录错误日志），不影响其他字段。

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;

const ERA: &str = "(?:昭和|平成|令和)";
const NUM: &str = r"\d{1,2}";
const PAREN_OPT: &str = r"(?:[（(][^）)]*[）)])?";

/// 和历日期：令和3年4月1日（允许 OCR 插入的空白）
pub static DATE_ERA: Lazy<String> =
    Lazy::new(|| format!(r"(?:{ERA}\s*{NUM}\s*年\s*{NUM}\s*月\s*{NUM}\s*日)"));

/// 西历日期，年/月后可带括号注记：2031年(令和13年)05月01日
pub static DATE_WEST: Lazy<String> = Lazy::new(|| {
    format!(r"\d{{4}}\s*年\s*{PAREN_OPT}\s*{NUM}\s*月\s*{PAREN_OPT}\s*{NUM}\s*日")
});

pub static DATE_ANY: Lazy<String> =
    Lazy::new(|| format!("(?:{}|{})", DATE_WEST.as_str(), DATE_ERA.as_str()));

/// 一个可独立测试的命名模式
#[derive(Debug, Clone)]
pub struct FieldPattern {
    name: &'static str,
    regex: Regex,
}

impl FieldPattern {
    pub fn compile(name: &'static str, pattern: &str) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(regex) => Some(Self { name, regex }),
            Err(e) => {
                error!("❌ Pattern '{}' failed to compile: {}", name, e);
                None
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

/// 按顺序尝试，返回第一个命中
pub fn first_match<'t>(patterns: &[FieldPattern], text: &'t str) -> Option<&'t str> {
    patterns.iter().find_map(|p| p.find(text))
}

fn compile_all(entries: &[(&'static str, String)]) -> Vec<FieldPattern> {
    entries
        .iter()
        .filter_map(|(name, pattern)| FieldPattern::compile(name, pattern))
        .collect()
}

/// 氏名 + 生年月日同行匹配
pub static NAME_BIRTH: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[(
        "name_birth",
        format!(r"氏名\s*.+?{}\s*生?", DATE_ERA.as_str()),
    )])
});

/// 同行匹配失败时分别找「含氏名的行」与「和历日期 + 生 的行」
pub static NAME_LINE: Lazy<Vec<FieldPattern>> =
    Lazy::new(|| compile_all(&[("name_line", r"(?m)^.*氏名.*$".to_string())]));

pub static BIRTH_LINE: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[(
        "birth_line",
        format!(r"(?m)^.*{}\s*生[^\r\n]*$", DATE_ERA.as_str()),
    )])
});

pub static ADDRESS: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[("address", r"住[所居]\s*[:：]?[^\r\n]+".to_string())])
});

pub static ISSUE: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[("issue", format!(r"[交文]付\s*{}.*", DATE_ERA.as_str()))])
});

/// 日期后在有限间隔内出现「まで有効」，先严格后宽松
pub static EXPIRY: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[
        (
            "expiry_strict",
            format!(r"{}.{{0,16}}?まで\s*有効", DATE_ANY.as_str()),
        ),
        (
            "expiry_loose",
            format!(r"{}.{{0,16}}?(?:迄|[まマ][でテ])\s*有[効效]", DATE_ANY.as_str()),
        ),
    ])
});

pub static NUMBER: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    compile_all(&[("number", r"第\s*[0-9０-９]{10,12}\s*号".to_string())])
});
