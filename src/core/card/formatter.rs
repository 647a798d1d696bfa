//! 历史样本 → 最终六字段
//!
//! 输入是某一列历史对齐后的六行原始文本（第 0 行是氏名+生年月日合并行，
//! 第 1 行是旧布局下单独的生年月日行），输出顺序固定：
//! 氏名、生年月日、住所、交付日、有効期限、番号。

use super::record::{Field, FIELD_COUNT};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// 已去除空白后的紧凑日期
static DATE_COMPACT: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"(?:\d{4}年(?:\([^)]*\))?\d{1,2}月(?:\([^)]*\))?\d{1,2}日|(?:昭和|平成|令和)\d{1,2}年\d{1,2}月\d{1,2}日)",
    )
});
static NAME_LABEL: Lazy<Option<Regex>> = Lazy::new(|| compile(r"^.*?氏名[:：]?"));
static ERA_TAIL: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?:昭和|平成|令和).*$"));
static ADDRESS_LABEL: Lazy<Option<Regex>> = Lazy::new(|| compile(r"^住[所居][:：]?"));
static ISSUE_LABEL: Lazy<Option<Regex>> = Lazy::new(|| compile(r"[交文]付"));
static ISSUE_CODE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?:^|\D)(\d{5})(?:\D|$)"));
static VALID_UNTIL: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?:迄|[まマ][でテ])[有領]?[効效]"));
static DASHES: Lazy<Option<Regex>> = Lazy::new(|| compile(r"[ー−―－]"));
static WHITESPACE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\s+"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("❌ Formatter pattern failed to compile: {}", e);
            None
        }
    }
}

fn replace_all(re: &Lazy<Option<Regex>>, text: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

fn replace_first(re: &Lazy<Option<Regex>>, text: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace(text, "").into_owned(),
        None => text.to_string(),
    }
}

fn find<'t>(re: &Lazy<Option<Regex>>, text: &'t str) -> Option<regex::Match<'t>> {
    re.as_ref().and_then(|re| re.find(text))
}

/// NFKC + 破折号统一为 `-` + 去掉所有空白
fn pre_clean(raw: &str) -> String {
    let text: String = raw.nfkc().collect();
    let text = replace_all(&DASHES, &text, "-");
    replace_all(&WHITESPACE, &text, "")
}

/// 拆分氏名与生年月日
fn split_name_birth(line: &str, birth_line: &str) -> (String, String) {
    let mut name = String::new();
    let mut birth = String::new();

    if line.contains("氏名") {
        let body = replace_first(&NAME_LABEL, line);
        if let Some(m) = find(&DATE_COMPACT, &body) {
            name = replace_all(&ERA_TAIL, &body[..m.start()], "")
                .trim()
                .to_string();
            birth = m.as_str().replace('生', "").trim().to_string();
        }
    }

    // 旧布局：生年月日单独一行
    if birth.is_empty() && birth_line != line {
        if let Some(m) = find(&DATE_COMPACT, birth_line) {
            birth = m.as_str().to_string();
        }
    }

    (name, birth)
}

fn format_issue(line: &str) -> String {
    let body = replace_all(&ISSUE_LABEL, line, "");
    let date = find(&DATE_COMPACT, &body)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let code = ISSUE_CODE
        .as_ref()
        .and_then(|re| re.captures(&body))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    if !date.is_empty() && !code.is_empty() {
        format!("{}({})", date, code)
    } else {
        date
    }
}

fn format_expiry(line: &str) -> String {
    match find(&DATE_COMPACT, line) {
        Some(m) => m.as_str().to_string(),
        None => replace_all(&VALID_UNTIL, line, ""),
    }
}

fn format_number(line: &str) -> String {
    line.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 把一列历史样本整理成最终六字段
pub fn format_final(sample: &[&str; FIELD_COUNT]) -> [String; FIELD_COUNT] {
    let lines: [String; FIELD_COUNT] = std::array::from_fn(|i| pre_clean(sample[i]));

    let (name, birth) = split_name_birth(
        &lines[Field::Name.index()],
        &lines[Field::BirthDate.index()],
    );
    let address = replace_first(&ADDRESS_LABEL, &lines[Field::Address.index()]);
    let issue = format_issue(&lines[Field::IssueDate.index()]);
    let expiry = format_expiry(&lines[Field::ExpiryDate.index()]);
    let number = format_number(&lines[Field::Number.index()]);

    [name, birth, address, issue, expiry, number]
}
