//! OCR 原始文本 → 单帧字段候选
//!
//! 尽力而为：任何字段未命中都只是 `None`，永不返回错误。

use super::patterns::{first_match, ADDRESS, BIRTH_LINE, EXPIRY, ISSUE, NAME_BIRTH, NAME_LINE, NUMBER};
use super::record::FieldCandidates;
use log::debug;
use unicode_normalization::UnicodeNormalization;

/// NFKC 规范化，去掉不换行空格与竖线分隔符
pub fn normalize(raw: &str) -> String {
    let text: String = raw.nfkc().collect();
    text.replace('\u{00A0}', " ")
        .replace(|c: char| c == '|' || c == '｜', "")
        .trim()
        .to_string()
}

pub fn extract(raw: &str) -> FieldCandidates {
    let text = normalize(raw);
    if text.is_empty() {
        return FieldCandidates::default();
    }

    let candidates = FieldCandidates {
        name_birth: extract_name_birth(&text),
        address: first_match(&ADDRESS, &text).map(str::to_string),
        issue: first_match(&ISSUE, &text).map(str::to_string),
        expiry: first_match(&EXPIRY, &text).map(str::to_string),
        number: first_match(&NUMBER, &text).map(str::to_string),
    };

    debug!(
        "📝 Extracted {}/5 candidate slots from {} chars",
        candidates.matched_count(),
        text.chars().count()
    );
    candidates
}

/// 同行匹配优先；否则把「氏名行」和「生年月日行」拼起来
fn extract_name_birth(text: &str) -> Option<String> {
    if let Some(line) = first_match(&NAME_BIRTH, text) {
        return Some(line.to_string());
    }

    let name = first_match(&NAME_LINE, text)?;
    let birth = first_match(&BIRTH_LINE, text)?;
    Some(format!("{} {}", name.trim(), birth.trim()))
}
