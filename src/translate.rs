//! Translation target languages
//!
//! The closed set of languages a transcript chunk can be translated into,
//! with the short codes the relay's translate endpoint expects and the
//! locale tags speech synthesis uses.

use serde::{Deserialize, Serialize};

/// Translation target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[default]
    English,
    Chinese,
    Korean,
}

impl TargetLanguage {
    /// Short code for the translate API (e.g. "en").
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::English => "en",
            TargetLanguage::Chinese => "zh",
            TargetLanguage::Korean => "ko",
        }
    }

    /// BCP-47 locale tag for speech synthesis.
    pub fn locale_tag(&self) -> &'static str {
        match self {
            TargetLanguage::English => "en-US",
            TargetLanguage::Chinese => "zh-CN",
            TargetLanguage::Korean => "ko-KR",
        }
    }

    /// Display label (the UI is Japanese).
    pub fn label(&self) -> &'static str {
        match self {
            TargetLanguage::English => "英語",
            TargetLanguage::Chinese => "中国語",
            TargetLanguage::Korean => "韓国語",
        }
    }

    /// Parse a console command argument (short code or locale tag).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "en" | "en-us" => Some(TargetLanguage::English),
            "zh" | "zh-cn" => Some(TargetLanguage::Chinese),
            "ko" | "ko-kr" => Some(TargetLanguage::Korean),
            _ => None,
        }
    }
}
