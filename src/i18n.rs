//! Language selection and the user-facing strings the session emits.
//!
//! The same [`Language`] tag picks both the text shown in the widget and the
//! instruction sent to the remote model.  Only English and Chinese are
//! supported; any other tag falls back to English, matching what the
//! analysis endpoint does with an unknown `language` field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;
use crate::media::{CameraError, RecorderError, ValidationError};
use crate::session::{Notice, Phase};

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Active UI / prompt language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    /// Wire tag sent in the `language` multipart field.
    pub fn tag(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Parse a wire tag.  Unknown or empty tags resolve to English.
    ///
    /// ```
    /// use magic_verdict::i18n::Language;
    ///
    /// assert_eq!(Language::from_tag("zh"), Language::Zh);
    /// assert_eq!(Language::from_tag("ZH-cn"), Language::Zh);
    /// assert_eq!(Language::from_tag("fr"), Language::En);
    /// ```
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        if tag == "zh" || tag.starts_with("zh-") {
            Language::Zh
        } else {
            Language::En
        }
    }

    /// The other supported language (used by the widget's switcher).
    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

impl Default for Language {
    /// The widget starts in Chinese.
    fn default() -> Self {
        Language::Zh
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Render a [`Notice`] as the message shown to the user.
pub fn notice_text(lang: Language, notice: &Notice) -> String {
    match notice {
        Notice::Camera(err) => camera_text(lang, err),
        Notice::Validation(err) => validation_text(lang, err),
        Notice::Recorder(_) => match lang {
            Language::En => "Recording error occurred. Please try again.".into(),
            Language::Zh => "录制出错，请重试。".into(),
        },
        Notice::Analysis(err) => analysis_text(lang, err),
        Notice::FileUnreadable(detail) => match lang {
            Language::En => format!("Could not read the selected file: {detail}"),
            Language::Zh => format!("无法读取所选文件：{detail}"),
        },
    }
}

fn camera_text(lang: Language, err: &CameraError) -> String {
    let text = match (lang, err) {
        (Language::En, CameraError::PermissionDenied) => {
            "Camera permission denied. Please allow camera access and try again."
        }
        (Language::En, CameraError::NotFound) => {
            "No camera found. Please connect a camera and try again."
        }
        (Language::En, CameraError::Unknown(_)) => {
            "Unable to access camera. Please check permissions and try again."
        }
        (Language::Zh, CameraError::PermissionDenied) => {
            "摄像头权限被拒绝。请允许访问摄像头后重试。"
        }
        (Language::Zh, CameraError::NotFound) => "未找到摄像头。请连接摄像头后重试。",
        (Language::Zh, CameraError::Unknown(_)) => "无法访问摄像头。请检查权限后重试。",
    };
    text.to_string()
}

fn validation_text(lang: Language, err: &ValidationError) -> String {
    let text = match (lang, err) {
        (Language::En, ValidationError::UnsupportedFormat { .. }) => {
            "Invalid video format. Please upload MP4, WebM, MOV, or AVI files."
        }
        (Language::En, ValidationError::TooLarge { .. }) => {
            "File too large. Maximum file size is 100MB."
        }
        (Language::En, ValidationError::TooSmall { .. }) => {
            "File too small. Please upload a video at least 100KB in size."
        }
        (Language::Zh, ValidationError::UnsupportedFormat { .. }) => {
            "无效的视频格式。请上传 MP4、WebM、MOV 或 AVI 文件。"
        }
        (Language::Zh, ValidationError::TooLarge { .. }) => "文件太大。最大文件大小为 100MB。",
        (Language::Zh, ValidationError::TooSmall { .. }) => {
            "文件太小。请上传至少 100KB 的视频。"
        }
    };
    text.to_string()
}

/// Analysis failures are surfaced with their detail string verbatim.
fn analysis_text(lang: Language, err: &AnalysisError) -> String {
    let detail = err.detail();
    match lang {
        Language::En => format!("Analysis failed: {detail}"),
        Language::Zh => format!("分析失败：{detail}"),
    }
}

/// Instruction line shown under the stage for the current phase.
pub fn instructions(lang: Language, phase: &Phase, camera_ready: bool) -> &'static str {
    match (lang, phase) {
        (Language::En, Phase::Idle) if !camera_ready => "Initializing camera...",
        (Language::Zh, Phase::Idle) if !camera_ready => "正在初始化摄像头...",
        (Language::En, Phase::Idle) => {
            "Position yourself in frame and perform your best close-up magic trick. Let the AI be your judge..."
        }
        (Language::Zh, Phase::Idle) => {
            "上传或录制你的魔术表演视频，看看 AI 是否能够成功破解其中的秘密。"
        }
        (Language::En, Phase::Countdown { .. }) => "Get ready... recording starts soon!",
        (Language::Zh, Phase::Countdown { .. }) => "准备好...即将开始录制！",
        (Language::En, Phase::Recording { .. }) => {
            "Recording in progress. Perform your magic trick now!"
        }
        (Language::Zh, Phase::Recording { .. }) => "正在录制中，请表演你的魔术！",
        (Language::En, Phase::Uploading) => "Preparing your performance for analysis...",
        (Language::Zh, Phase::Uploading) => "正在准备分析你的表演...",
        (Language::En, Phase::Analyzing { .. }) => "The AI is studying your every move...",
        (Language::Zh, Phase::Analyzing { .. }) => "AI 正在破解你的魔术...",
    }
}

/// Short label for a UI element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Title,
    Tagline,
    Start,
    Stop,
    AnalyzeFile,
    TryAgain,
    Caught,
    Fooled,
    CaughtSubtitle,
    FooledSubtitle,
    DetectedAt,
    Analysis,
    Uploading,
    Analyzing,
    RetryCamera,
    Confidence,
    FileHint,
    Rec,
    SwitchLanguage,
}

/// Look up a UI label.
pub fn label(lang: Language, label: Label) -> &'static str {
    use Label::*;
    match (lang, label) {
        (Language::En, Title) => "Vernond AI",
        (Language::Zh, Title) => "大暴龙 AI",
        (Language::En, Tagline) => "Can you fool the artificial eye?",
        (Language::Zh, Tagline) => "你的魔术，真的能骗过 AI 吗？",
        (Language::En, Start) => "Start Recording",
        (Language::Zh, Start) => "开始录制",
        (Language::En, Stop) => "Stop Recording",
        (Language::Zh, Stop) => "停止录制",
        (Language::En, AnalyzeFile) => "Analyze File",
        (Language::Zh, AnalyzeFile) => "分析文件",
        (Language::En, TryAgain) => "Try Again",
        (Language::Zh, TryAgain) => "再试一次",
        (Language::En, Caught) => "CAUGHT",
        (Language::Zh, Caught) => "被识破了",
        (Language::En, Fooled) => "FOOLED",
        (Language::Zh, Fooled) => "成功骗过 AI",
        (Language::En, CaughtSubtitle) => "AI detected your method",
        (Language::Zh, CaughtSubtitle) => "AI 看穿了你的魔术",
        (Language::En, FooledSubtitle) => "You fooled the AI!",
        (Language::Zh, FooledSubtitle) => "你成功骗过了 AI！",
        (Language::En, DetectedAt) => "Detected at:",
        (Language::Zh, DetectedAt) => "识破时间点：",
        (Language::En, Analysis) => "Analysis:",
        (Language::Zh, Analysis) => "分析结果：",
        (Language::En, Uploading) => "Uploading video...",
        (Language::Zh, Uploading) => "正在上传视频...",
        (Language::En, Analyzing) => "Analyzing your performance...",
        (Language::Zh, Analyzing) => "正在分析你的表演...",
        (Language::En, RetryCamera) => "Retry Camera",
        (Language::Zh, RetryCamera) => "重试摄像头",
        (Language::En, Confidence) => "Confidence:",
        (Language::Zh, Confidence) => "置信度：",
        (Language::En, FileHint) => "Path to a video file",
        (Language::Zh, FileHint) => "视频文件路径",
        (Language::En, Rec) => "REC",
        (Language::Zh, Rec) => "录制中",
        (Language::En, SwitchLanguage) => "中文",
        (Language::Zh, SwitchLanguage) => "EN",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_falls_back_to_english() {
        assert_eq!(Language::from_tag(""), Language::En);
        assert_eq!(Language::from_tag("th"), Language::En);
        assert_eq!(Language::from_tag(" zh "), Language::Zh);
    }

    #[test]
    fn tag_round_trips() {
        for lang in [Language::En, Language::Zh] {
            assert_eq!(Language::from_tag(lang.tag()), lang);
        }
    }

    #[test]
    fn default_language_is_chinese() {
        assert_eq!(Language::default(), Language::Zh);
    }

    #[test]
    fn analysis_detail_is_surfaced_verbatim() {
        let notice = Notice::Analysis(AnalysisError::Upstream {
            detail: "model overloaded".into(),
        });
        assert_eq!(
            notice_text(Language::En, &notice),
            "Analysis failed: model overloaded"
        );
        assert_eq!(notice_text(Language::Zh, &notice), "分析失败：model overloaded");
    }

    #[test]
    fn validation_messages_differ_per_rule() {
        let small = Notice::Validation(ValidationError::TooSmall { size: 1, min: 2 });
        let large = Notice::Validation(ValidationError::TooLarge { size: 3, max: 2 });
        assert_ne!(
            notice_text(Language::En, &small),
            notice_text(Language::En, &large)
        );
    }

    #[test]
    fn language_switch_names_the_other_language() {
        assert_eq!(label(Language::En, Label::SwitchLanguage), "中文");
        assert_eq!(label(Language::Zh, Label::SwitchLanguage), "EN");
    }

    #[test]
    fn idle_instructions_depend_on_camera() {
        assert_eq!(
            instructions(Language::En, &Phase::Idle, false),
            "Initializing camera..."
        );
        assert_ne!(
            instructions(Language::En, &Phase::Idle, true),
            "Initializing camera..."
        );
    }
}
