//! Instruction sent to the vision model alongside the clip.
//!
//! One fixed instruction per [`Language`].  Both ask for the same JSON
//! shape that [`parse_result`](super::parse_result) validates, so the
//! reply can be checked the same way whatever the language.

use crate::i18n::Language;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const INSTRUCTION_EN: &str = "\
You are analyzing a video recording of someone performing a close-up magic trick.

Your task:
1. Watch the video carefully and analyze the magic trick performance
2. Look for any visible sleight of hand, palming, misdirection, or trick techniques
3. Identify specific moments (timestamps) where tricks are detected
4. Determine if the performance was clean or if you caught the method

Respond in this EXACT JSON format (no other text):
{
  \"verdict\": \"caught\" or \"fooled\",
  \"confidence\": 0.75,
  \"timestamps\": [\"0:02.34\", \"0:05.12\"],
  \"analysis\": \"Detailed description of what you observed in the video\"
}

Rules:
- If you detect the trick method in the video, verdict = \"caught\" and include specific timestamps
- If the trick appears clean, verdict = \"fooled\" and timestamps = []
- Be critical and thorough - analyze hand movements, angles, timing
- Provide specific analysis of what you saw in the video

Analyze this magic trick video now:";

const INSTRUCTION_ZH: &str = "\
你正在分析一段近景魔术表演视频。

你的任务：
1. 仔细观看视频并分析魔术表演
2. 寻找任何可见的手法、藏牌、误导或技巧
3. 识别检测到技巧的具体时间点（时间戳）
4. 判断表演是否干净，或者你是否识破了方法

请用以下 JSON 格式回复（不要有其他文字）：
{
  \"verdict\": \"caught\" 或 \"fooled\",
  \"confidence\": 0.75,
  \"timestamps\": [\"0:02.34\", \"0:05.12\"],
  \"analysis\": \"你在视频中观察到的详细描述\"
}

规则：
- 如果你在视频中识破了魔术方法，verdict = \"caught\" 并包含具体时间戳
- 如果魔术看起来很干净，verdict = \"fooled\" 且 timestamps = []
- 要严格仔细 - 分析手部动作、角度、时机
- 提供你在视频中看到的具体分析
- 分析内容请用中文回答

现在分析这个魔术视频：";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Picks the model instruction for a language.
///
/// # Example
/// ```rust
/// use magic_verdict::analysis::PromptBuilder;
/// use magic_verdict::i18n::Language;
///
/// let prompt = PromptBuilder::new(Language::En).build();
/// assert!(prompt.contains("\"verdict\""));
/// ```
pub struct PromptBuilder {
    language: Language,
}

impl PromptBuilder {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// The full instruction text, placed before the video part.
    pub fn build(&self) -> &'static str {
        match self.language {
            Language::En => INSTRUCTION_EN,
            Language::Zh => INSTRUCTION_ZH,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
