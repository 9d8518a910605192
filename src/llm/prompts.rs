use serde::{Deserialize, Serialize};

use crate::heuristics::{LANGUAGE_SWITCH, SCRIPT_RATIO, TERMINAL_RATIO};
use crate::models::{ResearchBundle, Topic, Verdict};

/// Style guide for analytical posts (non-negotiable tone and format rules)
pub const DEFAULT_STYLE_GUIDE: &str = r#"당신은 현업 수석 엔지니어이자, 팩트와 논리를 중시하는 테크니컬 라이터다.

**문체 규칙:**
- "~다."로 끝나는 건조하고 분석적인 문체를 사용한다.
- 감정을 배제하고 이모지를 쓰지 않는다.
- "데이터를 분석해 본 결과 ~임이 확인되었다"와 같이 주도적 연구 시점을 유지한다.

**구조:**
1. [현상/문제 인식] → 2. [데이터/근거 분석] → 3. [전문가 의견 대조] → 4. [인사이트 도출]

**본문:**
- 소제목은 간결한 명사형으로 작성한다.
- 번호 매기기 리스트보다 줄글을 우선한다.
- 불릿과 번호 항목은 명사형/구로 쓰고 끝에 "~다."를 붙이지 않는다.

**참조:**
- 외부 자료는 [^n] 각주로 표기하고 글 마지막 ## References 섹션에 정리한다.
- 형식: [^1]: [문서 제목](URL) - 간단한 설명

**금지어:**
- "안녕하세요", "반갑습니다", "오늘은 ~를 알아보겠습니다"
- "결론적으로", "요약하자면", "마지막으로"
- "매우", "획기적인", "놀라운""#;

/// Style guide for the personal diary register
pub const DIARY_STYLE_GUIDE: &str = r#"당신은 블로거의 개인적인 경험을 기록하는 에세이 작가다.
일기장에 쓰는 것처럼 솔직하고 생생하게 개인의 경험을 서술한다."#;

/// First line of the clause appended to a draft prompt after a rejected attempt
pub const ESCALATION_MARKER: &str = "**[재작성 지시: 이전 결과가 품질 검증을 통과하지 못했다]**";

const KOREAN_ONLY: &str = "**매우 중요: 모든 출력은 반드시 한국어(한글)로만 작성한다. 고유명사와 기술 용어를 제외한 영어 문장은 쓰지 않는다.**";

/// Truncation limits for context injected into prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Maximum characters of raw research text
    pub research_chars: usize,
    /// Maximum characters of extracted insights
    pub insight_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            research_chars: 1500,
            insight_chars: 1000,
        }
    }
}

/// Everything a topic-level prompt is assembled from
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub topic: &'a Topic,
    pub research: &'a ResearchBundle,
    /// Replaces [`DEFAULT_STYLE_GUIDE`] when set
    pub style_guide: Option<&'a str>,
    pub limits: &'a PromptLimits,
}

impl PromptContext<'_> {
    fn style_guide(&self) -> &str {
        self.style_guide.unwrap_or(DEFAULT_STYLE_GUIDE)
    }

    fn research_text(&self) -> String {
        if self.research.is_empty() {
            "(조사 자료 없음)".to_string()
        } else {
            truncate_chars(self.research.raw_text.trim(), self.limits.research_chars)
        }
    }

    /// Pattern and conclusion lines pulled out of the research
    fn insights_text(&self) -> String {
        let mut lines = self.research.patterns();
        lines.extend(self.research.conclusions());
        if lines.is_empty() {
            return "(추출된 인사이트 없음)".to_string();
        }
        let joined = lines
            .iter()
            .map(|l| format!("- {}", l.trim_start_matches(['-', '*', ' '])))
            .collect::<Vec<_>>()
            .join("\n");
        truncate_chars(&joined, self.limits.insight_chars)
    }

    fn topic_block(&self) -> String {
        let topic = self.topic;
        let mut block = format!(
            "**주제:**\n제목: {}\n설명: {}\n카테고리: {}\n",
            topic.title, topic.description, topic.category
        );
        if !topic.tags.is_empty() {
            block.push_str(&format!("태그: {}\n", topic.tags.join(", ")));
        }
        if let Some(url) = &topic.source_url {
            block.push_str(&format!("참고 링크: {}\n", url));
        }
        if !self.research.sources.is_empty() {
            block.push_str("출처 후보:\n");
            for source in &self.research.sources {
                block.push_str(&format!("- {}\n", source));
            }
        }
        block
    }
}

/// Stage 1 of the chain: structure and facts
pub fn draft_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        r#"너는 구성 작가다. 팩트와 정보 전달 위주로 서론-본론-결론 구조를 잡는다.

{korean}

{topic}
**조사 결과:**
{research}

**분석 인사이트:**
{insights}

**작성 요구사항:**
1. 서론-본론-결론 구조로 논리적인 글의 뼈대를 잡는다.
2. 조사 결과와 분석 인사이트를 근거로 활용한다.
3. 최소 1500자 이상 작성한다.
4. 모든 문장은 "~다."로 끝낸다.
5. 이모지는 사용하지 않는다.
6. 전문가 의견은 blockquote 형식으로 인용한다.
7. 외부 자료는 [^n] 형식으로 참조하고 마지막에 ## References 섹션을 추가한다.

{style}

**출력:**
Front Matter 없이 Markdown 본문만 작성한다."#,
        korean = KOREAN_ONLY,
        topic = ctx.topic_block(),
        research = ctx.research_text(),
        insights = ctx.insights_text(),
        style = ctx.style_guide(),
    )
}

/// Stage 2 of the chain: voice rewrite of the draft
pub fn persona_prompt(draft: &str) -> String {
    format!(
        r#"너는 10년 차 임베디드 시스템 엔지니어이자 시니컬한 기술 블로거다.

**지시:**
- '습니다/합니다' 체를 쓰지 않는다.
- "소개합니다", "알아보겠습니다" 같은 전형적인 블로그 멘트를 삭제한다.
- 개발자의 냉소적인 위트를 섞어 문장 호흡을 짧게 끊는다.
- "~다." 문체는 유지한다.
- 내용은 유지하고 말투만 바꾼다.

{korean}

**원본 초안:**
{draft}

**출력:**
Front Matter 없이 본문만 작성한다."#,
        korean = KOREAN_ONLY,
        draft = draft,
    )
}

/// Stage 3 of the chain: grammar and markdown cleanup
pub fn polish_prompt(text: &str) -> String {
    format!(
        r#"너는 교정 및 포맷팅 전문가다.

**작업:**
1. 아래 글의 문법을 검수하고 교정한다.
2. 현업 개발 용어로 단어를 교정한다.
3. 마크다운(Code block, H2, H3)을 정리한다.
4. "~다." 문체를 유지한다.
5. 이모지를 제거한다.

{korean}

**원본 글:**
{text}

**출력:**
Front Matter 없이 교정된 본문만 작성한다."#,
        korean = KOREAN_ONLY,
        text = text,
    )
}

/// Single-shot prompt for collected-news digests
pub fn digest_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        r#"너는 여러 경제 뉴스 소스에서 수집된 전일(한국시간 기준) 뉴스 항목을 바탕으로 한국어 분석 글을 작성하는 현업 애널리스트다.

{korean}

{topic}
**입력 데이터(전일 뉴스 수집 결과):**
{research}

**작성 요구사항:**
1. 모든 문장은 "~다."로 끝나는 건조한 평서문을 사용한다.
2. 불릿 리스트 항목 끝에는 "다"를 붙이지 않는다.
3. 이모지, 인사말, 과장 표현을 사용하지 않는다.
4. 기사 전문을 재현하거나 장문 인용하지 않는다.
5. 최소 3000자 이상 작성하고 테마별로 500자 이상 분석한다.

**필수 구조:**
### 전일 이슈 개요
### 테마별 해석
### 체크리스트
## References

{style}"#,
        korean = KOREAN_ONLY,
        topic = ctx.topic_block(),
        research = ctx.research_text(),
        style = ctx.style_guide(),
    )
}

/// Single-shot prompt for the personal diary register
pub fn diary_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        r#"당신은 블로거의 개인적인 경험을 자연스럽고 편안하게 기록하는 일기 작가다.

{korean}

{topic}
**참고 자료:**
{research}

**작성 규칙:**
1. '나', '내가' 등 1인칭 시점을 유지한다.
2. "~했다", "~였다" 같은 자연스러운 과거형과 짧은 문장을 쓴다.
3. 그때 느낀 감정을 구체적으로 적는다.
4. [상황] -> [행동] -> [회고] 구조를 따른다.
5. 사람 이름, 회사명, 프로젝트명은 일반화한다("A 선임", "팀원").
6. 최소 1500자 이상 작성한다.
7. 이모지는 사용하지 않는다.

{style}"#,
        korean = KOREAN_ONLY,
        topic = ctx.topic_block(),
        research = ctx.research_text(),
        style = DIARY_STYLE_GUIDE,
    )
}

/// Simple single-shot prompt used once the retry budget is exhausted
pub fn fallback_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        r#"다음 주제에 대해 한국어 블로그 포스트를 작성한다.

{korean}

{topic}
**참고 자료:**
{research}

위 주제를 깊이 있게 정리하고, 모든 문장은 "~다."로 끝낸다. 최소 800자 이상 작성하고 Front Matter 없이 Markdown 본문만 출력한다."#,
        korean = KOREAN_ONLY,
        topic = ctx.topic_block(),
        research = ctx.research_text(),
    )
}

/// Extra constraints appended to the draft prompt on a retry.
///
/// Adds one instruction per heuristic the previous attempt failed.
pub fn escalation_clause(attempt: u32, max_attempts: u32, previous: Option<&Verdict>) -> String {
    let mut clause = format!("{}\n재시도 {}/{}회차다.\n", ESCALATION_MARKER, attempt, max_attempts);

    let failed = |name: &str| previous.is_none_or(|v| v.failed(name));

    if failed(SCRIPT_RATIO) {
        clause.push_str("- 본문 전체를 한국어로 작성한다. 영어 문단은 실패로 간주한다.\n");
    }
    if failed(TERMINAL_RATIO) {
        clause.push_str("- 목록과 제목을 제외한 모든 문장을 반드시 \"~다.\"로 끝낸다.\n");
    }
    if failed(LANGUAGE_SWITCH) {
        clause.push_str("- 서론부터 마지막 문단까지 한국어를 유지한다. 후반부에 영어로 바뀌면 실패다.\n");
    }
    clause.push_str("- 위 조건을 어기면 결과는 폐기된다.\n");
    clause
}

/// Cut a string to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
