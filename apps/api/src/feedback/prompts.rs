// Feedback Generator prompt templates.
// All prompts for the feedback module are defined here.

/// Marks a degraded result whose completion could not be parsed.
pub const PARSE_ERROR_MARKER: &str = "[FEEDBACK_PARSE_ERROR]";

/// Heading of the prior-version block. Present iff history was supplied.
pub const HISTORY_HEADER: &str = "PREVIOUS VERSION HISTORY";

/// Feedback prompt template.
/// Replace: {job_title}, {job_context}, {company_block}, {doc_label},
///          {current_content}, {history_block}, {reflection_block},
///          {format_rules}, {output_schema}
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"Review the following {doc_label} written by an applicant for the role "{job_title}".

ROLE REQUIREMENTS:
{job_context}
{company_block}
CURRENT SUBMISSION:
{current_content}
{history_block}{reflection_block}
WRITING RULES FOR THIS DOCUMENT TYPE:
{format_rules}

Write all feedback in Korean. Return a JSON object with this EXACT schema (no extra fields):
{output_schema}"#;

/// Appended after the prior versions. Forces an explicit delta judgement.
pub const COMPARISON_INSTRUCTION: &str = "\
COMPARE AGAINST THE PREVIOUS VERSIONS ABOVE: \
1. State explicitly what changed between the most recent previous version and the current submission. \
2. For each change, judge whether it is an improvement or a regression, and say why. \
3. A longer document is NOT automatically better. Flag any loss of specificity, \
   concrete evidence, or relevance to the role as a regression. \
4. Check whether the feedback given on the previous versions was addressed, and say which points remain open. \
Refer to versions by their number (e.g. \"compared to v2\").";

pub const RESUME_RULES: &str = "\
- Education: school, major, degree and graduation date must be unambiguous.\n\
- Activities and awards: each entry needs the applicant's role and a concrete, preferably quantified, outcome.\n\
- Certificates: judge relevance to the role; point out missing certificates the role commonly expects.\n\
- individual_feedbacks keys MUST be a subset of: education, activities, awards, certificates.";

pub const COVER_LETTER_RULES: &str = "\
- Each answer should follow situation, action, result and lesson, with the applicant's own role explicit.\n\
- Motivation must connect the applicant's experience to this role (and company, when given), not generic praise.\n\
- Penalize clichés and sentences that would fit any applicant.\n\
- individual_feedbacks keys MUST be a subset of: reason_for_application, expertise_experience, \
collaboration_experience, challenging_goal_experience, growth_process.";

pub const PORTFOLIO_RULES: &str = "\
- Judge whether each project states its goal, the applicant's contribution, the stack, and a measurable result.\n\
- Flag projects irrelevant to the role.\n\
- individual_feedbacks may use any short field names, or be an empty object.";

/// System prompt for portfolio summaries. Plain text out.
pub const PORTFOLIO_SUMMARY_SYSTEM: &str = "You are a professional career consultant. \
    Summarize portfolios for recruiters in Korean, in plain text without markdown. \
    If you cannot read any portfolio content, reply exactly: 유효한 포트폴리오 내용을 찾을 수 없습니다.";

/// Replace: {job_title}, {job_context}, {portfolio_text}
pub const PORTFOLIO_TEXT_PROMPT_TEMPLATE: &str = r#"Summarize the portfolio below for a recruiter hiring a "{job_title}".

ROLE REQUIREMENTS:
{job_context}

Cover: the main projects, the applicant's role in each, technologies used, measurable outcomes,
and how well the portfolio matches the role requirements. Keep it to one page.

PORTFOLIO TEXT:
{portfolio_text}"#;

/// Replace: {job_title}, {job_context}, {portfolio_url}
pub const PORTFOLIO_LINK_PROMPT_TEMPLATE: &str = r#"Summarize the portfolio at the link below for a recruiter hiring a "{job_title}".

ROLE REQUIREMENTS:
{job_context}

If you are unable to access external URLs, say so plainly instead of guessing its content.

PORTFOLIO LINK:
{portfolio_url}"#;
