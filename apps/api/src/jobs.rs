//! Static job catalog and editor field schemas.
//!
//! The catalog is read-only reference data: categories of job titles, plus
//! competency/certification details for the subset of jobs that have them.

use serde::Serialize;

use crate::models::document::DocType;

/// (category, job titles)
const JOB_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "개발",
        &[
            "프론트엔드 개발자",
            "백엔드 개발자",
            "앱 개발자",
            "AI/데이터 개발자",
            "DevOps/인프라 엔지니어",
        ],
    ),
    (
        "마케팅/광고",
        &["디지털 마케터", "콘텐츠 마케터", "퍼포먼스 마케터", "마케팅 기획자"],
    ),
    (
        "경영/비즈니스",
        &[
            "사업기획자",
            "프로덕트 매니저(PM)",
            "재무/회계 담당자",
            "HR 담당자",
            "영업기획/BD",
        ],
    ),
    (
        "디자인",
        &["UX/UI 디자이너", "그래픽 디자이너", "브랜드 디자이너", "모션/영상 디자이너"],
    ),
    ("영업", &["B2B 영업", "B2C 영업", "기술영업", "영업기획/관리"]),
    (
        "엔지니어링/설계",
        &[
            "기계 설계 엔지니어",
            "전기/전자 설계 엔지니어",
            "제품 개발 엔지니어",
            "품질관리(QA/QC)",
        ],
    ),
    (
        "제조/생산",
        &["생산직 오퍼레이터", "생산관리자", "품질관리자", "설비 유지보수 엔지니어"],
    ),
    (
        "의료/제약/바이오",
        &["의사", "간호사", "약사", "임상시험 코디네이터(CRA)", "바이오 연구원"],
    ),
    (
        "금융",
        &["은행원", "자산운용 매니저", "금융 컨설턴트(FP)", "투자 분석가"],
    ),
    (
        "미디어",
        &["방송 PD", "콘텐츠 작가", "영상 편집자", "유튜브 콘텐츠 기획자"],
    ),
    (
        "게임 제작",
        &["게임 기획자", "게임 프로그래머", "게임 아티스트", "게임 QA/테스터"],
    ),
    (
        "물류/무역",
        &["물류 관리자", "수출입 담당자", "구매 담당자", "통관사"],
    ),
    ("법률/법기관", &["변호사", "검사", "수사관", "기업 법무 담당자"]),
    (
        "건설/시설",
        &[
            "건축가",
            "시공 관리자(현장소장)",
            "전기/소방 기술자",
            "인테리어 디자이너",
        ],
    ),
    (
        "식음료",
        &["조리사(셰프)", "바리스타", "제과제빵사", "식품 품질관리자"],
    ),
    (
        "공공/복지",
        &["사회복지사", "공무원", "요양보호사", "NGO 활동가"],
    ),
    (
        "정보보호",
        &[
            "보안 엔지니어",
            "보안 관제 요원(SOC)",
            "개인정보보호 담당자(DPO)",
            "사이버 위협 분석가",
        ],
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    pub competencies: &'static [&'static str],
    pub certifications: &'static [&'static str],
    pub description: &'static str,
}

const JOB_DETAILS: &[(&str, JobDetail)] = &[
    (
        "프론트엔드 개발자",
        JobDetail {
            competencies: &[
                "HTML/CSS",
                "JavaScript",
                "React",
                "Vue.js",
                "TypeScript",
                "Redux",
                "Webpack/Vite",
                "반응형 웹",
                "UI/UX 이해",
                "API 연동",
                "Git/GitHub",
            ],
            certifications: &["정보처리기사", "웹디자인기능사"],
            description: "웹사이트의 사용자 인터페이스(UI)를 구축하고 사용자 경험(UX)을 개선하는 역할입니다.",
        },
    ),
    (
        "백엔드 개발자",
        JobDetail {
            competencies: &[
                "Python",
                "Java",
                "Node.js",
                "Spring Framework",
                "Django/Flask",
                "RESTful API",
                "RDBMS (SQL)",
                "NoSQL",
                "Docker",
                "AWS/GCP/Azure",
            ],
            certifications: &["정보처리기사", "OCJP (Oracle Certified Java Programmer)"],
            description: "서버, 데이터베이스 및 애플리케이션의 핵심 로직을 담당합니다.",
        },
    ),
    (
        "UX/UI 디자이너",
        JobDetail {
            competencies: &[
                "Figma/Sketch/Adobe XD",
                "Photoshop/Illustrator",
                "사용자 리서치",
                "와이어프레임/프로토타이핑",
                "정보 설계",
                "디자인 시스템",
            ],
            certifications: &["컴퓨터그래픽스운용기능사", "웹디자인기능사"],
            description: "사용자 경험(UX)을 설계하고 사용자 인터페이스(UI)를 디자인합니다.",
        },
    ),
    (
        "앱 개발자",
        JobDetail {
            competencies: &[
                "Kotlin/Swift",
                "Android/iOS SDK",
                "UI/UX 원칙",
                "RESTful API 연동",
                "SQLite/Realm",
                "Firebase",
            ],
            certifications: &["정보처리기사"],
            description: "모바일 애플리케이션을 개발하고 유지보수합니다.",
        },
    ),
    (
        "AI/데이터 개발자",
        JobDetail {
            competencies: &[
                "Python",
                "R",
                "머신러닝 알고리즘",
                "딥러닝 프레임워크 (TensorFlow/PyTorch)",
                "데이터 전처리/분석",
                "SQL",
                "빅데이터 기술 (Spark/Hadoop)",
            ],
            certifications: &["정보처리기사", "빅데이터분석기사"],
            description: "인공지능 모델을 개발하고 데이터를 분석하여 비즈니스 통찰력을 제공합니다.",
        },
    ),
    (
        "DevOps/인프라 엔지니어",
        JobDetail {
            competencies: &[
                "Linux/Unix",
                "클라우드 (AWS/Azure/GCP)",
                "Docker",
                "Kubernetes",
                "CI/CD (Jenkins/GitLab CI)",
                "스크립팅 (Bash/Python)",
                "네트워킹",
                "보안",
            ],
            certifications: &["리눅스마스터", "클라우드 자격증 (AWS SAA)"],
            description: "소프트웨어 개발 및 배포 파이프라인을 구축하고 인프라를 관리합니다.",
        },
    ),
    (
        "디지털 마케터",
        JobDetail {
            competencies: &[
                "SEO/SEM",
                "SNS 마케팅",
                "콘텐츠 기획",
                "데이터 분석 (Google Analytics)",
                "광고 집행 (GDN/GA)",
                "이메일 마케팅",
                "CRM",
            ],
            certifications: &["구글 애널리틱스 자격증", "검색광고마케터"],
            description: "온라인 채널을 활용하여 제품/서비스를 홍보하고 고객을 유치합니다.",
        },
    ),
    (
        "사업기획자",
        JobDetail {
            competencies: &[
                "시장 분석",
                "사업 모델 수립",
                "재무 분석",
                "전략 기획",
                "PPT/보고서 작성",
                "커뮤니케이션",
                "협상력",
            ],
            certifications: &["경영지도사"],
            description: "새로운 사업 기회를 발굴하고 실행 전략을 수립합니다.",
        },
    ),
];

/// URL-friendly slug: spaces and `/` become `-`, lowercased.
pub fn slugify(job_title: &str) -> String {
    job_title.replace([' ', '/'], "-").to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub title: &'static str,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobCategory {
    pub name: &'static str,
    pub jobs: Vec<JobSummary>,
}

/// A resolved job: its display title plus details when the catalog has them.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub title: &'static str,
    pub slug: String,
    pub category: &'static str,
    pub detail: Option<JobDetail>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobCatalog;

impl JobCatalog {
    pub fn categories(&self) -> Vec<JobCategory> {
        JOB_CATEGORIES
            .iter()
            .map(|&(name, titles)| JobCategory {
                name,
                jobs: titles
                    .iter()
                    .map(|&title| JobSummary {
                        title,
                        slug: slugify(title),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Looks a job up by slug or by exact title.
    pub fn find(&self, slug_or_title: &str) -> Option<Job> {
        let wanted = slugify(slug_or_title.trim());
        JOB_CATEGORIES.iter().find_map(|&(category, titles)| {
            titles
                .iter()
                .copied()
                .find(|title| slugify(title) == wanted)
                .map(|title| Job {
                    title,
                    slug: wanted.clone(),
                    category,
                    detail: JOB_DETAILS
                        .iter()
                        .find(|(t, _)| *t == title)
                        .map(|(_, d)| d.clone()),
                })
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Editor field schemas
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub placeholder: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSchema {
    pub doc_type: DocType,
    pub fields: Vec<FieldSchema>,
}

fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    placeholder: &'static str,
) -> FieldSchema {
    FieldSchema {
        name,
        label,
        kind,
        placeholder,
    }
}

/// Field list the editor renders for a doc_type. Names match the content structs.
pub fn document_schema(doc_type: DocType) -> DocumentSchema {
    use FieldKind::{Text, Textarea};

    let fields = match doc_type {
        DocType::Resume => vec![
            field(
                "education",
                "학력",
                Textarea,
                "최종 학력, 학교명, 전공, 학위, 졸업년월 등을 입력하세요.",
            ),
            field(
                "gpa",
                "학점",
                Text,
                "총 평점 및 만점 기준을 입력하세요. (예: 4.0/4.5)",
            ),
            field(
                "awards",
                "수상 내역",
                Textarea,
                "수상명, 수상일, 주최 기관, 간략한 설명을 입력하세요.",
            ),
            field(
                "activities",
                "대외 활동",
                Textarea,
                "활동명, 기간, 역할, 주요 성과를 입력하세요.",
            ),
            field(
                "career_experience",
                "경력 사항",
                Textarea,
                "회사명, 기간, 직무, 담당 업무 및 성과를 작성하세요.",
            ),
            field(
                "certificates",
                "자격증",
                Textarea,
                "자격증명, 취득일, 발급 기관을 입력하세요.",
            ),
            field(
                "skills",
                "보유 기술",
                Textarea,
                "직무 관련 기술과 숙련도를 입력하세요.",
            ),
        ],
        DocType::CoverLetter => vec![
            field(
                "reason_for_application",
                "지원 동기",
                Textarea,
                "이 직무와 회사에 지원한 이유를 작성하세요.",
            ),
            field(
                "expertise_experience",
                "전문성 경험",
                Textarea,
                "직무 전문성을 쌓은 경험을 작성하세요.",
            ),
            field(
                "collaboration_experience",
                "협업 경험",
                Textarea,
                "팀으로 문제를 해결한 경험을 작성하세요.",
            ),
            field(
                "challenging_goal_experience",
                "도전적 목표 경험",
                Textarea,
                "어려운 목표에 도전한 경험을 작성하세요.",
            ),
            field(
                "growth_process",
                "성장 과정",
                Textarea,
                "현재의 나를 만든 성장 과정을 작성하세요.",
            ),
        ],
        DocType::Portfolio => vec![
            field(
                "project_name",
                "대표 프로젝트명",
                Text,
                "대표 프로젝트 이름을 입력하세요.",
            ),
            field(
                "project_details",
                "프로젝트 상세",
                Textarea,
                "목표, 역할, 기술 스택, 기여도와 핵심 성과를 설명하세요.",
            ),
            field(
                "project_links",
                "관련 링크",
                Text,
                "Github, 블로그, 데모 영상 등 링크를 쉼표로 구분해 입력하세요.",
            ),
        ],
    };

    DocumentSchema { doc_type, fields }
}
