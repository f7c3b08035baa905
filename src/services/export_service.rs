//! 导出服务 - 业务能力层
//!
//! 先把试卷排成与渲染无关的 `ExamDocument`，再渲染成 Markdown 写到输出目录。
//! 题号和每题分值全部来自 `models::scoring`，与屏幕展示保持一致。

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::info;

use crate::error::{AppResult, PersistenceError};
use crate::models::exam::{option_letter, GeneratedTest};
use crate::models::form::FormConfig;
use crate::models::scoring::{
    format_points, format_score, number_questions, NumberedQuestion, QuestionKind, ScoreBreakdown,
};
use crate::models::solution::TestSolution;

const SCHOOL_NAME: &str = "TRƯỜNG TIỂU HỌC ABC";
const EXAM_TITLE: &str = "ĐỀ KIỂM TRA CUỐI HỌC KỲ";
const ANSWER_TITLE: &str = "ĐÁP ÁN VÀ HƯỚNG DẪN CHẤM";
const LONG_DOTS: &str = "........................................................";
const SHORT_DOTS: &str = "..............................";

/// 文档块
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// 居中标题
    Title(String),
    /// 大题标题
    Section(String),
    /// 普通一行，可加粗
    Line { text: String, bold: bool },
    /// 题目行：`Câu n (p điểm): ` + 题干
    Question { label: String, text: String },
    /// 选项（已带字母）
    Option(String),
    /// 连线题两列
    MatchingTable(Vec<(String, String)>),
    /// 缩进的说明文字
    Indented(String),
    Blank,
    PageBreak,
}

/// 排版好的试卷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamDocument {
    pub blocks: Vec<Block>,
}

impl ExamDocument {
    fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn line(&mut self, text: impl Into<String>, bold: bool) {
        self.push(Block::Line {
            text: text.into(),
            bold,
        });
    }

    /// 渲染为 Markdown
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Title(text) => out.push_str(&format!("<center><b>{}</b></center>\n\n", text)),
                Block::Section(text) => out.push_str(&format!("## {}\n\n", text)),
                Block::Line { text, bold: true } => out.push_str(&format!("**{}**\n\n", text)),
                Block::Line { text, bold: false } => out.push_str(&format!("{}\n\n", text)),
                Block::Question { label, text } => {
                    out.push_str(&format!("**{}** {}\n\n", label.trim_end(), text))
                }
                Block::Option(text) => out.push_str(&format!("- {}\n", text)),
                Block::MatchingTable(rows) => {
                    out.push_str("| Cột A | Cột B |\n|---|---|\n");
                    for (left, right) in rows {
                        out.push_str(&format!("| {} | {} |\n", left, right));
                    }
                    out.push('\n');
                }
                Block::Indented(text) => out.push_str(&format!("> {}\n>\n", text)),
                Block::Blank => out.push('\n'),
                Block::PageBreak => out.push_str("\n---\n\n"),
            }
        }
        out
    }
}

/// 题目行的前缀
fn question_label(question: &NumberedQuestion) -> String {
    format!("Câu {} ({} điểm): ", question.number, format_points(question.points))
}

/// 排版试卷
///
/// # 参数
/// - `test`: 试卷
/// - `solution`: 评分指南；提供时追加答案与评分附录
/// - `form`: 表单（科目、时长、班级、分值比例）
/// - `shuffle_seed`: 连线题右列的展示顺序种子
pub fn build_exam_document(
    test: &GeneratedTest,
    solution: Option<&TestSolution>,
    form: &FormConfig,
    shuffle_seed: Option<u64>,
) -> ExamDocument {
    let scores = ScoreBreakdown::new(form.mcq_ratio, test);
    let numbered = number_questions(test, &scores);
    let mut doc = ExamDocument::default();

    // 附答案的版本不印学校和姓名栏
    if solution.is_none() {
        doc.push(Block::Title(SCHOOL_NAME.to_string()));
    }
    doc.push(Block::Title(EXAM_TITLE.to_string()));
    doc.push(Block::Blank);
    doc.line(format!("Môn: {}", form.subject), true);
    doc.line(format!("Thời gian làm bài: {} phút", form.time_limit), false);
    let class_fallback = if solution.is_none() {
        doc.line(format!("Họ và tên: {}", LONG_DOTS), false);
        LONG_DOTS
    } else {
        SHORT_DOTS
    };
    let class_name = if form.class_name.trim().is_empty() {
        class_fallback
    } else {
        form.class_name.as_str()
    };
    doc.line(format!("Lớp: {}", class_name), false);
    doc.push(Block::Blank);

    doc.push(Block::Section(format!(
        "I. PHẦN TRẮC NGHIỆM ({} điểm)",
        format_score(scores.objective_score)
    )));

    for question in &numbered {
        let label = question_label(question);
        match question.kind {
            QuestionKind::TrueFalse => {
                let q = &test.true_false_questions[question.index];
                doc.push(Block::Question {
                    label,
                    text: q.question_text.clone(),
                });
                doc.push(Block::Option("A. Đúng".to_string()));
                doc.push(Block::Option("B. Sai".to_string()));
                doc.push(Block::Blank);
            }
            QuestionKind::Matching => {
                let q = &test.matching_questions[question.index];
                doc.push(Block::Question {
                    label,
                    text: q.prompt.clone(),
                });
                let right = q.display_column_b(shuffle_seed);
                let rows = q
                    .pairs
                    .iter()
                    .zip(right)
                    .enumerate()
                    .map(|(i, (pair, item_b))| {
                        let letter = option_letter(i).unwrap_or('?');
                        (format!("{}. {}", i + 1, pair.item_a), format!("{}. {}", letter, item_b))
                    })
                    .collect();
                doc.push(Block::MatchingTable(rows));
                doc.push(Block::Blank);
            }
            QuestionKind::FillBlank => {
                let q = &test.fill_blank_questions[question.index];
                doc.push(Block::Question {
                    label,
                    text: q.question_text.clone(),
                });
                doc.push(Block::Blank);
            }
            QuestionKind::MultipleChoice => {
                let q = &test.multiple_choice_questions[question.index];
                doc.push(Block::Question {
                    label,
                    text: q.question_text.clone(),
                });
                for (i, option) in q.options.iter().enumerate() {
                    let letter = option_letter(i).unwrap_or('?');
                    doc.push(Block::Option(format!("{}. {}", letter, option)));
                }
                doc.push(Block::Blank);
            }
            QuestionKind::Written => {
                if question.index == 0 {
                    doc.push(Block::Section(format!(
                        "II. PHẦN TỰ LUẬN ({} điểm)",
                        format_score(scores.written_score)
                    )));
                }
                let q = &test.written_questions[question.index];
                doc.push(Block::Question {
                    label,
                    text: q.question_text.clone(),
                });
                // 作答留白
                for _ in 0..3 {
                    doc.push(Block::Blank);
                }
            }
        }
    }

    if test.written_questions.is_empty() {
        doc.push(Block::Section(format!(
            "II. PHẦN TỰ LUẬN ({} điểm)",
            format_score(scores.written_score)
        )));
    }

    if let Some(solution) = solution {
        append_answer_key(&mut doc, test, solution, &numbered);
    }

    doc
}

/// 单道客观题的答案文字
pub fn answer_text(test: &GeneratedTest, question: &NumberedQuestion) -> Option<String> {
    match question.kind {
        QuestionKind::TrueFalse => {
            let q = &test.true_false_questions[question.index];
            Some(if q.correct_answer { "Đúng" } else { "Sai" }.to_string())
        }
        QuestionKind::Matching => {
            let q = &test.matching_questions[question.index];
            Some(
                q.pairs
                    .iter()
                    .map(|p| format!("{} - {}", p.item_a, p.item_b))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
        QuestionKind::FillBlank => Some(test.fill_blank_questions[question.index].correct_answer.clone()),
        QuestionKind::MultipleChoice => test.multiple_choice_questions[question.index]
            .answer_letter()
            .map(String::from),
        QuestionKind::Written => None,
    }
}

fn append_answer_key(
    doc: &mut ExamDocument,
    test: &GeneratedTest,
    solution: &TestSolution,
    numbered: &[NumberedQuestion],
) {
    doc.push(Block::PageBreak);
    doc.push(Block::Title(ANSWER_TITLE.to_string()));
    doc.push(Block::Blank);
    doc.push(Block::Section("I. PHẦN TRẮC NGHIỆM".to_string()));

    for question in numbered.iter().filter(|q| q.kind.is_objective()) {
        let line = match answer_text(test, question) {
            Some(answer) => format!("Câu {}: {}", question.number, answer),
            None => format!("Câu {}:", question.number),
        };
        doc.line(line, false);
    }

    doc.push(Block::Blank);
    doc.push(Block::Section("II. PHẦN TỰ LUẬN - HƯỚNG DẪN CHẤM".to_string()));

    let first_written = test.objective_count() + 1;
    for (i, guide) in solution.written_grading_guides.iter().enumerate() {
        doc.push(Block::Question {
            label: format!("Câu {}: ", first_written + i),
            text: guide.question_text.clone(),
        });
        for line in guide.detailed_guide.lines() {
            doc.push(Block::Indented(line.to_string()));
        }
        doc.push(Block::Blank);
    }
}

/// 导出文件名：科目小写，字母和数字以外的字符一律替换为 "-"
///
/// 文件名中不会出现路径分隔符或 ".."，始终落在输出目录内
pub fn export_file_name(subject: &str, with_solution: bool) -> String {
    let lower = subject.to_lowercase();
    let slug = match Regex::new(r"[^\p{L}\p{M}\p{N}]+") {
        Ok(re) => re.replace_all(&lower, "-").into_owned(),
        Err(_) => lower
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect(),
    };
    let slug = slug.trim_matches('-');
    if with_solution {
        format!("dap-an-de-kiem-tra-{}.md", slug)
    } else {
        format!("de-kiem-tra-{}.md", slug)
    }
}

/// 导出服务
///
/// 职责：
/// - 排版试卷
/// - 写入输出目录
pub struct ExportService {
    output_dir: PathBuf,
    shuffle_seed: Option<u64>,
}

impl ExportService {
    pub fn new(output_dir: impl AsRef<Path>, shuffle_seed: Option<u64>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            shuffle_seed,
        }
    }

    /// 导出试卷（可附评分指南），返回写入的文件路径
    pub async fn export(
        &self,
        test: &GeneratedTest,
        solution: Option<&TestSolution>,
        form: &FormConfig,
    ) -> AppResult<PathBuf> {
        let document = build_exam_document(test, solution, form, self.shuffle_seed);
        let path = self
            .output_dir
            .join(export_file_name(&form.subject, solution.is_some()));

        let failed = |e: std::io::Error| PersistenceError::Failed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(failed)?;
        tokio::fs::write(&path, document.render_markdown())
            .await
            .map_err(failed)?;

        info!("📄 已导出: {}", path.display());
        Ok(path)
    }
}
