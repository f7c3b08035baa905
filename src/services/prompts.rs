//! 提示词构建
//!
//! 三个生成步骤各一个构建函数，返回 `(user_message, system_message)`。
//! 输出结构以 JSON 示例的形式写进提示词，响应由 `llm_service` 解析校验。

use crate::models::exam::GeneratedTest;
use crate::models::form::FormConfig;
use crate::models::matrix::TestMatrix;
use crate::models::scoring::{format_points, format_score, ScoreBreakdown};
use crate::models::topic::LessonTopic;

const MATRIX_SCHEMA: &str = r#"[
  {
    "topic": "string (trùng khớp tên bài học)",
    "mcq": { "recognition": 0, "comprehension": 0, "application": 0 },
    "written": { "recognition": 0, "comprehension": 0, "application": 0 }
  }
]"#;

const TEST_SCHEMA: &str = r#"{
  "multipleChoiceQuestions": [
    { "questionText": "string", "options": ["string"], "correctAnswer": "string", "cognitiveLevel": "Nhận biết | Thông hiểu | Vận dụng" }
  ],
  "trueFalseQuestions": [
    { "questionText": "string", "correctAnswer": true, "cognitiveLevel": "..." }
  ],
  "matchingQuestions": [
    { "prompt": "string", "pairs": [{ "itemA": "string", "itemB": "string" }], "cognitiveLevel": "..." }
  ],
  "fillBlankQuestions": [
    { "questionText": "string có chứa ___", "correctAnswer": "string", "cognitiveLevel": "..." }
  ],
  "writtenQuestions": [
    { "questionText": "string", "suggestedAnswer": "string", "cognitiveLevel": "..." }
  ]
}"#;

const SOLUTION_SCHEMA: &str = r#"{
  "writtenGradingGuides": [
    { "questionText": "string (trùng khớp câu hỏi)", "detailedGuide": "string" }
  ]
}"#;

const JSON_ONLY: &str = "Chỉ trả về JSON hợp lệ theo đúng cấu trúc dưới đây, không kèm giải thích hay markdown.";

fn topic_lines(topics: &[LessonTopic]) -> String {
    topics
        .iter()
        .map(|t| {
            format!(
                "- \"{}\" (trang {} đến trang {})",
                t.name.trim(),
                t.start_page,
                t.end_page
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 矩阵提示词
pub fn matrix_prompt(form: &FormConfig, context: &str) -> (String, String) {
    let system_message = format!(
        "Bạn là chuyên gia xây dựng ma trận đề kiểm tra cho trường tiểu học Việt Nam. {}",
        JSON_ONLY
    );

    let user_message = format!(
        r#"Hãy lập ma trận đề kiểm tra môn {subject}.

Nội dung sách giáo khoa (văn bản bên dưới, hình ảnh các trang được đính kèm):
---
{context}
---

Các bài học và phạm vi trang:
{topics}

Cấu trúc đề:
- Số câu trắc nghiệm: {mcq_count}
- Số câu tự luận: {written_count}
- Tỉ lệ điểm: trắc nghiệm {mcq_ratio}%, tự luận {written_ratio}%

Tỉ lệ mức độ nhận thức trên toàn đề:
- Nhận biết: {recognition}%
- Thông hiểu: {comprehension}%
- Vận dụng: {application}%

Yêu cầu:
1. Mỗi bài học ở trên là đúng một hàng; cột "topic" ghi chính xác tên bài học.
2. Tổng số câu của cả ma trận phải bằng đúng số câu đã cho.
3. Phân bổ theo mức độ nhận thức sát nhất với tỉ lệ đã cho, dựa trên nội dung trong phạm vi trang.

Cấu trúc JSON:
{schema}"#,
        subject = form.subject,
        context = context,
        topics = topic_lines(&form.lesson_topics),
        mcq_count = form.mcq_count,
        written_count = form.written_count,
        mcq_ratio = form.mcq_ratio,
        written_ratio = form.written_ratio(),
        recognition = form.recognition_ratio,
        comprehension = form.comprehension_ratio,
        application = form.application_ratio,
        schema = MATRIX_SCHEMA,
    );

    (user_message, system_message)
}

/// 试卷提示词
pub fn test_prompt(form: &FormConfig, matrix: &TestMatrix, context: &str) -> (String, String) {
    let system_message = format!(
        "Bạn là trợ lý soạn đề kiểm tra tiểu học theo Thông tư 27/2020/TT-BGDĐT. {}",
        JSON_ONLY
    );

    let matrix_json = serde_json::to_string_pretty(matrix).unwrap_or_default();
    let selected_types = form.mcq_types.selected_labels().join(", ");

    let user_message = format!(
        r#"Soạn đề kiểm tra môn {subject} theo ma trận sau:
---
{matrix}
---

Các bài học và phạm vi trang:
{topics}

Tỉ lệ điểm: trắc nghiệm {mcq_ratio}%, tự luận {written_ratio}%.

Nội dung sách giáo khoa (văn bản bên dưới, hình ảnh các trang được đính kèm):
---
{context}
---

Yêu cầu:
- Có đúng {mcq_count} câu trắc nghiệm, chia vào các dạng: {selected_types}.
- Số câu theo từng bài học, từng phần và từng mức độ phải đúng như ma trận.
- Nội dung bám sát phạm vi trang của bài học tương ứng; ngôn ngữ phù hợp học sinh tiểu học.
- Nhiều lựa chọn: 4 phương án, một đáp án đúng, "correctAnswer" trùng nguyên văn một phương án.
- Đúng - Sai: "correctAnswer" là true hoặc false.
- Ghép đôi: một câu dẫn và 3-5 cặp.
- Điền khuyết: câu hỏi chứa '___' tại chỗ trống.
- Tự luận: kèm câu trả lời gợi ý.
- Dạng không được chọn thì trả về mảng rỗng.

Cấu trúc JSON:
{schema}"#,
        subject = form.subject,
        matrix = matrix_json,
        topics = topic_lines(&form.lesson_topics),
        mcq_ratio = form.mcq_ratio,
        written_ratio = form.written_ratio(),
        context = context,
        mcq_count = form.mcq_count,
        selected_types = selected_types,
        schema = TEST_SCHEMA,
    );

    (user_message, system_message)
}

/// 评分指南提示词（不需要教材内容）
pub fn solution_prompt(form: &FormConfig, test: &GeneratedTest) -> (String, String) {
    let system_message = format!(
        "Bạn là chuyên gia giáo dục tiểu học, chuyên viết hướng dẫn chấm bài tự luận. {}",
        JSON_ONLY
    );

    let scores = ScoreBreakdown::new(form.mcq_ratio, test);
    let questions = test
        .written_questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("Câu {}: {}", i + 1, q.question_text))
        .collect::<Vec<_>>()
        .join("\n");

    let user_message = format!(
        r#"Môn học: {subject}
Tổng điểm phần tự luận: {written_score} điểm
Số câu tự luận: {count}
Điểm mỗi câu: {points} điểm

Các câu hỏi tự luận:
---
{questions}
---

Yêu cầu:
1. Mỗi câu hỏi trên có đúng một hướng dẫn chấm, theo đúng thứ tự.
2. Nêu các ý chính cần có và điểm cho từng ý; tổng điểm mỗi câu xấp xỉ điểm mỗi câu ở trên.
3. "questionText" chép nguyên văn câu hỏi.

Cấu trúc JSON:
{schema}"#,
        subject = form.subject,
        written_score = format_score(scores.written_score),
        count = test.written_count(),
        points = format_points(scores.points_per_written),
        questions = questions,
        schema = SOLUTION_SCHEMA,
    );

    (user_message, system_message)
}
