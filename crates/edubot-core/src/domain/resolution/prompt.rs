//! Prompt sent to the generative model for curriculum questions

use crate::domain::taxonomy::ContextLabels;

use super::messages::{NO_CURRICULUM, REFUSAL};

/// Build the curriculum-constrained prompt
///
/// Missing labels are written as the "unspecified" placeholder and a
/// missing curriculum as an explicit notice, so the model always sees
/// the same layout.
pub fn build_prompt(question: &str, labels: &ContextLabels, curriculum: Option<&str>) -> String {
    format!(
        "أنت مساعد تعليمي ذكي متخصص في المناهج الدراسية فقط.

معلومات السياق:
الصف الدراسي: {grade}
الفصل الدراسي: {semester}
القسم: {department}

محتوى المنهج المرفوع:
{curriculum}

السؤال: {question}

التعليمات المهمة والملزمة:
1. أجب فقط من محتوى المنهج المرفوع أعلاه
2. إذا لم تجد الإجابة في محتوى المنهج المرفوع، قل: \"{refusal}\"
3. لا تجب على أسئلة عامة أو غير مرتبطة بالمنهج المرفوع
4. اركز على المحتوى التعليمي المقرر فقط
5. لا تخترع معلومات أو تضيف محتوى من خارج المنهج المرفوع
6. استشهد بأجزاء من المنهج عند الإجابة لتأكيد أن الإجابة من المصدر الصحيح",
        grade = labels.grade_or_unspecified(),
        semester = labels.semester_or_unspecified(),
        department = labels.department_or_unspecified(),
        curriculum = curriculum.unwrap_or(NO_CURRICULUM),
        question = question,
        refusal = REFUSAL,
    )
}
