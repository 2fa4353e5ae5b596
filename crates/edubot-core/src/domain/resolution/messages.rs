//! Fixed user-facing texts

use crate::extraction::FileKind;

/// Replies that accept a held-back answer
pub const ACCEPT_PHRASES: [&str; 5] = ["نعم", "اه", "موافق", "yes", "نعم أريد الإجابة"];

pub const CANCELLED: &str = "تم إلغاء الإجابة. يمكنك إعادة صياغة السؤال أو مراجعة المعلم.";

pub const CONFIRMATION_PROMPT: &str = "لم أتمكن من التأكد من أن هذه الإجابة مأخوذة من المنهج المرفوع. \
هل تريد عرضها رغم ذلك؟ أجب بـ \"نعم\" للعرض أو بأي رد آخر للإلغاء.";

pub const UNSUPPORTED_FILE: &str = "نوع الملف غير مدعوم للتحليل";

pub const INVALID_FILE: &str = "اسم الملف غير صالح";

pub const MISSING_FILE: &str = "الملف غير موجود";

pub const FILE_PROCESSING_FAILED: &str = "حدث خطأ في معالجة الملف المرفوع";

pub const NO_CURRICULUM: &str = "لا يوجد محتوى منهج مرفوع لهذه الفرقة والقسم";

pub const REFUSAL: &str =
    "هذا السؤال غير موجود في المنهج المرفوع. يرجى مراجعة المنهج أو سؤال المدرس.";

/// Whether a confirmation reply accepts the held-back answer
pub fn is_accept_phrase(reply: &str) -> bool {
    let reply = reply.trim().to_lowercase();
    ACCEPT_PHRASES.iter().any(|phrase| *phrase == reply)
}

/// Apology used when no stage produced an answer
pub fn deflection(department: Option<&str>) -> String {
    format!(
        "عذراً، لم أتمكن من العثور على إجابة دقيقة لسؤالك حول {}. \
يرجى إعادة صياغة السؤال بطريقة أوضح أو مراجعة معلمك للحصول على معلومات متخصصة عن هذا الموضوع.",
        department.unwrap_or("هذا الموضوع")
    )
}

/// Apology for a file of the given kind that could not be read
pub fn extraction_failed(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => "حدث خطأ في تحليل الصورة",
        FileKind::Document => "حدث خطأ في تحليل المستند",
        FileKind::Audio => "حدث خطأ في تحليل الملف الصوتي",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_phrases() {
        assert!(is_accept_phrase("نعم"));
        assert!(is_accept_phrase("  YES "));
        assert!(is_accept_phrase("نعم أريد الإجابة"));
        assert!(!is_accept_phrase("لا"));
        assert!(!is_accept_phrase("yes please"));
    }

    #[test]
    fn test_deflection_names_department() {
        assert!(deflection(Some("الفيزياء")).contains("حول الفيزياء."));
        assert!(deflection(None).contains("حول هذا الموضوع."));
    }
}
