//! User-facing text, kept in the upstream audience's language.
//!
//! The transport renders these verbatim; nothing here affects control flow.

use crate::resolver::pipeline::ResolvedEpisode;
use crate::resolver::sequencer::StopReason;

pub const HELP: &str = "ابعت لينك حلقة/فيلم وأنا أرجّعلك روابط التحميل.";
pub const AUTORUN_QUESTION: &str = "تشغّل أوتورِن للحلقات اللي بعدها؟ (y/n)";
pub const AUTORUN_STARTED: &str = "تمام ✅ هبدأ أوتورِن… هيوصلك الحلقات واحدة ورا التانية.";
pub const SINGLE_STARTED: &str = "تمام ✅ هعالج الحلقة دي بس…";
pub const NOT_FOUND: &str = "مش لاقي روابط للينك ده أو المحتوى مش متاح.";
pub const TRANSIENT: &str = "حصل خطأ مؤقت أثناء المعالجة. جرّب تاني.";
pub const EXPIRED: &str = "انتهت صلاحية الطلب، ابعت اللينك تاني.";
pub const BUSY: &str = "في طلب شغّال ليك دلوقتي، استنى يخلص الأول.";

const HEADER: &str = "⭕ تــحـــمــيـــل عـــــــرب ســـيـــــد مـبــــاشـــــر 🗂";
const RULE: &str = "ـ━━━━━━━━━━━━━━━━━━━━━━";

/// Header block shown above the download options for one result.
pub fn result_header(result: &ResolvedEpisode, episode: Option<u32>) -> String {
    match episode {
        Some(episode) => format!(
            "{HEADER}\n{RULE}\n⌯ {}\n📺 الحلقة: {}\n\n📁 اختر جودة التحميل:",
            result.title, episode
        ),
        None => format!("{HEADER}\n{RULE}\n⌯ {}\n\n📁 اختر جودة التحميل:", result.title),
    }
}

/// Localized explanation for a stopped sequence; `episode` is the number
/// the sequence was about to deliver.
pub fn stop_message(reason: StopReason, episode: Option<u32>) -> String {
    match (reason, episode) {
        (StopReason::CannotDetermineEpisode, _) => {
            "مش لاقي رقم الحلقة في اللينك—أوتورِن اتلغى.".to_string()
        }
        (StopReason::CannotBuildUrl, Some(n)) => {
            format!("فشلت أبني لينك الحلقة {n} — هوقف.")
        }
        (StopReason::CannotBuildUrl, None) => "فشلت أبني لينك الحلقة — هوقف.".to_string(),
        (StopReason::EpisodeNotFound, Some(n)) => {
            format!("مفيش حلقة {n} أو مفيش روابط—أوتورن وقف ✅")
        }
        (StopReason::EpisodeNotFound, None) => {
            "مفيش حلقات تانية أو مفيش روابط—أوتورن وقف ✅".to_string()
        }
        (StopReason::TransientError, Some(n)) => {
            format!("حصل خطأ أثناء معالجة الحلقة {n} — أوتورِن وقف.")
        }
        (StopReason::TransientError, None) => {
            "حصل خطأ أثناء المعالجة — أوتورِن وقف.".to_string()
        }
        (StopReason::Cancelled, _) => "اتلغى الأوتورن.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_header_with_episode() {
        let result = ResolvedEpisode {
            title: "مسلسل اسم الحلقة 12".to_string(),
            candidates: Vec::new(),
        };
        let header = result_header(&result, Some(12));
        assert!(header.contains("مسلسل اسم الحلقة 12"));
        assert!(header.contains("الحلقة: 12"));

        let without = result_header(&result, None);
        assert!(!without.contains("📺"));
    }

    #[test]
    fn test_stop_message_numbers_the_episode() {
        let message = stop_message(StopReason::EpisodeNotFound, Some(6));
        assert!(message.contains('6'));
    }
}
