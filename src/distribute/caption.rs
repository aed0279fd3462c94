//! Caption text shared by every platform.

use crate::content::ContentPackage;

pub const BASE_HASHTAGS: [&str; 3] = ["WordOfTheDay", "Vocabulary", "LearnEnglish"];

/// `"<Word> — <first on-screen phrase>\n\n#WordOfTheDay …"` plus any extra
/// hashtags (given with or without a leading `#`).
pub fn build_caption(package: &ContentPackage, extra_hashtags: &[String]) -> String {
    let hook = package
        .on_screen_text()
        .first()
        .map(String::as_str)
        .unwrap_or_default();

    let tags: Vec<String> = BASE_HASHTAGS
        .iter()
        .map(|t| t.to_string())
        .chain(
            extra_hashtags
                .iter()
                .map(|t| t.trim().trim_start_matches('#').to_string())
                .filter(|t| !t.is_empty()),
        )
        .map(|t| format!("#{t}"))
        .collect();

    format!("{} — {hook}\n\n{}", capitalize(package.word()), tags.join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> ContentPackage {
        ContentPackage::from_value(&serde_json::json!({
            "word": "petrichor",
            "definitions": ["one", "two", "three"],
            "narration": "The smell of rain on dry earth.",
            "on_screen_text": ["Rain has a smell", "and it has a name"],
            "background_hex": "#101820"
        }))
        .unwrap()
    }

    #[test]
    fn caption_uses_capitalised_word_and_first_phrase() {
        assert_eq!(
            build_caption(&package(), &[]),
            "Petrichor — Rain has a smell\n\n#WordOfTheDay #Vocabulary #LearnEnglish"
        );
    }

    #[test]
    fn extra_hashtags_are_normalised() {
        let extras = vec!["#M2Encoded".to_string(), " Science ".to_string(), "#".to_string()];
        let caption = build_caption(&package(), &extras);
        assert!(caption.ends_with("#LearnEnglish #M2Encoded #Science"));
    }
}
