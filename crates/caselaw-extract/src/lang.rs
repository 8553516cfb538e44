//! Closed word-list language detection (spec.md §4.2).
//!
//! Ported from `examples/original_source/scrapers/bger.py`'s `_LANG_WORDS`
//! — function-word regexes for DE/FR/IT, scored by match count, default
//! `"de"` on a tie or no signal (the scraper's own fallback, since the
//! overwhelming majority of federal decisions are German).

use std::sync::OnceLock;

use regex::Regex;

fn de_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:der|die|das|ein|eine|einer|er|sie|ihn|hat|hatte|h\u{e4}tte|ist|war|sind)\b")
            .expect("static")
    })
}

fn fr_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:le|lui|elle|je|on|vous|nous|leur|qui|quand|parce|que|faire|sont|vont)\b")
            .expect("static")
    })
}

fn it_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:della|del|di|casi|una|al|questa|pi\u{f9}|primo|grado|che|diritto|leggi|corte)\b")
            .expect("static")
    })
}

/// Detect `de`/`fr`/`it` from a sample of decision text. Romansh (`rm`) has
/// no closed-word-list detector here (too little training text in the
/// corpus this was ported from); Romansh decisions carry an explicit
/// `language` field from their source extractor instead of relying on
/// detection.
#[must_use]
pub fn detect_language(text: &str) -> &'static str {
    // Cap the sample so detection is O(1) in document length, matching the
    // original's practice of scoring only the leading portion of long texts.
    let sample: String = text.chars().take(5000).collect();

    let de = de_words().find_iter(&sample).count();
    let fr = fr_words().find_iter(&sample).count();
    let it = it_words().find_iter(&sample).count();

    if de >= fr && de >= it {
        "de"
    } else if fr >= it {
        "fr"
    } else {
        "it"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_german() {
        assert_eq!(
            detect_language("Der Kläger hat die Klage eingereicht und das Gericht war zuständig."),
            "de"
        );
    }

    #[test]
    fn detects_french() {
        assert_eq!(
            detect_language("Le recourant lui a fait savoir que nous vous informons qu'ils sont."),
            "fr"
        );
    }

    #[test]
    fn detects_italian() {
        assert_eq!(
            detect_language("La corte di diritto della Confederazione ha respinto il primo grado."),
            "it"
        );
    }

    #[test]
    fn falls_back_to_german_with_no_signal() {
        assert_eq!(detect_language("12345 !!! ???"), "de");
    }
}
