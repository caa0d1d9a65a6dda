//! Lexical language detection for short transit queries

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use domain::Language;

/// Cue words per language, padded so matches land on word boundaries
const CUES: &[(&str, Language)] = &[
    (" von ", Language::De),
    (" nach ", Language::De),
    (" abfahrt ", Language::De),
    (" abfahrten ", Language::De),
    (" haltestelle ", Language::De),
    (" haltestellen ", Language::De),
    (" heute ", Language::De),
    (" morgen ", Language::De),
    (" übermorgen ", Language::De),
    (" um ", Language::De),
    (" uhr ", Language::De),
    (" wie ", Language::De),
    (" komme ", Language::De),
    (" ich ", Language::De),
    (" mit ", Language::De),
    (" ohne ", Language::De),
    (" nur ", Language::De),
    (" zug ", Language::De),
    (" seilbahn ", Language::De),
    (" wann ", Language::De),
    (" nächsten ", Language::De),
    (" ankunft ", Language::De),
    (" jetzt ", Language::De),
    (" fährt ", Language::De),
    (" bis ", Language::De),
    (" da ", Language::It),
    (" per ", Language::It),
    (" partenze ", Language::It),
    (" partenza ", Language::It),
    (" fermata ", Language::It),
    (" fermate ", Language::It),
    (" oggi ", Language::It),
    (" domani ", Language::It),
    (" dopodomani ", Language::It),
    (" alle ", Language::It),
    (" ore ", Language::It),
    (" come ", Language::It),
    (" arrivo ", Language::It),
    (" con ", Language::It),
    (" senza ", Language::It),
    (" solo ", Language::It),
    (" treno ", Language::It),
    (" funivia ", Language::It),
    (" prossimo ", Language::It),
    (" prossima ", Language::It),
    (" quando ", Language::It),
    (" voglio ", Language::It),
    (" adesso ", Language::It),
    (" from ", Language::En),
    (" to ", Language::En),
    (" departures ", Language::En),
    (" departure ", Language::En),
    (" stop ", Language::En),
    (" stops ", Language::En),
    (" today ", Language::En),
    (" tomorrow ", Language::En),
    (" at ", Language::En),
    (" how ", Language::En),
    (" get ", Language::En),
    (" with ", Language::En),
    (" without ", Language::En),
    (" only ", Language::En),
    (" train ", Language::En),
    (" next ", Language::En),
    (" the ", Language::En),
    (" when ", Language::En),
    (" now ", Language::En),
    (" arrive ", Language::En),
    (" by ", Language::En),
    (" i ", Language::En),
];

static CUE_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    let patterns: Vec<&str> = CUES.iter().map(|(cue, _)| *cue).collect();
    #[allow(clippy::expect_used)] // Infallible with valid static patterns
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .expect("Failed to build language cue matcher")
});

/// Detect the query language from lexical cues
///
/// Returns `fallback` when no cue is found or the counts tie.
pub fn detect_language(text: &str, fallback: Language) -> Language {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let padded = format!(" {normalized} ");

    let mut counts = [0usize; 3];
    for m in CUE_MATCHER.find_overlapping_iter(&padded) {
        let (_, language) = CUES[m.pattern().as_usize()];
        counts[index(language)] += 1;
    }

    let best = counts.iter().copied().max().unwrap_or(0);
    if best == 0 {
        return fallback;
    }
    let winners: Vec<Language> = Language::ALL
        .into_iter()
        .filter(|l| counts[index(*l)] == best)
        .collect();
    match winners.as_slice() {
        [single] => *single,
        _ if winners.contains(&fallback) => fallback,
        _ => winners.first().copied().unwrap_or(fallback),
    }
}

const fn index(language: Language) -> usize {
    match language {
        Language::De => 0,
        Language::It => 1,
        Language::En => 2,
    }
}
