//! Rule-based slot extraction
//!
//! Keyword and pattern matching over German, Italian and English queries.
//! Date/time expressions are located and cut out of the text verbatim; they
//! are never interpreted here.

use std::sync::LazyLock;

use async_trait::async_trait;
use domain::{DepArr, Language, ModeFlags, QueryType, RawQueryText};
use regex::Regex;

use super::language::detect_language;
use crate::{
    error::ApplicationError,
    ports::{ExtractedFields, ExtractionPort},
};

/// Compile a static pattern
#[allow(clippy::expect_used)] // Infallible with valid static patterns
fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile static pattern")
}

const WEEKDAYS: &str = "montag|dienstag|mittwoch|donnerstag|freitag|samstag|sonntag|\
monday|tuesday|wednesday|thursday|friday|saturday|sunday|\
lunedì|lunedi|martedì|martedi|mercoledì|mercoledi|giovedì|giovedi|venerdì|venerdi|sabato|domenica";

const DAYPARTS: &str = "morgens|früh|frueh|vormittags|vormittag|nachmittags|nachmittag|mittags|mittag|\
abends|abend|nachts|nacht|mattina|mattino|pomeriggio|sera|notte|morning|afternoon|evening|night|\
tonight|stasera|stamattina|stanotte";

/// Temporal expressions, one alternative per phrase shape
static TEMPORAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(&format!(
        r"(?i)\b(?:(?:um|at|alle\s+ore|alle|ore|gegen|ab|bis|by|per\s+le|entro\s+le|entro)\s+\d{{1,2}}(?:[:.]\d{{2}})?(?:\s*(?:uhr|h|am|pm)\b)?|(?:(?:on\s+the|am|on|il|the|den)\s+)?(?:\d{{4}}-\d{{2}}-\d{{2}}(?:[t\s]+\d{{1,2}}:\d{{2}})?|\d{{1,2}}\.\d{{1,2}}\.(?:\d{{4}})?|\d{{1,2}}/\d{{1,2}}(?:/\d{{4}})?)|\d{{1,2}}[:.]\d{{2}}(?:\s*(?:uhr|h|am|pm)\b)?|\d{{1,2}}\s*(?:uhr|am|pm)\b|in\s+\d{{1,3}}\s+(?:minuten|minute|min|minutes|minuti|stunden|stunde|hours|hour|ore|ora)\b|(?:the\s+)?day\s+after\s+tomorrow\b|übermorgen\b|uebermorgen\b|dopodomani\b|heute\b|today\b|oggi\b|morgen\b|tomorrow\b|domani\b|jetzt\b|sofort\b|now\b|adesso\b|(?:am\s+morgen|(?:(?:am|in\s+the|this|in\s+der|di|la|nel|in)\s+)?(?:{DAYPARTS}))\b|(?:am\s+|this\s+|next\s+|at\s+the\s+|nel\s+|questo\s+)?(?:wochenende|weekend|fine\s+settimana)\b|(?:(?:nächsten|naechsten|nächster|kommenden|next|this|on|am|prossimo|prossima)\s+)?(?:{WEEKDAYS})(?:\s+(?:prossimo|prossima))?\b)"
    ))
});

/// Arrival-anchored prefix of a temporal match
static ARRIVAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)^(?:bis|by|per\s+le|entro)\b"));

/// Clock-bearing temporal match
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\d{1,2}[:.]\d{2}(?:$|\s)|\d\s*(?:uhr|am|pm|h)$|^(?:um|at|alle|ore|gegen|ab)\s|^in\s+\d|^(?:jetzt|sofort|now|adesso)$",
    )
});

/// Arrival verbs anywhere in the text
static ARRIVAL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)\b(?:ankommen|ankunft|arrive|arriving|arrival|arrivo|arrivare)\b")
});

/// Departure-board cue plus the stop name
static DEPARTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\b(?:abfahrten|abfahrtszeiten|abfahrt|departures|departure|partenze|partenza)\b(?:\s+(?:von|ab|an|in|für|at|from|for|da|di|dalla|della|alla))?\s+(?P<stop>.+)$",
    )
});

/// Stop-lookup cue plus the place name
static STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\b(?:haltestellen|haltestelle|stops|stop|fermate|fermata)\b(?:\s+(?:in|bei|near|at|called|namens|für|for|a|di|in zona))?\s+(?P<place>.+)$",
    )
});

/// "von X nach Y" and friends
static TRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\b(?:von|from|da|dal|dalla)\s+(?P<from>.+?)\s+(?:nach|bis|to|a|ad|per|verso)\s+(?P<to>.+)$",
    )
});

/// "X nach Y" without an explicit origin marker
static TRIP_JOIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)^(?P<from>.+?)\s+(?:nach|to|per|verso)\s+(?P<to>.+)$")
});

/// "Bozen - Meran" / "Bozen-Meran"
static TRIP_DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"^(?P<from>[^-–]+?)\s*[-–]\s*(?P<to>[^-–]+)$"));

static DESTINATION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)^(?:nach|to|per|verso|a)\s+(?P<to>.+)$"));

static ORIGIN_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)^(?:von|from|da|dal|dalla|ab)\s+(?P<from>.+)$"));

/// Question scaffolding in front of the places
static LEADING_FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)^(?:wie\s+komme\s+ich|wie\s+kommt\s+man|wie\s+komm\s+ich|ich\s+(?:will|möchte)(?:\s+gerne)?|how\s+(?:do|can)\s+i\s+get|how\s+to\s+get|i\s+(?:want|need)\s+to\s+go|come\s+(?:arrivo|vado|posso\s+andare)|voglio\s+andare|verbindungen?|connections?|collegament[oi]|fahrt|route)\b\s*",
    )
});

/// Mode filter phrases and lone mode words
static MODE_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\b(?:(?:nur\s+mit\s+(?:dem|der)|nur\s+mit|nur|only\s+by|only\s+with|only|solo\s+in|solo\s+con|solo|mit\s+(?:dem|der)|mit|with\s+the|with|con\s+il|con\s+la|con|in|by|ohne|without|senza)\s+)?(?:bus|autobus|zug|züge|train|trains|treno|seilbahn|cable\s*car|funivia|fernverkehr|long[\s-]?distance|lunga\s+distanza)\b",
    )
});

/// Trailing verbs left behind once places are cut out
static TRAILING_FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\s+(?:fahren|kommen|ankommen|reisen|abfahren|go|travel|arrive|andare|arrivare|partire)$",
    )
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\s+"));

const BUS_TERMS: &[&str] = &["bus", "autobus"];
const TRAIN_TERMS: &[&str] = &["zug", "train", "treno"];
const CABLE_CAR_TERMS: &[&str] = &["seilbahn", "cable car", "cablecar", "funivia"];
const LONG_DISTANCE_TERMS: &[&str] = &[
    "fernverkehr",
    "long distance",
    "long-distance",
    "longdistance",
    "lunga distanza",
];
const WITH_WORDS: &[&str] = &["mit", "mit dem", "mit der", "with", "with the", "con"];
const WITHOUT_WORDS: &[&str] = &["ohne", "without", "senza"];
const ONLY_WORDS: &[&str] = &["nur", "nur mit", "nur mit dem", "only", "only by", "solo", "solo in", "solo con"];

/// Located date/time phrases
#[derive(Debug, Default, PartialEq, Eq)]
struct TemporalSlots {
    date_phrase: Option<String>,
    arrival_phrase: Option<String>,
    arrival: bool,
    remainder: String,
}

/// Keyword and pattern based extractor
#[derive(Debug, Clone, Default)]
pub struct RuleBasedExtractor {
    fallback_language: Language,
}

impl RuleBasedExtractor {
    /// Create an extractor that assumes `fallback_language` when no cue is found
    pub const fn new(fallback_language: Language) -> Self {
        Self { fallback_language }
    }

    /// Extract all slots the rules can find
    pub fn extract_fields(&self, raw: &RawQueryText) -> ExtractedFields {
        let text = raw.text();
        let language = raw
            .language()
            .unwrap_or_else(|| detect_language(text, self.fallback_language));

        let temporal = split_temporal(text);
        let arrival_word = ARRIVAL_WORD_RE.is_match(text);
        let modes = parse_mode_filters(text);

        let cleaned = clean_remainder(&temporal.remainder);
        let mut fields = ExtractedFields {
            date_phrase: temporal.date_phrase,
            arrival_phrase: temporal.arrival_phrase,
            dep_or_arr: (temporal.arrival || arrival_word).then_some(DepArr::Arr),
            modes,
            language: Some(language),
            ..ExtractedFields::default()
        };

        if let Some((from, to)) = match_trip(&cleaned) {
            fields.query_type = Some(QueryType::Trip);
            fields.origin = Some(from);
            fields.destination = Some(to);
        } else if let Some(caps) = DEPARTURE_RE.captures(&cleaned) {
            fields.query_type = Some(QueryType::Departure);
            fields.origin = clean_place(&caps["stop"]);
        } else if let Some(caps) = STOP_RE.captures(&cleaned) {
            fields.query_type = Some(QueryType::Stop);
            fields.origin = clean_place(&caps["place"]);
        } else if let Some(caps) = DESTINATION_ONLY_RE.captures(&cleaned) {
            fields.destination = clean_place(&caps["to"]);
        } else if let Some(caps) = ORIGIN_ONLY_RE.captures(&cleaned) {
            fields.origin = clean_place(&caps["from"]);
        } else {
            fields.origin = clean_place(&cleaned);
        }

        fields
    }
}

#[async_trait]
impl ExtractionPort for RuleBasedExtractor {
    async fn extract(&self, text: &RawQueryText) -> Result<ExtractedFields, ApplicationError> {
        Ok(self.extract_fields(text))
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

/// Cut temporal expressions out of the text
fn split_temporal(text: &str) -> TemporalSlots {
    let mut day_and_clock = Vec::new();
    let mut arrival_clock = Vec::new();
    let mut has_departure_clock = false;
    let mut order = Vec::new();

    for m in TEMPORAL_RE.find_iter(text) {
        let phrase = m.as_str().trim().to_string();
        order.push(phrase.clone());
        if ARRIVAL_PREFIX_RE.is_match(&phrase) {
            arrival_clock.push(phrase);
        } else {
            has_departure_clock |= CLOCK_RE.is_match(&phrase);
            day_and_clock.push(phrase);
        }
    }

    let remainder = TEMPORAL_RE.replace_all(text, " ").into_owned();

    if !arrival_clock.is_empty() && has_departure_clock {
        // Two anchors; the query builder rejects this combination
        TemporalSlots {
            date_phrase: join_phrases(&day_and_clock),
            arrival_phrase: join_phrases(&arrival_clock),
            arrival: false,
            remainder,
        }
    } else {
        TemporalSlots {
            date_phrase: join_phrases(&order),
            arrival_phrase: None,
            arrival: !arrival_clock.is_empty(),
            remainder,
        }
    }
}

fn join_phrases(parts: &[String]) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Strip filler, mode phrases and punctuation around the place names
fn clean_remainder(remainder: &str) -> String {
    let without_modes = MODE_PHRASE_RE.replace_all(remainder, " ");
    let without_arrival = ARRIVAL_WORD_RE.replace_all(&without_modes, " ");
    let collapsed = WHITESPACE_RE.replace_all(without_arrival.trim(), " ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || "?!.,;:".contains(c));
    let without_lead = LEADING_FILLER_RE.replace(trimmed, "");
    without_lead.trim().to_string()
}

/// Two-place patterns in priority order
fn match_trip(cleaned: &str) -> Option<(String, String)> {
    let caps = TRIP_RE
        .captures(cleaned)
        .or_else(|| TRIP_JOIN_RE.captures(cleaned))
        .or_else(|| {
            if DEPARTURE_RE.is_match(cleaned) || STOP_RE.is_match(cleaned) {
                None
            } else {
                TRIP_DASH_RE.captures(cleaned)
            }
        })?;
    let from = clean_place(&caps["from"])?;
    let to = clean_place(&caps["to"])?;
    Some((from, to))
}

/// Trim punctuation and trailing verbs from a place name
fn clean_place(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || "?!.,;:\"'".contains(c));
    let trimmed = TRAILING_FILLER_RE.replace(trimmed, "");
    let place = WHITESPACE_RE.replace_all(trimmed.trim(), " ").into_owned();
    (!place.is_empty()).then_some(place)
}

fn mentions(lower: &str, prefixes: &[&str], terms: &[&str]) -> bool {
    prefixes.iter().any(|w| {
        terms
            .iter()
            .any(|t| contains_word(lower, &format!("{w} {t}")))
    })
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Parse with/without/only mode filters
///
/// Returns `None` when no mode is mentioned at all.
fn parse_mode_filters(text: &str) -> Option<ModeFlags> {
    let lower = text.to_lowercase();
    let mut flags = ModeFlags::default();
    let mut explicit = false;

    for (terms, set) in mode_setters() {
        if mentions(&lower, WITHOUT_WORDS, terms) {
            set(&mut flags, false);
            explicit = true;
        }
    }
    for (terms, set) in mode_setters() {
        if mentions(&lower, WITH_WORDS, terms) {
            set(&mut flags, true);
            explicit = true;
        }
    }
    for (terms, set) in mode_setters() {
        if mentions(&lower, ONLY_WORDS, terms) {
            flags = ModeFlags::none();
            set(&mut flags, true);
            explicit = true;
        }
    }
    if explicit {
        return Some(flags);
    }

    // A lone mode mention restricts to that mode
    let mentioned: Vec<_> = mode_setters()
        .into_iter()
        .filter(|(terms, _)| terms.iter().any(|t| contains_word(&lower, t)))
        .collect();
    match mentioned.as_slice() {
        [(_, set)] => {
            let mut only = ModeFlags::none();
            set(&mut only, true);
            Some(only)
        },
        _ => None,
    }
}

type ModeSetter = fn(&mut ModeFlags, bool);

fn mode_setters() -> [(&'static [&'static str], ModeSetter); 4] {
    [
        (BUS_TERMS, |f: &mut ModeFlags, v: bool| f.bus = v),
        (TRAIN_TERMS, |f: &mut ModeFlags, v: bool| f.train = v),
        (CABLE_CAR_TERMS, |f: &mut ModeFlags, v: bool| f.cable_car = v),
        (LONG_DISTANCE_TERMS, |f: &mut ModeFlags, v: bool| f.long_distance = v),
    ]
}
