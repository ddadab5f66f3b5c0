use crate::emotion::EmotionTag;
use regex::Regex;
use std::sync::OnceLock;

/// One run of text spoken with a single emotion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmotionalSegment {
    pub text: String,
    pub emotion: EmotionTag,
}

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"\[([A-Za-z]+)\]").expect("static tag pattern"))
}

/// Split annotated text into ordered `(text, emotion)` segments.
///
/// Text before the first tag is spoken as [`EmotionTag::Neutral`]; each tag
/// switches the current emotion until the next tag or end of input. Tag
/// names outside the closed vocabulary are accepted syntactically and
/// coerced to neutral. Segments that are empty after the whitespace
/// following a tag is skipped are dropped.
///
/// Invariant: concatenating the returned segment texts, in order,
/// reproduces [`strip_tags`] of the same input exactly. Both functions are
/// built from the same tokenizer so this holds by construction.
pub fn parse(raw_text: &str) -> Vec<EmotionalSegment> {
    pieces(raw_text)
        .into_iter()
        .filter(|(text, _)| !text.is_empty())
        .map(|(text, emotion)| EmotionalSegment {
            text: text.to_owned(),
            emotion,
        })
        .collect()
}

/// Remove every `[TAG]` marker (and the whitespace immediately following
/// it) from `raw_text`, preserving all other text. Leading whitespace of
/// the result is trimmed. This is the clean text used for display and as
/// the coordinate space for progress offsets.
pub fn strip_tags(raw_text: &str) -> String {
    let mut out = String::with_capacity(raw_text.len());
    for (text, _) in pieces(raw_text) {
        out.push_str(text);
    }
    out
}

/// Tokenize into `(text_slice, emotion)` pieces. The slice after each tag
/// has the tag's trailing whitespace skipped; the slice before the first
/// tag has its leading whitespace skipped. Trailing whitespace is kept.
/// Pieces may be empty; callers decide whether to drop them.
fn pieces(raw_text: &str) -> Vec<(&str, EmotionTag)> {
    let mut out = Vec::new();
    let mut current = EmotionTag::Neutral;
    let mut cursor = 0usize;

    for caps in tag_re().captures_iter(raw_text) {
        let whole = caps.get(0).expect("match always has group 0");
        let name = caps.get(1).expect("tag pattern has one capture");

        // Text since the previous tag (or the start of input). The
        // trim_start drops the previous tag's trailing whitespace, or the
        // input's leading whitespace for the first piece.
        let before = &raw_text[cursor..whole.start()];
        out.push((before.trim_start(), current));

        current = match EmotionTag::from_tag_name(name.as_str()) {
            Some(tag) => tag,
            None => {
                tracing::warn!(tag = name.as_str(), "unknown emotion tag, using neutral");
                EmotionTag::Neutral
            }
        };
        cursor = whole.end();
    }

    out.push((raw_text[cursor..].trim_start(), current));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_tagged_segments() {
        let raw = "[MOCKING] Still here? [THREATENING] Answer me.";
        let segments = parse(raw);
        assert_eq!(
            segments,
            vec![
                EmotionalSegment {
                    text: "Still here? ".to_owned(),
                    emotion: EmotionTag::Mocking,
                },
                EmotionalSegment {
                    text: "Answer me.".to_owned(),
                    emotion: EmotionTag::Threatening,
                },
            ]
        );
        assert_eq!(strip_tags(raw), "Still here? Answer me.");
    }

    #[test]
    fn untagged_text_is_one_neutral_segment() {
        let segments = parse("Hello there");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[0].emotion, EmotionTag::Neutral);
    }

    #[test]
    fn unknown_tag_coerces_to_neutral() {
        let segments = parse("[FOOBAR] hi");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "hi");
        assert_eq!(segments[0].emotion, EmotionTag::Neutral);
    }

    #[test]
    fn leading_untagged_text_is_neutral() {
        let segments = parse("Well well. [SINISTER] I see you.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Well well. ");
        assert_eq!(segments[0].emotion, EmotionTag::Neutral);
        assert_eq!(segments[1].text, "I see you.");
        assert_eq!(segments[1].emotion, EmotionTag::Sinister);
    }

    #[test]
    fn whitespace_only_runs_are_dropped() {
        let segments = parse("[ANGRY]   [CALCULATING] compute.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].emotion, EmotionTag::Calculating);
        assert_eq!(segments[0].text, "compute.");
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        let segments = parse("[whisper] closer... [URGENT] now!");
        assert_eq!(segments[0].emotion, EmotionTag::Whisper);
        assert_eq!(segments[1].emotion, EmotionTag::Urgent);
    }

    #[test]
    fn strip_round_trip_matches_segment_concatenation() {
        let cases = [
            "[MOCKING] Still here? [THREATENING] Answer me.",
            "no tags at all",
            "lead in [ANGRY] WRONG. [FOOBAR] whatever [WHISPER] soft",
            "[ANGRY]   [CALCULATING] compute.",
            "  leading spaces [EXCITED] yes!  ",
            "[SINISTER]",
            "",
        ];
        for raw in cases {
            let joined: String = parse(raw).into_iter().map(|s| s.text).collect();
            assert_eq!(joined, strip_tags(raw), "round trip failed for {raw:?}");
        }
    }

    #[test]
    fn adjacent_brackets_without_tag_text_are_left_alone() {
        // "[]" does not match the tag grammar and stays in the text.
        let raw = "[] literal brackets";
        assert_eq!(strip_tags(raw), "[] literal brackets");
        let segments = parse(raw);
        assert_eq!(segments[0].text, "[] literal brackets");
    }
}
