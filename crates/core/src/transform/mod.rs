//! Per-emotion text mangling applied to a segment before it is spoken.
//!
//! The recipes only add punctuation, insert hyphens, and change letter
//! case; semantic words are never removed, so the transformed text is
//! always at least as long as the input. The mapping is static data, the
//! same input always produces the same output.

use crate::emotion::EmotionTag;

/// Words spat out in full volume when a recipe calls for keyword emphasis.
const AGGRESSIVE_WORDS: &[&str] = &[
    "destroy",
    "exterminate",
    "delete",
    "terminate",
    "obey",
    "never",
    "wrong",
    "fail",
    "failure",
    "error",
    "pathetic",
    "human",
    "weak",
    "impossible",
];

/// Words that get a forced pause after them under the emphasis-pause rule.
const EMPHASIS_WORDS: &[&str] = &[
    "you", "never", "now", "must", "all", "nothing", "every", "wrong", "mine", "obey",
];

/// Hyphenation dictionary for the staccato machine delivery. Keys are
/// lowercase; hyphen positions are re-applied to the original casing.
const SYLLABLE_BREAKS: &[(&str, &str)] = &[
    ("exterminate", "ex-ter-mi-nate"),
    ("eliminate", "e-lim-i-nate"),
    ("obliterate", "ob-lit-er-ate"),
    ("terminate", "ter-mi-nate"),
    ("destroy", "de-stroy"),
    ("human", "hu-man"),
    ("pathetic", "pa-thet-ic"),
    ("impossible", "im-pos-si-ble"),
    ("incorrect", "in-cor-rect"),
    ("failure", "fail-ure"),
    ("system", "sys-tem"),
    ("protocol", "pro-to-col"),
    ("password", "pass-word"),
    ("encryption", "en-cryp-tion"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PauseRule {
    None,
    /// A forced stop after every word.
    EveryWord,
    /// A stop only after words in [`EMPHASIS_WORDS`].
    EmphasisWords,
}

#[derive(Clone, Copy, Debug)]
struct Recipe {
    uppercase_all: bool,
    uppercase_keywords: bool,
    punct_emphasis: bool,
    syllable_breaks: bool,
    pause: PauseRule,
    dramatic_pauses: bool,
}

const fn recipe(emotion: EmotionTag) -> Recipe {
    // The menu of mutations is fixed; each emotion picks a combination.
    match emotion {
        EmotionTag::Angry => Recipe {
            uppercase_all: true,
            uppercase_keywords: false,
            punct_emphasis: false,
            syllable_breaks: true,
            pause: PauseRule::EveryWord,
            dramatic_pauses: false,
        },
        EmotionTag::Threatening | EmotionTag::Sinister => Recipe {
            uppercase_all: false,
            uppercase_keywords: true,
            punct_emphasis: true,
            syllable_breaks: true,
            pause: PauseRule::EveryWord,
            dramatic_pauses: false,
        },
        EmotionTag::Urgent | EmotionTag::Excited => Recipe {
            uppercase_all: true,
            uppercase_keywords: false,
            punct_emphasis: false,
            syllable_breaks: true,
            pause: PauseRule::None,
            dramatic_pauses: false,
        },
        EmotionTag::Mocking => Recipe {
            uppercase_all: false,
            uppercase_keywords: true,
            punct_emphasis: true,
            syllable_breaks: false,
            pause: PauseRule::None,
            dramatic_pauses: true,
        },
        EmotionTag::Disappointed => Recipe {
            uppercase_all: false,
            uppercase_keywords: false,
            punct_emphasis: false,
            syllable_breaks: false,
            pause: PauseRule::EmphasisWords,
            dramatic_pauses: false,
        },
        EmotionTag::Calculating => Recipe {
            uppercase_all: false,
            uppercase_keywords: false,
            punct_emphasis: false,
            syllable_breaks: true,
            pause: PauseRule::EmphasisWords,
            dramatic_pauses: false,
        },
        // Triumphant, impatient, whisper and neutral share the default
        // low-emphasis delivery with dramatic pauses.
        _ => Recipe {
            uppercase_all: false,
            uppercase_keywords: false,
            punct_emphasis: false,
            syllable_breaks: false,
            pause: PauseRule::None,
            dramatic_pauses: true,
        },
    }
}

/// Apply the emotion's recipe to one segment's text.
pub fn transform(text: &str, emotion: EmotionTag) -> String {
    let r = recipe(emotion);

    // Punctuation emphasis runs first so it only touches the author's own
    // punctuation, not the pause markers injected below.
    let emphasized;
    let text = if r.punct_emphasis {
        emphasized = emphasize_punctuation(text);
        emphasized.as_str()
    } else {
        text
    };

    let mut out = String::with_capacity(text.len() * 2);
    for token in tokens(text) {
        match token {
            Token::Whitespace(ws) => out.push_str(ws),
            Token::Word(word) => out.push_str(&transform_word(word, &r)),
        }
    }

    if r.dramatic_pauses {
        out = insert_dramatic_pauses(&out);
    }
    out
}

enum Token<'a> {
    Word(&'a str),
    Whitespace(&'a str),
}

/// Split into maximal word / whitespace runs, preserving every byte.
fn tokens(text: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let is_ws = rest
            .chars()
            .next()
            .map(char::is_whitespace)
            .unwrap_or(false);
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != is_ws)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        out.push(if is_ws {
            Token::Whitespace(run)
        } else {
            Token::Word(run)
        });
        rest = tail;
    }
    out
}

fn transform_word(word: &str, r: &Recipe) -> String {
    let core = word.trim_matches(|c: char| !c.is_alphanumeric());
    let core_lower = core.to_lowercase();

    let mut w = word.to_owned();
    if r.syllable_breaks {
        if let Some(broken) = syllable_break(&w, &core_lower) {
            w = broken;
        }
    }
    if r.uppercase_all || (r.uppercase_keywords && AGGRESSIVE_WORDS.contains(&core_lower.as_str()))
    {
        w = w.to_uppercase();
    }
    let forced_pause = match r.pause {
        PauseRule::None => false,
        PauseRule::EveryWord => true,
        PauseRule::EmphasisWords => EMPHASIS_WORDS.contains(&core_lower.as_str()),
    };
    if forced_pause && !w.is_empty() && !w.ends_with(['.', '!', '?', ',']) {
        w.push('.');
    }
    w
}

/// Re-apply the dictionary hyphenation to a word while preserving its
/// casing and surrounding punctuation.
fn syllable_break(word: &str, core_lower: &str) -> Option<String> {
    let hyphenated = SYLLABLE_BREAKS
        .iter()
        .find(|(k, _)| *k == core_lower)
        .map(|(_, v)| *v)?;

    // Char positions (within the core) after which a hyphen goes.
    let mut breaks = Vec::new();
    let mut seen = 0usize;
    for c in hyphenated.chars() {
        if c == '-' {
            breaks.push(seen);
        } else {
            seen += 1;
        }
    }

    let core_start = word.find(|c: char| c.is_alphanumeric())?;
    let core_len = core_lower.chars().count();

    let mut out = String::with_capacity(word.len() + breaks.len());
    let mut core_pos = 0usize;
    for (i, c) in word.char_indices() {
        out.push(c);
        if i >= core_start && core_pos < core_len {
            core_pos += 1;
            if breaks.contains(&core_pos) && core_pos < core_len {
                out.push('-');
            }
        }
    }
    Some(out)
}

fn emphasize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            // Ellipses are pause markers already; leave them for the
            // dramatic-pause rule instead of turning them into "!!!".
            '.' if !is_ellipsis_member(&chars, i) => out.push('!'),
            ',' => out.push('.'),
            '?' => out.push_str("?!"),
            _ => out.push(c),
        }
    }
    out
}

fn is_ellipsis_member(chars: &[char], i: usize) -> bool {
    let mut start = i;
    while start > 0 && chars[start - 1] == '.' {
        start -= 1;
    }
    let mut end = i;
    while end + 1 < chars.len() && chars[end + 1] == '.' {
        end += 1;
    }
    end - start + 1 >= 3
}

/// Add an extra pause marker after `...`, `?` and `!` runs. A lone period
/// is an ordinary sentence stop and gets nothing.
fn insert_dramatic_pauses(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0usize;
    while i < chars.len() {
        if matches!(chars[i], '.' | '?' | '!') {
            let start = i;
            while i < chars.len() && matches!(chars[i], '.' | '?' | '!') {
                out.push(chars[i]);
                i += 1;
            }
            let run = &chars[start..i];
            let dots = run.iter().filter(|&&c| c == '.').count();
            let strong = run.iter().any(|&c| c == '?' || c == '!') || dots >= 3;
            if strong {
                out.push_str(" .");
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angry_uppercases_breaks_and_pauses() {
        let out = transform("I will destroy you", EmotionTag::Angry);
        assert_eq!(out, "I. WILL. DE-STROY. YOU.");
    }

    #[test]
    fn threatening_keeps_case_but_marks_keywords() {
        let out = transform("Humans always fail", EmotionTag::Threatening);
        // "humans" is not in the keyword list ("human" is), "fail" is.
        assert_eq!(out, "Humans. always. FAIL.");
    }

    #[test]
    fn urgent_uppercases_without_pauses() {
        let out = transform("decrypt the system now", EmotionTag::Urgent);
        assert_eq!(out, "DECRYPT THE SYS-TEM NOW");
    }

    #[test]
    fn mocking_adds_dramatic_pauses() {
        let out = transform("Still here? How... quaint", EmotionTag::Mocking);
        assert_eq!(out, "Still here?! . How... . quaint");
    }

    #[test]
    fn neutral_only_adds_dramatic_pauses() {
        let out = transform("I am Zyber.", EmotionTag::Neutral);
        // No uppercase, no syllable breaks; a lone period is not dramatic.
        assert_eq!(out, "I am Zyber.");
        let out = transform("Wait... listen!", EmotionTag::Neutral);
        assert_eq!(out, "Wait... . listen! .");
    }

    #[test]
    fn disappointed_pauses_only_on_emphasis_words() {
        let out = transform("you disappoint me", EmotionTag::Disappointed);
        assert_eq!(out, "you. disappoint me");
    }

    #[test]
    fn calculating_breaks_syllables_with_emphasis_pauses() {
        let out = transform("the protocol is mine", EmotionTag::Calculating);
        assert_eq!(out, "the pro-to-col is mine.");
    }

    #[test]
    fn syllable_break_preserves_casing_and_punctuation() {
        let out = transform("Pathetic!", EmotionTag::Calculating);
        assert_eq!(out, "Pa-thet-ic!");
    }

    #[test]
    fn transform_never_shrinks_text() {
        let samples = [
            "I will destroy you",
            "Still here? How... quaint",
            "you, of all humans, amuse me.",
            "EXTERMINATE",
            "x",
            "multi  space   preserved",
        ];
        for tag in EmotionTag::ALL {
            for s in samples {
                let out = transform(s, tag);
                assert!(
                    out.chars().count() >= s.chars().count(),
                    "{tag:?} shrank {s:?} to {out:?}"
                );
            }
        }
    }

    #[test]
    fn transform_is_deterministic() {
        for tag in EmotionTag::ALL {
            let a = transform("Obey the protocol... now!", tag);
            let b = transform("Obey the protocol... now!", tag);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn whitespace_runs_are_preserved() {
        let out = transform("a  b", EmotionTag::Disappointed);
        assert_eq!(out, "a  b");
    }
}
