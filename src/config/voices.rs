//! Voice metadata for the Kokoro TTS model.
//!
//! The teller speaks English only, so this is the English subset of the
//! Kokoro v1.0 speaker bank. Speaker ids index into the model's voices.bin.

/// Metadata for a single TTS voice.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub speaker_id: i32,
    pub accent: &'static str,
}

/// English voices, sorted by name for binary search.
const VOICES: &[(&str, Voice)] = &[
    ("af_alloy", Voice { speaker_id: 0, accent: "American English" }),
    ("af_aoede", Voice { speaker_id: 1, accent: "American English" }),
    ("af_bella", Voice { speaker_id: 2, accent: "American English" }),
    ("af_heart", Voice { speaker_id: 3, accent: "American English" }),
    ("af_jessica", Voice { speaker_id: 4, accent: "American English" }),
    ("af_kore", Voice { speaker_id: 5, accent: "American English" }),
    ("af_nicole", Voice { speaker_id: 6, accent: "American English" }),
    ("af_nova", Voice { speaker_id: 7, accent: "American English" }),
    ("af_river", Voice { speaker_id: 8, accent: "American English" }),
    ("af_sarah", Voice { speaker_id: 9, accent: "American English" }),
    ("af_sky", Voice { speaker_id: 10, accent: "American English" }),
    ("am_adam", Voice { speaker_id: 11, accent: "American English" }),
    ("am_echo", Voice { speaker_id: 12, accent: "American English" }),
    ("am_eric", Voice { speaker_id: 13, accent: "American English" }),
    ("am_fenrir", Voice { speaker_id: 14, accent: "American English" }),
    ("am_liam", Voice { speaker_id: 15, accent: "American English" }),
    ("am_michael", Voice { speaker_id: 16, accent: "American English" }),
    ("am_onyx", Voice { speaker_id: 17, accent: "American English" }),
    ("am_puck", Voice { speaker_id: 18, accent: "American English" }),
    ("am_santa", Voice { speaker_id: 19, accent: "American English" }),
    ("bf_alice", Voice { speaker_id: 20, accent: "British English" }),
    ("bf_emma", Voice { speaker_id: 21, accent: "British English" }),
    ("bf_isabella", Voice { speaker_id: 22, accent: "British English" }),
    ("bf_lily", Voice { speaker_id: 23, accent: "British English" }),
    ("bm_daniel", Voice { speaker_id: 24, accent: "British English" }),
    ("bm_fable", Voice { speaker_id: 25, accent: "British English" }),
    ("bm_george", Voice { speaker_id: 26, accent: "British English" }),
    ("bm_lewis", Voice { speaker_id: 27, accent: "British English" }),
];

/// Look up a voice by name.
pub fn find(name: &str) -> Option<Voice> {
    VOICES.binary_search_by(|(n, _)| (*n).cmp(name)).ok().map(|i| VOICES[i].1)
}

/// Print the voice table for `--list-voices`.
pub fn print_voices() {
    println!("Available voices:");
    for (name, voice) in VOICES {
        println!("  {:<12} {}", name, voice.accent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_voice() {
        let voice = find("af_bella").unwrap();
        assert_eq!(voice.speaker_id, 2);
    }

    #[test]
    fn unknown_voice_is_none() {
        assert!(find("zf_xiaobei").is_none());
    }

    #[test]
    fn table_is_sorted_for_binary_search() {
        for pair in VOICES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} before {}", pair[0].0, pair[1].0);
        }
    }
}
