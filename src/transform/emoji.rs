use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

static BUILTIN_GLYPHS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("smile", "😄"),
        ("smiley", "😃"),
        ("grin", "😁"),
        ("grinning", "😀"),
        ("laughing", "😆"),
        ("joy", "😂"),
        ("rolling_on_the_floor_laughing", "🤣"),
        ("slightly_smiling_face", "🙂"),
        ("upside_down_face", "🙃"),
        ("wink", "😉"),
        ("blush", "😊"),
        ("sweat_smile", "😅"),
        ("neutral_face", "😐"),
        ("confused", "😕"),
        ("thinking_face", "🤔"),
        ("angry", "😠"),
        ("rage", "😡"),
        ("scream", "😱"),
        ("cry", "😢"),
        ("sob", "😭"),
        ("heart", "❤️"),
        ("broken_heart", "💔"),
        ("+1", "👍"),
        ("-1", "👎"),
        ("thumbsup", "👍"),
        ("thumbsdown", "👎"),
        ("ok_hand", "👌"),
        ("clap", "👏"),
        ("wave", "👋"),
        ("pray", "🙏"),
        ("muscle", "💪"),
        ("shrug", "🤷"),
        ("facepalm", "🤦"),
        ("eyes", "👀"),
        ("tada", "🎉"),
        ("fire", "🔥"),
        ("rocket", "🚀"),
        ("100", "💯"),
        ("star", "⭐"),
        ("sparkles", "✨"),
        ("white_check_mark", "✅"),
        ("x", "❌"),
        ("warning", "⚠️"),
        ("bulb", "💡"),
        ("zzz", "💤"),
        ("coffee", "☕"),
        ("beer", "🍺"),
        ("pizza", "🍕"),
        ("cake", "🎂"),
        ("skull", "💀"),
        ("ghost", "👻"),
        ("robot_face", "🤖"),
    ])
});

#[derive(Debug, Clone)]
pub struct EmojiTable {
    glyphs: HashMap<String, String>,
}

impl EmojiTable {
    pub fn builtin() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }

    // Configured entries win on conflicting shortcodes.
    pub fn with_overrides(extra: &BTreeMap<String, String>) -> Self {
        let mut glyphs: HashMap<String, String> = BUILTIN_GLYPHS
            .iter()
            .map(|(code, glyph)| ((*code).to_string(), (*glyph).to_string()))
            .collect();
        for (code, glyph) in extra {
            glyphs.insert(code.clone(), glyph.clone());
        }
        Self { glyphs }
    }

    pub fn glyph(&self, shortcode: &str) -> Option<&str> {
        self.glyphs.get(shortcode).map(String::as_str)
    }
}

impl Default for EmojiTable {
    fn default() -> Self {
        Self::builtin()
    }
}
