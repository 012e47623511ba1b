use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::emoji::EmojiTable;

pub trait EntityResolver {
    fn channel_name(&self, id: &str) -> Option<String>;
    fn user_name(&self, id: &str) -> Option<String>;
}

static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("static regex"));
static CHANNEL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<#(C\w+)(?:\|([^>]*))?>").expect("static regex"));
static USER_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@([UW]\w+)(?:\|([^>]*))?>").expect("static regex"));
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(\S+)>").expect("static regex"));
static GENERIC_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!(\w+)(?:\|([^>]*))?>").expect("static regex"));
static SHORTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([\w\+\-]+):").expect("static regex"));

// The substitution steps run in a fixed order: entity references expand
// before the generic bracket strip, broadcast markers before the generic
// <!command> rule, or the wrong pattern matches first.
pub struct SlackToIrcRenderer {
    emoji: EmojiTable,
}

impl SlackToIrcRenderer {
    pub fn new(emoji: EmojiTable) -> Self {
        Self { emoji }
    }

    pub fn render(&self, text: &str, resolver: &dyn EntityResolver) -> String {
        // IRC is line-oriented; embedded newlines would desynchronize framing.
        let text = NEWLINES.replace_all(text, " ");

        // &lt; and &gt; before &amp;, so "&amp;lt;" decodes exactly once.
        let text = text
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");

        let text = text
            .replace("<!channel>", "@channel")
            .replace("<!group>", "@group")
            .replace("<!everyone>", "@everyone");

        // Resolution wins over the embedded label so renames are reflected;
        // the label is the fallback, the raw reference the last resort.
        let text = CHANNEL_REF.replace_all(&text, |caps: &Captures| {
            let label = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
            match resolver.channel_name(&caps[1]) {
                Some(name) => format!("#{name}"),
                None => match label {
                    Some(label) => label.to_string(),
                    None => caps[0].to_string(),
                },
            }
        });

        let text = USER_REF.replace_all(&text, |caps: &Captures| {
            let label = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
            match resolver.user_name(&caps[1]) {
                Some(name) => format!("@{name}"),
                None => match label {
                    Some(label) => label.to_string(),
                    None => caps[0].to_string(),
                },
            }
        });

        // Strips link-wrapping brackets. Special markers and unresolved
        // entity references keep their brackets.
        let text = BRACKETED.replace_all(&text, |caps: &Captures| {
            let body = &caps[1];
            if body.starts_with(['!', '@', '#']) {
                caps[0].to_string()
            } else {
                body.to_string()
            }
        });

        let text = GENERIC_COMMAND.replace_all(&text, |caps: &Captures| {
            let label = caps
                .get(2)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(&caps[1]);
            format!("<{label}>")
        });

        SHORTCODE
            .replace_all(&text, |caps: &Captures| {
                self.emoji
                    .glyph(&caps[1])
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for SlackToIrcRenderer {
    fn default() -> Self {
        Self::new(EmojiTable::builtin())
    }
}
