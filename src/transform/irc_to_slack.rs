const JOIN_MARKER: &str = "🎉";

// IRC text needs no markup expansion on its way to Slack; only the message
// kind is reflected in the formatting.
pub fn format_message(text: &str) -> String {
    text.to_string()
}

pub fn format_notice(text: &str) -> String {
    format!("*{text}*")
}

pub fn format_action(text: &str) -> String {
    format!("_{text}_")
}

pub fn format_join(nick: &str) -> String {
    format!("*{nick}* has joined the IRC channel {JOIN_MARKER}")
}

pub fn format_names(irc_channel: &str, names: &[String]) -> String {
    format!("```\nUsers in {irc_channel}: {}\n```", names.join(" "))
}
