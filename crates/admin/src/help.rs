//! Help embed

use contracts::{Embed, EmbedField};

fn field(name: &str, value: &str) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.to_string(),
        inline: false,
    }
}

/// Static command reference; bold names require admin
pub fn help_embed(color: u32) -> Embed {
    Embed {
        title: "Help".to_string(),
        description:
            "The following are all commands I respond to (**bold** commands require admin perms)"
                .to_string(),
        color,
        fields: vec![
            field(
                "**set-kirb-post**",
                "Sets the current channel (or the channel given) as the kirb posting channel \
                 (overrides previously set channel)",
            ),
            field(
                "**remove-kirb-post**",
                "Removes kirb posting from the server (can be run from ANY channel)",
            ),
            field(
                "**check-kirb-post**",
                "See whether or not kirb-posting is enabled, and what channel it is set to",
            ),
            field("help", "See this menu again"),
        ],
    }
}
