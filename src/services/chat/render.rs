//! Message → Slack attachment rendering.

use serde::Serialize;

use crate::model::{Message, MessageField};

pub const COLOR_INFO: &str = "#2EB67D";
pub const COLOR_WARNING: &str = "#FFA500";
pub const COLOR_ERROR: &str = "#FF0000";
pub const COLOR_DEFAULT: &str = COLOR_INFO;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Text {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
}

/// Reserved color names map to fixed values; anything else is passed through.
pub fn resolve_color(color: &str) -> &str {
    match color {
        "" => COLOR_DEFAULT,
        "info" => COLOR_INFO,
        "warning" => COLOR_WARNING,
        "error" => COLOR_ERROR,
        other => other,
    }
}

fn render_field(field: &MessageField) -> Text {
    let value = if field.link.is_empty() {
        field.value.clone()
    } else {
        format!("<{}|{}>", field.link, field.value)
    };
    Text::Markdown {
        text: format!("*{}*\n{}", field.name, value),
    }
}

pub fn render(msg: &Message) -> PostMessage {
    let mut blocks = Vec::with_capacity(2);

    if !msg.title.is_empty() {
        blocks.push(Block::Header {
            text: Text::Plain {
                text: msg.title.clone(),
            },
        });
    }

    let text = (!msg.body.is_empty()).then(|| Text::Markdown {
        text: msg.body.clone(),
    });
    let fields: Vec<Text> = msg.fields.iter().map(render_field).collect();
    if text.is_some() || !fields.is_empty() {
        blocks.push(Block::Section { text, fields });
    }

    // Emoji wins over an icon URL.
    let (icon_emoji, icon_url) = if !msg.emoji.is_empty() {
        (Some(msg.emoji.clone()), None)
    } else if !msg.icon.is_empty() {
        (None, Some(msg.icon.clone()))
    } else {
        (None, None)
    };

    PostMessage {
        channel: msg.channel.clone(),
        attachments: vec![Attachment {
            color: resolve_color(&msg.color).to_string(),
            blocks,
        }],
        icon_emoji,
        icon_url,
    }
}
