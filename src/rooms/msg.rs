use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::{db::{Member, Message}, include_res, res};

/// Markdown to html, with any raw html in the source shown as text and links
/// limited to http, https, mailto and relative urls.
pub fn content_html(content: &str) -> String {
    let parser = Parser::new_ext(content, Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            _ => event,
        });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Any url with a scheme other than http, https or mailto becomes `#`.
fn safe_url(dest: CowStr<'_>) -> CowStr<'_> {
    // browsers ignore whitespace and control characters inside the scheme
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme = match cleaned.find([':', '/', '?', '#']) {
        Some(end) if cleaned[end..].starts_with(':') => &cleaned[..end],
        _ => return dest,
    };
    match scheme {
        "http" | "https" | "mailto" => dest,
        _ => CowStr::Borrowed("#"),
    }
}

pub fn sender_name(members: &[Member], sender_id: Uuid) -> &str {
    members
        .iter()
        .find(|m| m.user_id == sender_id)
        .map(|m| m.username.as_str())
        .unwrap_or("Unknown")
}

pub fn msg_to_html(message: &Message, members: &[Member], me: Uuid) -> String {
    let side = if message.sender_id == me { "mine" } else { "theirs" };
    let created_at = message.created_at.format(&Rfc3339).unwrap_or_default();

    include_res!(str, "/pages/rooms/message.html")
        .replace("{id}", &message.id.to_string())
        .replace("{side}", side)
        .replace("{sender}", &res::escape(sender_name(members, message.sender_id)))
        .replace("{created_at}", &created_at)
        .replace("{content}", &content_html(&message.content))
}
