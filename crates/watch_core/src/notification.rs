use crate::VersionId;

/// Alert sent when a change is detected, rendered as Telegram-style HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body_html: String,
    pub url: String,
    pub version_id: VersionId,
}

/// Headlines of the two alert kinds. The page label is prepended to each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTitles {
    pub first_acquisition: String,
    pub change: String,
}

impl Default for AlertTitles {
    fn default() -> Self {
        Self {
            first_acquisition: "Monitor active".to_string(),
            change: "Change detected".to_string(),
        }
    }
}

impl AlertTitles {
    /// First successful fetch: the monitor is now active.
    pub fn first_acquisition(
        &self,
        label: &str,
        url: &str,
        version_id: VersionId,
    ) -> NotificationMessage {
        NotificationMessage {
            title: headline("✅", label, &self.first_acquisition),
            body_html: "First acquisition of the content: changes will be reported from now on."
                .to_string(),
            url: url.to_string(),
            version_id,
        }
    }

    pub fn change_detected(
        &self,
        label: &str,
        url: &str,
        version_id: VersionId,
    ) -> NotificationMessage {
        NotificationMessage {
            title: headline("🔔", label, &self.change),
            body_html: "A <b>change</b> to the main content was detected.".to_string(),
            url: url.to_string(),
            version_id,
        }
    }
}

fn headline(icon: &str, label: &str, title: &str) -> String {
    format!("{icon} <b>{} – {}</b>", escape_html(label), escape_html(title))
}

impl NotificationMessage {
    pub fn first_acquisition(label: &str, url: &str, version_id: VersionId) -> Self {
        AlertTitles::default().first_acquisition(label, url, version_id)
    }

    pub fn change_detected(label: &str, url: &str, version_id: VersionId) -> Self {
        AlertTitles::default().change_detected(label, url, version_id)
    }

    pub fn render(&self) -> String {
        let id = escape_html(self.version_id.as_str());
        format!(
            "{title}\n{body}\n\n🔗 <a href=\"{url}\">Official page</a>\n🗂️ Saved version: <code>{id}</code>\nℹ️ Copies: versions/{id}/content.txt and content.html\n",
            title = self.title,
            body = self.body_html,
            url = escape_html(&self.url),
        )
    }
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
