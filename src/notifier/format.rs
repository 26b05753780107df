//! Message templates for chat notifications (Telegram MarkdownV2).

use crate::types::{format_amount, Listing, Notification, UNKNOWN};

/// Builds deep links back to the marketplace web UI.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    web_base_url: String,
}

impl LinkBuilder {
    pub fn new(web_base_url: &str) -> Self {
        Self {
            web_base_url: web_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn shipment(&self, listing: &Listing) -> String {
        format!("{}/shipment/{}", self.web_base_url, listing.id)
    }

    /// Slug page when the listing has one, shipment page otherwise.
    pub fn listing_page(&self, listing: &Listing) -> String {
        match &listing.slug {
            Some(slug) => format!("{}/{}", self.web_base_url, slug.trim_start_matches('/')),
            None => self.shipment(listing),
        }
    }
}

/// Render a notification as MarkdownV2 text.
pub fn format_message(notification: &Notification, links: &LinkBuilder) -> String {
    match notification {
        Notification::ListingNew { listing } => format!(
            "📦 *New Shipment Available\\!*\n\
            {}\
            From: {}\n\
            To: {}\n\
            Budget: *{}*\n\
            {}",
            title_line(listing),
            escape_markdown(&listing.origin.to_string()),
            escape_markdown(&listing.destination.to_string()),
            escape_markdown(&format_amount(listing.current_bid)),
            link("🔗 View on CitizenShipper", &links.shipment(listing)),
        ),
        Notification::ListingUpdated { listing, previous } => {
            let mut msg = format!(
                "🔄 *Shipment Updated*\n\
                {}\
                From: {}\n\
                To: {}\n\
                Budget: *{}* \\(was {}\\)\n",
                title_line(listing),
                escape_markdown(&listing.origin.to_string()),
                escape_markdown(&listing.destination.to_string()),
                escape_markdown(&format_amount(listing.current_bid)),
                escape_markdown(&format_amount(previous.current_bid)),
            );
            if listing.my_bid.is_some() || previous.my_bid.is_some() {
                msg.push_str(&format!(
                    "My bid: *{}* \\(was {}\\)\n",
                    escape_markdown(&format_amount(listing.my_bid)),
                    escape_markdown(&format_amount(previous.my_bid)),
                ));
            }
            msg.push_str(&link("🔗 View on CitizenShipper", &links.shipment(listing)));
            msg
        }
        Notification::Outbid { listing, lowest, own } => {
            let shipment = listing.title.as_deref().unwrap_or(&listing.id);
            let mut msg = format!(
                "🚨 *Outbid Alert\\!*\n\
                \n\
                *Shipment:* {}\n\
                *Outbid by:* {}\n\
                *New lowest bid:* {}\n",
                escape_markdown(shipment),
                escape_markdown(lowest.driver_display_name.as_deref().unwrap_or(UNKNOWN)),
                escape_markdown(&format_amount(Some(lowest.amount))),
            );
            if let Some(own) = own {
                msg.push_str(&format!(
                    "*Your bid:* {}\n",
                    escape_markdown(&format_amount(Some(own.amount))),
                ));
            }
            msg.push_str(&link("View Shipment", &links.listing_page(listing)));
            msg
        }
    }
}

fn title_line(listing: &Listing) -> String {
    match &listing.title {
        Some(title) => format!("{}\n", escape_markdown(&truncate(title, 80))),
        None => String::new(),
    }
}

fn link(label: &str, url: &str) -> String {
    format!("[{}]({})", escape_markdown(label), escape_link_url(url))
}

/// Truncate a string with ellipsis (Unicode-safe).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: [char; 19] = [
        '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
        '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Inside the `(...)` part of an inline link only `)` and `\` need escaping.
fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}
