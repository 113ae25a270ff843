//! Outline walker
//!
//! Renders a child list into canonical markup. Each invocation runs its own
//! list-context state machine over the items of one child list:
//!
//! ```text
//!            Bullet               Numbered
//!   None ─────────────▶ InBullet ◀────────▶ InNumbered
//!     ▲                    │                    │
//!     └────────────────────┴────────────────────┘
//!        unmarked item with real content
//! ```
//!
//! An unmarked item without content (a blank spacer) leaves an open list
//! alone, so lists stay contiguous across blank filler lines. Nested child
//! lists recurse with a fresh machine; state is never shared between
//! siblings or levels.

use crate::content::has_content;
use crate::image::render_image;
use crate::inline::render_run;
use crate::model::{ContentItem, ListMarker};
use crate::session::ConversionSession;
use crate::table::render_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    None,
    InBullet,
    InNumbered,
}

impl ListState {
    fn close_tag(self) -> &'static str {
        match self {
            ListState::None => "",
            ListState::InBullet => "</ul>",
            ListState::InNumbered => "</ol>",
        }
    }
}

/// Render one child list (and everything nested in it) into canonical markup
pub fn render_child_list(items: &[ContentItem], session: &mut ConversionSession<'_>) -> String {
    let mut output = String::new();
    let mut state = ListState::None;

    for item in items {
        let has_content = has_content(item);

        match item.marker {
            ListMarker::Bullet if state != ListState::InBullet => {
                output.push_str(state.close_tag());
                output.push_str("<ul>");
                state = ListState::InBullet;
            }
            ListMarker::Numbered if state != ListState::InNumbered => {
                output.push_str(state.close_tag());
                output.push_str("<ol>");
                state = ListState::InNumbered;
            }
            ListMarker::None if state != ListState::None && has_content => {
                output.push_str(state.close_tag());
                state = ListState::None;
            }
            _ => {}
        }

        if !has_content && !item.marker.is_list() {
            continue;
        }

        let body = render_item_body(item, session);
        if !body.is_empty() {
            let tag = if item.marker.is_list() || state != ListState::None {
                "li"
            } else {
                "p"
            };
            output.push_str(&format!("<{tag}>{body}</{tag}>"));
        }

        if !item.children.is_empty() {
            output.push_str(&render_child_list(&item.children, session));
        }
    }

    output.push_str(state.close_tag());
    output
}

/// Runs, then tables, then images, concatenated
fn render_item_body(item: &ContentItem, session: &mut ConversionSession<'_>) -> String {
    let mut body = String::new();
    for run in &item.runs {
        body.push_str(&render_run(run));
    }
    for table in &item.tables {
        body.push_str(&render_table(table));
    }
    for image in &item.images {
        body.push_str(&render_image(image, session));
    }
    body
}
