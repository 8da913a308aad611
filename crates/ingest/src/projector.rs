//! Working out what a message does to the `authors` table.
use feedidx_datastore::AuthorField;
use serde_json::Value;

use crate::Message;

/// Content type of a message which describes an author.
pub const ABOUT_TYPE: &str = "about";

/// The author changes implied by one message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorProjection {
    /// An author to create, with all attributes null, if they don't already exist.
    pub create: Option<String>,

    /// Attributes to set on the message's own author, in order.
    pub updates: Vec<(AuthorField, String)>,
}

impl AuthorProjection {
    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.updates.is_empty()
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Images come either as a blob link string, or as an object with a `link` (plus size, type, etc. which we ignore).
fn image_link(content: &Value) -> Option<&str> {
    let image = content.get("image")?;
    non_empty_str(image.get("link")).or_else(|| non_empty_str(Some(image)))
}

/// Project a message onto the authors table.
///
/// The first message of a feed creates its author.  An `about` message updates its author's attributes, but only
/// when it is about that same author: claims about someone else never change anything.
pub fn project(message: &Message) -> AuthorProjection {
    let mut projection = AuthorProjection::default();

    if message.is_chain_start() {
        projection.create = Some(message.author.clone());
    }

    if message.content_type() != Some(ABOUT_TYPE) {
        return projection;
    }

    let content = &message.content;
    let subject = content.get("about").and_then(Value::as_str);
    if subject != Some(message.author.as_str()) {
        return projection;
    }

    let candidates = [
        (AuthorField::Name, non_empty_str(content.get("name"))),
        (
            AuthorField::Description,
            non_empty_str(content.get("description")),
        ),
        (AuthorField::Image, image_link(content)),
    ];
    projection.updates = candidates
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v.to_string())))
        .collect();

    projection
}
