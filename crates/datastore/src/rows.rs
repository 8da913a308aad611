//! Rows.
//!
//! These are the persisted shapes of the two tables, defined in [crate::schema].  The timestamp fields back the
//! camel-cased `timestampReceived` and `timestampAsserted` columns.

/// One row of the `msgs` table.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageRow {
    pub key: String,
    pub sequence: i64,
    pub author: String,
    /// The message content in its canonical serialized form.
    pub content: String,
    pub timestamp_received: Option<f64>,
    pub timestamp_asserted: f64,
}

/// One row of the `authors` table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorRow {
    pub key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl AuthorRow {
    /// A freshly created author, with every attribute null.
    pub fn new(key: impl Into<String>) -> AuthorRow {
        AuthorRow {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, field: AuthorField) -> Option<&str> {
        match field {
            AuthorField::Name => self.name.as_deref(),
            AuthorField::Description => self.description.as_deref(),
            AuthorField::Image => self.image.as_deref(),
        }
    }

    pub fn set(&mut self, field: AuthorField, value: String) {
        let slot = match field {
            AuthorField::Name => &mut self.name,
            AuthorField::Description => &mut self.description,
            AuthorField::Image => &mut self.image,
        };
        *slot = Some(value);
    }
}

/// The author attributes which an `about` message may overwrite.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthorField {
    Name,
    Description,
    Image,
}

impl AuthorField {
    pub const ALL: [AuthorField; 3] = [AuthorField::Name, AuthorField::Description, AuthorField::Image];

    /// The column in `authors` backing this field.
    pub fn column(self) -> &'static str {
        match self {
            AuthorField::Name => "name",
            AuthorField::Description => "description",
            AuthorField::Image => "image",
        }
    }
}

impl std::fmt::Display for AuthorField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
