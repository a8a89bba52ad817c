//! Catalog configuration.

/// Configuration shared by a catalog and the entity stores it opens.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the top-level wrapper element of every entity document.
    pub root_element: String,

    /// Attribute that carries the entity id.
    pub id_attribute: String,

    /// Whether to check the wrapper/entities-root shape when a store is opened.
    pub verify_shape: bool,

    /// Whether lookups by a unique key fail when several entities match.
    ///
    /// When false the first match in document order wins.
    pub strict_lookups: bool,

    /// Whether opening a missing document bootstraps it instead of failing.
    pub create_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_element: String::from("DMS"),
            id_attribute: String::from("id"),
            verify_shape: true,
            strict_lookups: true,
            create_missing: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wrapper element name.
    #[must_use]
    pub fn root_element(mut self, name: impl Into<String>) -> Self {
        self.root_element = name.into();
        self
    }

    /// Sets the id attribute name.
    #[must_use]
    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    /// Sets whether to verify the document shape on open.
    #[must_use]
    pub const fn verify_shape(mut self, value: bool) -> Self {
        self.verify_shape = value;
        self
    }

    /// Sets whether ambiguous key lookups are an error.
    #[must_use]
    pub const fn strict_lookups(mut self, value: bool) -> Self {
        self.strict_lookups = value;
        self
    }

    /// Sets whether missing documents are bootstrapped on open.
    #[must_use]
    pub const fn create_missing(mut self, value: bool) -> Self {
        self.create_missing = value;
        self
    }
}
