use super::Schema;

/// A captured XML element from an `<extensions>` block.
///
/// `namespace` holds the resolved namespace URI when the element's prefix
/// was declared in scope; `prefix` is what the document used.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Element in one of the known vendor schemas.
    pub fn in_schema(schema: Schema, name: &str) -> Self {
        Self {
            namespace: Some(schema.namespace().to_string()),
            prefix: Some(schema.prefix().to_string()),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Child in the same namespace as `self`.
    pub fn sibling_schema_child(&self, name: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn qualified_name(&self) -> String {
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:{}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Append `<name>text</name>` in this element's namespace when `text` is set.
    pub fn push_text_child(&mut self, name: &str, text: Option<&str>) {
        if let Some(t) = text {
            let child = self.sibling_schema_child(name).with_text(t);
            self.children.push(child);
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`, if non-blank.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.rsplit(':').next() == Some(name) && !k.starts_with("xmlns"))
            .map(|(_, v)| v.as_str())
    }
}
