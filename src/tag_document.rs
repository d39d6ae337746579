pub const ROOT_ELEMENT: &str = "hktagfile";
pub const CLASS_ELEMENT: &str = "class";
pub const MEMBER_ELEMENT: &str = "member";
pub const OBJECT_ELEMENT: &str = "object";
pub const ARRAY_ELEMENT: &str = "array";
pub const STRUCT_ELEMENT: &str = "struct";
pub const REF_ELEMENT: &str = "ref";

/// A node of the tag file tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Replace the value of an existing attribute in place, or append it
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }

    /// Whether this element carries `name="<name>"`
    pub fn is_named(&self, name: &str) -> bool {
        self.attribute("name") == Some(name)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.name == tag)
    }

    pub fn elements_named_mut<'a>(
        &'a mut self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements_mut().filter(move |element| element.name == tag)
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Drop every child element for which `keep` returns false. Text and
    /// comment nodes are kept. Returns the number of removed elements.
    pub fn retain_elements<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Element) -> bool,
    {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Element(element) => keep(element),
            _ => true,
        });
        before - self.children.len()
    }
}

/// Snapshot of a `<class>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub name: String,
    pub version: Option<u32>,
    pub parent: Option<String>,
    pub members: Vec<MemberDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeclaration {
    pub name: String,
    pub type_name: String,
}

impl ClassDefinition {
    /// Read a class declaration; `None` when the element has no `name`
    pub fn from_element(element: &Element) -> Option<Self> {
        let name = element.attribute("name")?.to_string();
        let members = element
            .elements_named(MEMBER_ELEMENT)
            .filter_map(|member| {
                Some(MemberDeclaration {
                    name: member.attribute("name")?.to_string(),
                    type_name: member.attribute("type").unwrap_or_default().to_string(),
                })
            })
            .collect();

        Some(Self {
            name,
            version: element.attribute("version").and_then(|v| v.trim().parse().ok()),
            parent: element.attribute("parent").map(str::to_string),
            members,
        })
    }

    pub fn member(&self, name: &str) -> Option<&MemberDeclaration> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// A parsed tag file: the `hktagfile` root plus any comments around it.
/// Element order, attribute order and comments are kept, so a converted file
/// differs from its source only where a rule touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDocument {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

impl TagDocument {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Raw `sdkversion` attribute of the root
    pub fn sdk_version(&self) -> Option<&str> {
        self.root.attribute("sdkversion")
    }

    pub fn classes(&self) -> impl Iterator<Item = &Element> {
        self.root.elements_named(CLASS_ELEMENT)
    }

    pub fn classes_named_mut<'a>(
        &'a mut self,
        class_name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.root
            .elements_named_mut(CLASS_ELEMENT)
            .filter(move |class| class.is_named(class_name))
    }

    pub fn class_definitions(&self) -> Vec<ClassDefinition> {
        self.classes().filter_map(ClassDefinition::from_element).collect()
    }

    pub fn class_definition(&self, class_name: &str) -> Option<ClassDefinition> {
        self.classes()
            .find(|class| class.is_named(class_name))
            .and_then(ClassDefinition::from_element)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Element> {
        self.root.elements_named(OBJECT_ELEMENT)
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.root.elements_named_mut(OBJECT_ELEMENT)
    }

    pub fn object(&self, id: &str) -> Option<&Element> {
        self.objects().find(|object| object.attribute("id") == Some(id))
    }

    /// Append a new top-level object after every existing entry
    pub fn append_object(&mut self, object: Element) {
        self.root.children.push(Node::Element(object));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> TagDocument {
        let root = Element::new(ROOT_ELEMENT)
            .with_attribute("version", "1")
            .with_attribute("sdkversion", "hk_2011.3.0-r1")
            .with_child(
                Element::new(CLASS_ELEMENT)
                    .with_attribute("name", "hkaMeshBinding")
                    .with_attribute("parent", "hkReferencedObject")
                    .with_child(
                        Element::new(MEMBER_ELEMENT)
                            .with_attribute("name", "name")
                            .with_attribute("type", "string"),
                    )
                    .with_child(
                        Element::new(MEMBER_ELEMENT)
                            .with_attribute("name", "mappings")
                            .with_attribute("type", "struct"),
                    ),
            )
            .with_child(
                Element::new(OBJECT_ELEMENT)
                    .with_attribute("id", "#0001")
                    .with_attribute("type", "hkaMeshBinding"),
            );
        TagDocument::new(root)
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut element = Element::new("class")
            .with_attribute("name", "hkxMaterial")
            .with_attribute("version", "2")
            .with_attribute("parent", "hkxAttributeHolder");

        element.set_attribute("version", "1");
        element.set_attribute("extra", "yes");

        let names: Vec<&str> = element.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "version", "parent", "extra"]);
        assert_eq!(element.attribute("version"), Some("1"));
    }

    #[test]
    fn test_retain_elements_keeps_text_and_comments() {
        let mut element = Element::new("class")
            .with_text("leading")
            .with_child(Element::new("member").with_attribute("name", "a"))
            .with_child(Element::new("member").with_attribute("name", "b"));
        element.children.push(Node::Comment("note".to_string()));

        let removed = element.retain_elements(|e| !e.is_named("a"));

        assert_eq!(removed, 1);
        assert_eq!(element.children.len(), 3);
        assert_eq!(element.text(), "leading");
    }

    #[test]
    fn test_class_definition_snapshot() {
        let document = sample_document();
        let class = document.class_definition("hkaMeshBinding").unwrap();

        assert_eq!(class.version, None);
        assert_eq!(class.parent.as_deref(), Some("hkReferencedObject"));
        assert_eq!(class.members.len(), 2);
        assert_eq!(class.member("mappings").unwrap().type_name, "struct");
        assert!(document.class_definition("hkaAnimation").is_none());
    }

    #[test]
    fn test_objects_and_append() {
        let mut document = sample_document();
        assert_eq!(document.sdk_version(), Some("hk_2011.3.0-r1"));
        assert_eq!(document.objects().count(), 1);

        document.append_object(
            Element::new(OBJECT_ELEMENT)
                .with_attribute("id", "#0002")
                .with_attribute("type", "hkaMeshBindingMapping"),
        );

        assert_eq!(document.objects().count(), 2);
        assert!(document.object("#0002").is_some());
        assert!(matches!(document.root.children.last(), Some(Node::Element(e)) if e.attribute("id") == Some("#0002")));
    }

    #[test]
    fn test_classes_named_mut_matches_exact_name() {
        let mut document = sample_document();
        assert_eq!(document.classes_named_mut("hkaMeshBinding").count(), 1);
        assert_eq!(document.classes_named_mut("hkaMesh").count(), 0);
    }
}
