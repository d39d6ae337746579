use std::collections::BTreeSet;

use crate::tag_document::{ClassDefinition, TagDocument};

/// Parent/child view over the class declarations of a document
pub struct ClassHierarchy {
    classes: Vec<ClassDefinition>,
}

impl ClassHierarchy {
    pub fn new(classes: Vec<ClassDefinition>) -> Self {
        Self { classes }
    }

    pub fn from_document(document: &TagDocument) -> Self {
        Self::new(document.class_definitions())
    }

    /// Every class that has `root_class` as a direct or transitive parent.
    /// `root_class` itself is not part of the result.
    pub fn descendants_of(&self, root_class: &str) -> BTreeSet<String> {
        descendants_of(root_class, &self.classes)
    }
}

/// Grow `{root_class}` by every class whose parent is already in the set
/// until a scan adds nothing, then drop `root_class`. Parents that are never
/// declared simply contribute no children.
pub fn descendants_of(root_class: &str, classes: &[ClassDefinition]) -> BTreeSet<String> {
    let mut closure = BTreeSet::new();
    closure.insert(root_class.to_string());

    loop {
        let discovered: Vec<String> = classes
            .iter()
            .filter(|class| !closure.contains(&class.name))
            .filter(|class| {
                class
                    .parent
                    .as_deref()
                    .is_some_and(|parent| closure.contains(parent))
            })
            .map(|class| class.name.clone())
            .collect();

        if discovered.is_empty() {
            break;
        }
        closure.extend(discovered);
    }

    closure.remove(root_class);
    closure
}
