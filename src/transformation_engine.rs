use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    class_hierarchy::ClassHierarchy,
    identifier_allocator::{AllocatorError, ObjectIdAllocator},
    sdk_version::SdkVersion,
    tag_document::{
        Element, Node, TagDocument, ARRAY_ELEMENT, MEMBER_ELEMENT, OBJECT_ELEMENT, REF_ELEMENT,
        STRUCT_ELEMENT,
    },
    transformation_rule::{
        AppliedTransformation, MemberRemoval, RuleSet, StructPromotion, TransformationType,
        VersionStamp,
    },
};

const STRUCT_TYPE: &str = "struct";
const REF_TYPE: &str = "ref";

/// Applies a rule set to a tag document in three passes: version stamping,
/// member removal, then struct-to-reference promotion.
pub struct TagTransformationEngine {
    rules: RuleSet,
}

/// Result of a transformation operation
#[derive(Debug, Clone)]
pub struct TransformationResult {
    pub applied_transformations: Vec<AppliedTransformation>,
    pub warnings: Vec<TransformationWarning>,
    pub source_version: Option<SdkVersion>,
    pub target_version: Option<SdkVersion>,
    pub created_objects: Vec<String>,
}

/// Warning generated during transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationWarning {
    pub message: String,
    pub rule_id: Option<String>,
    pub warning_type: TransformationWarningType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformationWarningType {
    ClassNotFound,
    MemberNotFound,
    UnrecognizedSourceVersion,
    UnexpectedSourceVersion,
}

/// Errors that can occur during transformation
#[derive(Debug, Error)]
pub enum TransformationError {
    #[error(transparent)]
    Allocator(#[from] AllocatorError),
}

#[derive(Default)]
struct TransformationLog {
    applied: Vec<AppliedTransformation>,
    warnings: Vec<TransformationWarning>,
    created_objects: Vec<String>,
}

impl TransformationLog {
    fn warn(&mut self, warning_type: TransformationWarningType, message: String) {
        warn!("{}", message);
        self.warnings.push(TransformationWarning::new(message, warning_type));
    }

    fn skipped(&mut self, rule_id: String, warning_type: TransformationWarningType, message: String) {
        warn!(rule = %rule_id, "{}", message);
        self.warnings
            .push(TransformationWarning::new(message, warning_type).with_rule_id(rule_id));
    }
}

impl TagTransformationEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Transform the document in place, seeding a fresh id allocator from it.
    /// Fails before touching the document when no object has a numeric id.
    pub fn transform(&self, document: &mut TagDocument) -> Result<TransformationResult, TransformationError> {
        let mut allocator = ObjectIdAllocator::from_document(document)?;
        self.transform_with_allocator(document, &mut allocator)
    }

    /// Transform the document in place, taking new object ids from `allocator`.
    /// On `Err` the passes that already ran stay applied, but every `ref`
    /// written so far has its promoted object in the document.
    pub fn transform_with_allocator(
        &self,
        document: &mut TagDocument,
        allocator: &mut ObjectIdAllocator,
    ) -> Result<TransformationResult, TransformationError> {
        let mut log = TransformationLog::default();

        let source_version = self.detect_version(document, &mut log);

        for stamp in &self.rules.versions {
            self.stamp_version(document, stamp, &mut log);
        }

        for removal in &self.rules.removals {
            self.remove_member(document, removal, &mut log);
        }

        for promotion in &self.rules.promotions {
            self.promote_struct_member(document, promotion, allocator, &mut log)?;
        }

        info!(
            applied = log.applied.len(),
            created_objects = log.created_objects.len(),
            skipped = log.warnings.len(),
            "transformation finished"
        );

        Ok(TransformationResult {
            applied_transformations: log.applied,
            warnings: log.warnings,
            source_version,
            target_version: self.rules.target_sdk.clone(),
            created_objects: log.created_objects,
        })
    }

    /// Detect the SDK version the document was written by. A mismatch with
    /// the rule set's source version is only a warning.
    fn detect_version(&self, document: &TagDocument, log: &mut TransformationLog) -> Option<SdkVersion> {
        let raw = document.sdk_version()?;
        let detected = match raw.parse::<SdkVersion>() {
            Ok(version) => version,
            Err(e) => {
                log.warn(TransformationWarningType::UnrecognizedSourceVersion, e.to_string());
                return None;
            }
        };

        if let Some(expected) = &self.rules.source_sdk {
            if !detected.same_line(expected) {
                log.warn(
                    TransformationWarningType::UnexpectedSourceVersion,
                    format!("document was written by {}, rules expect {}", detected, expected),
                );
            }
        }

        Some(detected)
    }

    fn stamp_version(&self, document: &mut TagDocument, stamp: &VersionStamp, log: &mut TransformationLog) {
        let new_value = stamp.version.to_string();
        let mut matched = false;

        for class in document.classes_named_mut(&stamp.class_name) {
            matched = true;
            let old_value = class.attribute("version").map(str::to_string);
            if old_value.as_deref() == Some(new_value.as_str()) {
                continue;
            }
            class.set_attribute("version", &new_value);
            debug!(class = %stamp.class_name, old = ?old_value, new = %new_value, "stamped class version");
            log.applied.push(AppliedTransformation {
                rule_id: stamp.rule_id(),
                transformation_type: TransformationType::StampVersion,
                class_name: stamp.class_name.clone(),
                member_name: None,
                object_id: None,
                old_value,
                new_value: Some(new_value.clone()),
            });
        }

        if !matched {
            log.skipped(
                stamp.rule_id(),
                TransformationWarningType::ClassNotFound,
                format!("class {} not declared", stamp.class_name),
            );
        }
    }

    fn remove_member(&self, document: &mut TagDocument, removal: &MemberRemoval, log: &mut TransformationLog) {
        let mut class_found = false;
        let mut removed = 0;

        for class in document.classes_named_mut(&removal.class_name) {
            class_found = true;
            removed += class.retain_elements(|element| {
                !(element.name == MEMBER_ELEMENT && element.is_named(&removal.member_name))
            });
        }

        if !class_found {
            log.skipped(
                removal.rule_id(),
                TransformationWarningType::ClassNotFound,
                format!("class {} not declared", removal.class_name),
            );
            return;
        }
        if removed == 0 {
            log.skipped(
                removal.rule_id(),
                TransformationWarningType::MemberNotFound,
                format!("class {} has no member {}", removal.class_name, removal.member_name),
            );
            return;
        }

        debug!(class = %removal.class_name, member = %removal.member_name, "removed member");
        for _ in 0..removed {
            log.applied.push(AppliedTransformation {
                rule_id: removal.rule_id(),
                transformation_type: TransformationType::RemoveMember,
                class_name: removal.class_name.clone(),
                member_name: Some(removal.member_name.clone()),
                object_id: None,
                old_value: None,
                new_value: None,
            });
        }
    }

    fn promote_struct_member(
        &self,
        document: &mut TagDocument,
        promotion: &StructPromotion,
        allocator: &mut ObjectIdAllocator,
        log: &mut TransformationLog,
    ) -> Result<(), TransformationError> {
        self.retype_member(document, promotion, log);

        // objects of the declaring class itself are left alone
        let subclasses = ClassHierarchy::from_document(document).descendants_of(&promotion.class_name);
        if subclasses.is_empty() {
            return Ok(());
        }

        let mut promoted_objects = Vec::new();
        let scanned = self.promote_arrays(document, promotion, &subclasses, allocator, log, &mut promoted_objects);

        // refs already written must resolve even when allocation stopped part way
        for object in promoted_objects {
            document.append_object(object);
        }
        scanned
    }

    /// Swap each struct entry of the promoted arrays for a ref, collecting the
    /// promoted objects in allocation order
    fn promote_arrays(
        &self,
        document: &mut TagDocument,
        promotion: &StructPromotion,
        subclasses: &BTreeSet<String>,
        allocator: &mut ObjectIdAllocator,
        log: &mut TransformationLog,
        promoted_objects: &mut Vec<Element>,
    ) -> Result<(), TransformationError> {
        for object in document.objects_mut() {
            let in_hierarchy = object
                .attribute("type")
                .is_some_and(|object_type| subclasses.contains(object_type));
            if !in_hierarchy {
                continue;
            }
            let owner_id = object.attribute("id").map(str::to_string);

            let arrays = object
                .elements_named_mut(ARRAY_ELEMENT)
                .filter(|array| array.is_named(&promotion.member_name));
            for array in arrays {
                for entry in array.children.iter_mut() {
                    let Node::Element(element) = entry else { continue };
                    if element.name != STRUCT_ELEMENT {
                        continue;
                    }

                    let id = allocator.allocate()?;
                    let reference = Element::new(REF_ELEMENT).with_text(id.clone());
                    let mut promoted = std::mem::replace(element, reference);
                    promoted.name = OBJECT_ELEMENT.to_string();
                    promoted.clear_attributes();
                    promoted.set_attribute("id", &id);
                    promoted.set_attribute("type", &promotion.promoted_type);

                    debug!(owner = ?owner_id, id = %id, object_type = %promotion.promoted_type, "promoted struct");
                    log.applied.push(AppliedTransformation {
                        rule_id: promotion.rule_id(),
                        transformation_type: TransformationType::PromoteStruct,
                        class_name: promotion.class_name.clone(),
                        member_name: Some(promotion.member_name.clone()),
                        object_id: owner_id.clone(),
                        old_value: None,
                        new_value: Some(id.clone()),
                    });
                    log.created_objects.push(id);
                    promoted_objects.push(promoted);
                }
            }
        }
        Ok(())
    }

    /// Declare the member as holding references from now on
    fn retype_member(&self, document: &mut TagDocument, promotion: &StructPromotion, log: &mut TransformationLog) {
        let mut class_found = false;
        let mut member_found = false;

        for class in document.classes_named_mut(&promotion.class_name) {
            class_found = true;
            let members = class
                .elements_named_mut(MEMBER_ELEMENT)
                .filter(|member| member.is_named(&promotion.member_name));
            for member in members {
                member_found = true;
                if member.attribute("type") != Some(STRUCT_TYPE) {
                    continue;
                }
                member.set_attribute("type", REF_TYPE);
                log.applied.push(AppliedTransformation {
                    rule_id: promotion.rule_id(),
                    transformation_type: TransformationType::RetypeMember,
                    class_name: promotion.class_name.clone(),
                    member_name: Some(promotion.member_name.clone()),
                    object_id: None,
                    old_value: Some(STRUCT_TYPE.to_string()),
                    new_value: Some(REF_TYPE.to_string()),
                });
            }
        }

        if !class_found {
            log.skipped(
                promotion.rule_id(),
                TransformationWarningType::ClassNotFound,
                format!("class {} not declared", promotion.class_name),
            );
        } else if !member_found {
            log.skipped(
                promotion.rule_id(),
                TransformationWarningType::MemberNotFound,
                format!("class {} has no member {}", promotion.class_name, promotion.member_name),
            );
        }
    }
}

impl TransformationWarning {
    pub fn new(message: String, warning_type: TransformationWarningType) -> Self {
        Self {
            message,
            rule_id: None,
            warning_type,
        }
    }

    pub fn with_rule_id(mut self, rule_id: String) -> Self {
        self.rule_id = Some(rule_id);
        self
    }
}
