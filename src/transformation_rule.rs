use serde::{Deserialize, Serialize};

use crate::sdk_version::SdkVersion;

/// Set the `version` attribute of a class declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    pub class_name: String,
    pub version: u32,
}

/// Delete a member declaration from a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRemoval {
    pub class_name: String,
    pub member_name: String,
}

/// Turn the inline `struct` entries of an array member into top-level
/// objects of `promoted_type` referenced by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructPromotion {
    pub class_name: String,
    pub member_name: String,
    pub promoted_type: String,
}

/// Ordered rule tables. Entries are applied in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sdk: Option<SdkVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sdk: Option<SdkVersion>,
    #[serde(default)]
    pub versions: Vec<VersionStamp>,
    #[serde(default)]
    pub removals: Vec<MemberRemoval>,
    #[serde(default)]
    pub promotions: Vec<StructPromotion>,
}

/// Types of transformations the engine applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformationType {
    /// Class version attribute changed
    StampVersion,
    /// Member declaration deleted
    RemoveMember,
    /// Member declaration type changed from `struct` to `ref`
    RetypeMember,
    /// Inline struct moved to a new top-level object
    PromoteStruct,
}

/// Represents a transformation that was applied during processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTransformation {
    pub rule_id: String,
    pub transformation_type: TransformationType,
    pub class_name: String,
    pub member_name: Option<String>,
    pub object_id: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl VersionStamp {
    pub fn rule_id(&self) -> String {
        format!("version:{}", self.class_name)
    }
}

impl MemberRemoval {
    pub fn rule_id(&self) -> String {
        format!("remove:{}.{}", self.class_name, self.member_name)
    }
}

impl StructPromotion {
    pub fn rule_id(&self) -> String {
        format!("promote:{}.{}", self.class_name, self.member_name)
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            source_sdk: None,
            target_sdk: None,
            versions: Vec::new(),
            removals: Vec::new(),
            promotions: Vec::new(),
        }
    }

    /// Rules that take a 2011.3 tag file to the 2010.2 layout read by hkxcmd
    pub fn builtin() -> Self {
        Self::new()
            .with_sdk_versions(SdkVersion::new(2011, 3, 0), SdkVersion::new(2010, 2, 0))
            .with_version("hkRootLevelContainerNamedVariant", 0)
            .with_version("hkaAnimation", 1)
            .with_version("hkaBoneAttachment", 1)
            .with_version("hkaMeshBinding", 1)
            .with_version("hkxMeshSection", 1)
            .with_version("hkxAttributeHolder", 1)
            .with_version("hkxAttribute", 0)
            .with_version("hkxMaterial", 1)
            .with_version("hkxMaterialTextureStage", 0)
            .with_removal("hkaMeshBinding", "name")
            .with_promotion("hkaMeshBinding", "mappings", "hkaMeshBindingMapping")
            .with_promotion("hkaAnimation", "annotationTracks", "hkaAnnotationTrack")
            .with_promotion("hkxAttributeHolder", "attributeGroups", "hkxAttributeGroup")
    }

    pub fn with_sdk_versions(mut self, source: SdkVersion, target: SdkVersion) -> Self {
        self.source_sdk = Some(source);
        self.target_sdk = Some(target);
        self
    }

    pub fn with_version(mut self, class_name: &str, version: u32) -> Self {
        self.versions.push(VersionStamp {
            class_name: class_name.to_string(),
            version,
        });
        self
    }

    pub fn with_removal(mut self, class_name: &str, member_name: &str) -> Self {
        self.removals.push(MemberRemoval {
            class_name: class_name.to_string(),
            member_name: member_name.to_string(),
        });
        self
    }

    pub fn with_promotion(mut self, class_name: &str, member_name: &str, promoted_type: &str) -> Self {
        self.promotions.push(StructPromotion {
            class_name: class_name.to_string(),
            member_name: member_name.to_string(),
            promoted_type: promoted_type.to_string(),
        });
        self
    }

    pub fn rule_count(&self) -> usize {
        self.versions.len() + self.removals.len() + self.promotions.len()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
