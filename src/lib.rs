// Havok tag file downgrade: 2011.3 tag XML to the 2010.2 layout
pub mod sdk_version;
pub mod tag_document;
pub mod document_io;
pub mod identifier_allocator;
pub mod class_hierarchy;
pub mod transformation_rule;
pub mod rule_registry;
pub mod transformation_engine;
pub mod reporter;
pub mod converter;

// Re-export core types for convenience
pub use sdk_version::SdkVersion;
pub use tag_document::{ClassDefinition, Element, MemberDeclaration, Node, TagDocument};
pub use document_io::{load_document, parse_document, write_document, DocumentError};
pub use identifier_allocator::{AllocatorError, ObjectIdAllocator};
pub use class_hierarchy::{descendants_of, ClassHierarchy};
pub use transformation_rule::{AppliedTransformation, RuleSet, StructPromotion, TransformationType};
pub use rule_registry::{RegistryError, RuleRegistry};
pub use transformation_engine::{TagTransformationEngine, TransformationError, TransformationResult};
pub use reporter::{ReportFormat, TransformationReport, TransformationReporter};
pub use converter::{derive_output_path, ConversionError, ConversionOutcome, Converter};
