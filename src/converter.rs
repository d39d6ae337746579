use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::{
    document_io::{document_to_bytes, load_document, DocumentError},
    transformation_engine::{TagTransformationEngine, TransformationError, TransformationResult},
    transformation_rule::RuleSet,
};

/// Inserted between the input's stem and extension for the default output
pub const OUTPUT_SUFFIX: &str = "-out";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("File '{}' does not appear to exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read '{}'", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' does not appear to be a valid Havok Tag Xml file", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error(transparent)]
    Transformation(#[from] TransformationError),

    #[error("Failed to serialize the converted document")]
    Serialize(#[source] DocumentError),

    #[error("Failed to write '{}'", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful file conversion
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub output_path: PathBuf,
    pub result: TransformationResult,
}

/// `<dir>/<stem>-out.<ext>` next to the input
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file_name = format!("{}{}", stem, OUTPUT_SUFFIX);
    if let Some(extension) = input.extension() {
        file_name.push('.');
        file_name.push_str(&extension.to_string_lossy());
    }
    input.with_file_name(file_name)
}

/// Load, transform and write tag files with one rule set
pub struct Converter {
    engine: TagTransformationEngine,
}

impl Converter {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            engine: TagTransformationEngine::new(rules),
        }
    }

    /// Convert in memory. `origin` only labels errors.
    pub fn convert(
        &self,
        source: &[u8],
        origin: &Path,
    ) -> Result<(Vec<u8>, TransformationResult), ConversionError> {
        let mut document = load_document(source).map_err(|source| ConversionError::Document {
            path: origin.to_path_buf(),
            source,
        })?;
        let result = self.engine.transform(&mut document)?;
        let bytes = document_to_bytes(&document).map_err(ConversionError::Serialize)?;
        Ok((bytes, result))
    }

    /// Convert `input` into `output`, or into the derived path when `output`
    /// is `None`. The output file is created only after the whole document
    /// has been transformed and serialized.
    pub fn convert_file(&self, input: &Path, output: Option<&Path>) -> Result<ConversionOutcome, ConversionError> {
        if !input.exists() {
            return Err(ConversionError::FileNotFound(input.to_path_buf()));
        }
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| derive_output_path(input));

        let source = fs::read(input).map_err(|source| ConversionError::Input {
            path: input.to_path_buf(),
            source,
        })?;
        let (bytes, result) = self.convert(&source, input)?;

        fs::write(&output_path, bytes).map_err(|source| ConversionError::Output {
            path: output_path.clone(),
            source,
        })?;
        info!(input = %input.display(), output = %output_path.display(), "wrote converted tag file");

        Ok(ConversionOutcome { output_path, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_io::parse_document;
    use crate::identifier_allocator::AllocatorError;
    use tempfile::TempDir;

    const ANIMATION_DOC: &str = r##"<?xml version="1.0" encoding="ascii"?>
<hktagfile version="1" sdkversion="hk_2011.3.0-r1">
  <class name="hkaAnimation" version="3">
    <member name="annotationTracks" type="struct" array="true" class="hkaAnnotationTrack"/>
  </class>
  <class name="hkaSplineCompressedAnimation" version="0" parent="hkaAnimation"/>
  <object id="#0050" type="hkaSplineCompressedAnimation">
    <array name="annotationTracks" size="1">
      <struct>
        <string name="trackName">Bip01</string>
      </struct>
    </array>
  </object>
</hktagfile>"##;

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("meshes/actor/skeleton.xml")),
            PathBuf::from("meshes/actor/skeleton-out.xml")
        );
        assert_eq!(derive_output_path(Path::new("anim.hkx.xml")), PathBuf::from("anim.hkx-out.xml"));
        assert_eq!(derive_output_path(Path::new("tagfile")), PathBuf::from("tagfile-out"));
    }

    #[test]
    fn test_convert_file_to_derived_path() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("walk.xml");
        fs::write(&input, ANIMATION_DOC).unwrap();

        let outcome = Converter::new(RuleSet::builtin()).convert_file(&input, None).unwrap();

        assert_eq!(outcome.output_path, dir.path().join("walk-out.xml"));
        let written = fs::read(&outcome.output_path).unwrap();
        assert!(written.is_ascii());

        let converted = parse_document(std::str::from_utf8(&written).unwrap()).unwrap();
        assert_eq!(converted.class_definition("hkaAnimation").unwrap().version, Some(1));
        let track = converted.object("#0051").unwrap();
        assert_eq!(track.attribute("type"), Some("hkaAnnotationTrack"));
        assert_eq!(outcome.result.created_objects, vec!["#0051".to_string()]);
    }

    #[test]
    fn test_convert_file_explicit_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("walk.xml");
        let output = dir.path().join("converted").with_extension("xml");
        fs::write(&input, ANIMATION_DOC).unwrap();

        let outcome = Converter::new(RuleSet::builtin())
            .convert_file(&input, Some(&output))
            .unwrap();

        assert_eq!(outcome.output_path, output);
        assert!(output.exists());
        assert!(!dir.path().join("walk-out.xml").exists());
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("absent.xml");

        let result = Converter::new(RuleSet::builtin()).convert_file(&input, None);

        assert!(matches!(result, Err(ConversionError::FileNotFound(_))));
        assert!(!dir.path().join("absent-out.xml").exists());
    }

    #[test]
    fn test_missing_root_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pack.xml");
        fs::write(&input, r##"<hkpackfile><object id="#0001" type="a"/></hkpackfile>"##).unwrap();

        let result = Converter::new(RuleSet::builtin()).convert_file(&input, None);

        assert!(matches!(
            result,
            Err(ConversionError::Document {
                source: DocumentError::MalformedDocument(_),
                ..
            })
        ));
        assert!(!dir.path().join("pack-out.xml").exists());
    }

    #[test]
    fn test_no_identifiers_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bare.xml");
        fs::write(&input, r#"<hktagfile><class name="hkaAnimation" version="3"/></hktagfile>"#).unwrap();

        let result = Converter::new(RuleSet::builtin()).convert_file(&input, None);

        assert!(matches!(
            result,
            Err(ConversionError::Transformation(TransformationError::Allocator(
                AllocatorError::NoIdentifiersFound
            )))
        ));
        assert!(!dir.path().join("bare-out.xml").exists());
    }

    #[test]
    fn test_convert_in_memory() {
        let converter = Converter::new(RuleSet::builtin());
        let (bytes, result) = converter
            .convert(ANIMATION_DOC.as_bytes(), Path::new("walk.xml"))
            .unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"us-ascii\"?>"));
        assert!(text.contains("<member name=\"annotationTracks\" type=\"ref\" array=\"true\" class=\"hkaAnnotationTrack\"/>"));
        assert!(text.contains("<ref>#0051</ref>"));
        assert!(!text.ends_with('\n'));
        assert_eq!(result.source_version.unwrap().to_string(), "hk_2011.3.0-r1");
    }
}
