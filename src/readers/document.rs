use crate::error::{ProcessingError, Result};
use memmap2::Mmap;
use roxmltree::{Node, ParsingOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const IDENTIFICATION_SECTION: &str = "identification-elements";
pub const ELEMENTS_SECTION: &str = "elements";

/// How a single attribute must look for an element to match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    /// Attribute present with any value
    Exists,
    /// Attribute not present
    Absent,
    /// Attribute present with exactly this value
    Equals(String),
}

impl MatchRule {
    fn matches(&self, value: Option<&str>) -> bool {
        match self {
            MatchRule::Exists => value.is_some(),
            MatchRule::Absent => value.is_none(),
            MatchRule::Equals(expected) => value == Some(expected.as_str()),
        }
    }
}

/// Tag name plus attribute predicates used for element lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFilter {
    tag: String,
    attributes: Vec<(String, MatchRule)>,
}

impl ElementFilter {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, rule: MatchRule) -> Self {
        self.attributes.push((name.into(), rule));
        self
    }

    pub fn attr_eq(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_attr(name, MatchRule::Equals(value.into()))
    }

    pub fn has_attr(self, name: impl Into<String>) -> Self {
        self.with_attr(name, MatchRule::Exists)
    }

    pub fn lacks_attr(self, name: impl Into<String>) -> Self {
        self.with_attr(name, MatchRule::Absent)
    }

    /// Tags are compared by local name so namespaced documents match too
    pub fn matches(&self, node: Node<'_, '_>) -> bool {
        node.is_element()
            && node.tag_name().name() == self.tag
            && self
                .attributes
                .iter()
                .all(|(name, rule)| rule.matches(node.attribute(name.as_str())))
    }
}

/// First element under `parent` matching `filter`.
///
/// `recursive` searches all descendants in document order, otherwise only
/// direct children. The parent itself is never a candidate.
pub fn find_child<'a, 'input>(
    parent: Node<'a, 'input>,
    filter: &ElementFilter,
    recursive: bool,
) -> Option<Node<'a, 'input>> {
    if recursive {
        parent.descendants().skip(1).find(|node| filter.matches(*node))
    } else {
        parent.children().find(|node| filter.matches(*node))
    }
}

/// All elements under `parent` matching `filter`, in document order
pub fn find_children<'a, 'input>(
    parent: Node<'a, 'input>,
    filter: &ElementFilter,
    recursive: bool,
) -> Vec<Node<'a, 'input>> {
    if recursive {
        parent
            .descendants()
            .skip(1)
            .filter(|node| filter.matches(*node))
            .collect()
    } else {
        parent
            .children()
            .filter(|node| filter.matches(*node))
            .collect()
    }
}

/// Parsed, read-only station observation document
pub struct Document<'input> {
    tree: roxmltree::Document<'input>,
}

impl<'input> Document<'input> {
    pub fn parse(text: &'input str) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(text, options)?;
        Ok(Self { tree })
    }

    pub fn root(&self) -> Node<'_, 'input> {
        self.tree.root_element()
    }

    /// First element anywhere in the document with the given tag
    pub fn find(&self, tag: &str) -> Option<Node<'_, 'input>> {
        let filter = ElementFilter::new(tag);
        self.tree
            .root()
            .descendants()
            .find(|node| filter.matches(*node))
    }

    /// Like `find`, but a missing section is a structural error
    pub fn require(&self, tag: &str) -> Result<Node<'_, 'input>> {
        self.find(tag).ok_or_else(|| {
            ProcessingError::MalformedDocument(format!("required section <{}> not found", tag))
        })
    }

    pub fn identification(&self) -> Result<Node<'_, 'input>> {
        self.require(IDENTIFICATION_SECTION)
    }

    pub fn elements(&self) -> Result<Node<'_, 'input>> {
        self.require(ELEMENTS_SECTION)
    }
}

/// Memory-mapped XML file whose text outlives the parsed `Document`
pub struct XmlFile {
    path: PathBuf,
    mmap: Mmap,
}

impl XmlFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.mmap)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<om:ObservationCollection xmlns:om="http://www.opengis.net/om/1.0">
  <om:member>
    <identification-elements>
      <element name="station_name" value="VANCOUVER INTL A"/>
      <element name="version" value="0"/>
    </identification-elements>
    <elements>
      <element name="air_temp" element-index="1" orig-name="12" value="3.2">
        <qualifier name="sensor_index" value="1"/>
        <element name="overall_qa_summary" value="100"/>
      </element>
      <element name="snow_depth" value="5"/>
    </elements>
  </om:member>
</om:ObservationCollection>"#;

    #[test]
    fn test_find_sections() {
        let doc = Document::parse(XML).unwrap();
        assert!(doc.identification().is_ok());
        assert_eq!(doc.elements().unwrap().tag_name().name(), "elements");
        assert!(doc.find("status-indicators").is_none());
    }

    #[test]
    fn test_missing_section_is_malformed() {
        let doc = Document::parse("<root><elements/></root>").unwrap();
        assert!(matches!(
            doc.identification(),
            Err(ProcessingError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_attribute_rules() {
        let doc = Document::parse(XML).unwrap();
        let elements = doc.elements().unwrap();

        let indexed = ElementFilter::new("element").has_attr("element-index");
        let unindexed = ElementFilter::new("element")
            .lacks_attr("element-index")
            .has_attr("name");

        let direct = find_children(elements, &indexed, false);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].attribute("name"), Some("air_temp"));

        let derived = find_children(elements, &unindexed, false);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].attribute("name"), Some("snow_depth"));

        // Recursive search also reaches the nested overall_qa_summary element
        let all_unindexed = find_children(elements, &unindexed, true);
        assert_eq!(all_unindexed.len(), 2);
    }

    #[test]
    fn test_find_child_recursive_vs_direct() {
        let doc = Document::parse(XML).unwrap();
        let elements = doc.elements().unwrap();
        let summary = ElementFilter::new("element").attr_eq("name", "overall_qa_summary");

        assert!(find_child(elements, &summary, false).is_none());
        let found = find_child(elements, &summary, true).unwrap();
        assert_eq!(found.attribute("value"), Some("100"));
    }

    #[test]
    fn test_find_child_excludes_parent() {
        let doc = Document::parse(XML).unwrap();
        let elements = doc.elements().unwrap();
        let observation =
            find_child(elements, &ElementFilter::new("element").attr_eq("name", "air_temp"), false)
                .unwrap();

        let same_name = ElementFilter::new("element").attr_eq("name", "air_temp");
        assert!(find_child(observation, &same_name, true).is_none());
    }

    #[test]
    fn test_xml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        std::fs::write(&path, XML).unwrap();

        let file = XmlFile::open(&path).unwrap();
        let doc = Document::parse(file.text().unwrap()).unwrap();
        assert!(doc.elements().is_ok());
        assert_eq!(file.path(), path.as_path());
    }
}
